//! An append-only byte accumulator with amortized O(1) front-truncation and
//! a cached search offset for delimiter scans.
//!
//! Grounded on `h11/_receivebuffer.py`: store a growable byte vector plus a
//! `start` cursor, and remember how far a `needle` has already been
//! searched so repeated `extract_until_next` calls with the same needle
//! (the common case: re-polling for "is the blank line here yet") run in
//! amortized O(total bytes appended), not O(calls * buffer length).

#[derive(Debug, Default)]
pub struct ReceiveBuffer {
    data: Vec<u8>,
    start: usize,
    searched_for: Vec<u8>,
    searched_to: usize,
}

impl ReceiveBuffer {
    pub fn new() -> ReceiveBuffer {
        ReceiveBuffer {
            data: Vec::new(),
            start: 0,
            searched_for: Vec::new(),
            searched_to: 0,
        }
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.data.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unconsumed bytes, without removing them.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.start..]
    }

    /// Reclaims the consumed prefix. Called after a complete event has been
    /// produced, so the buffer doesn't grow forever on a long-lived
    /// keep-alive connection.
    pub fn compress(&mut self) {
        if self.start > 0 {
            self.data.drain(..self.start);
            self.searched_to = self.searched_to.saturating_sub(self.start);
            self.start = 0;
        }
    }

    /// Consumes up to `count` bytes. Returns `None` if the buffer is empty.
    pub fn extract_at_most(&mut self, count: usize) -> Option<Vec<u8>> {
        if self.is_empty() {
            return None;
        }
        let take = count.min(self.len());
        let out = self.data[self.start..self.start + take].to_vec();
        self.start += take;
        Some(out)
    }

    /// Consumes through (and including) the first occurrence of `needle`.
    /// Returns `None`, and remembers the search progress, if not yet found.
    pub fn extract_until_next(&mut self, needle: &[u8]) -> Option<Vec<u8>> {
        let search_start = if self.searched_for == needle {
            self.searched_to.saturating_sub(needle.len().saturating_sub(1)).max(self.start)
        } else {
            self.start
        };
        let haystack = &self.data[search_start..];
        match find_subslice(haystack, needle) {
            Some(rel_offset) => {
                let offset = search_start + rel_offset;
                let new_start = offset + needle.len();
                let out = self.data[self.start..new_start].to_vec();
                self.start = new_start;
                self.searched_for.clear();
                self.searched_to = 0;
                Some(out)
            }
            None => {
                self.searched_for = needle.to_vec();
                self.searched_to = self.data.len();
                None
            }
        }
    }

    /// Consumes through the first blank-line terminator (`\r\n\r\n` or a
    /// leading bare `\r\n`/`\n\n`), returning the CRLF-split lines with
    /// trailing CRs stripped. A buffer that starts with a bare blank line
    /// (the empty request-line case) returns `Some(vec![])`.
    pub fn extract_lines(&mut self) -> Option<Vec<Vec<u8>>> {
        let rest = self.as_slice();
        if rest.starts_with(b"\r\n") {
            self.start += 2;
            self.clear_search_cache();
            return Some(Vec::new());
        }
        if rest.starts_with(b"\n") {
            self.start += 1;
            self.clear_search_cache();
            return Some(Vec::new());
        }
        self.extract_block_until_blank_line()
    }

    fn clear_search_cache(&mut self) {
        self.searched_for.clear();
        self.searched_to = 0;
    }

    /// Scans for a blank-line terminator treating both `\r\n` and a bare
    /// `\n` as valid line endings (the wire-format concession this engine
    /// makes on receive), then splits on whichever terminator each line
    /// used and strips a trailing `\r`.
    fn extract_block_until_blank_line(&mut self) -> Option<Vec<Vec<u8>>> {
        let rest = self.as_slice();
        let mut i = self.searched_to.saturating_sub(self.start);
        if self.searched_for != b"\n\n" {
            i = 0;
        }
        while i < rest.len() {
            if rest[i] == b'\n' {
                let prev_is_blank = i > 0 && (rest[i - 1] == b'\n'
                    || (rest[i - 1] == b'\r' && i >= 2 && rest[i - 2] == b'\n'));
                if prev_is_blank {
                    let end = i + 1;
                    let block = rest[..end].to_vec();
                    self.start += end;
                    self.clear_search_cache();
                    return Some(split_header_block(&block));
                }
            }
            i += 1;
        }
        self.searched_for = b"\n\n".to_vec();
        self.searched_to = self.start + rest.len();
        None
    }
}

fn split_header_block(block: &[u8]) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let mut line_start = 0;
    for i in 0..block.len() {
        if block[i] == b'\n' {
            let mut end = i;
            if end > line_start && block[end - 1] == b'\r' {
                end -= 1;
            }
            lines.push(block[line_start..end].to_vec());
            line_start = i + 1;
        }
    }
    // The scan always stops right after a blank line, so the last entry is
    // the blank line's own (empty, after CR-stripping) content; drop it,
    // matching `maybe_extract_lines` dropping the two trailing empty
    // elements a `\r\n`-delimited split produces for the same input.
    lines.pop();
    lines
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return if needle.is_empty() { Some(0) } else { None };
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
