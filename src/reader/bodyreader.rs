//! Per-framing body readers.
//!
//! Grounded directly on h11's `ContentLengthReader`/`ChunkedReader`/
//! `Http10Reader` in `readers.py`: each is a small state machine over the
//! shared [`ReceiveBuffer`], advanced one call at a time, returning `Ok(None)`
//! when more bytes are needed rather than blocking.

use crate::buffer::ReceiveBuffer;
use crate::error::{Error, ErrorKind};
use crate::event::{Data, EndOfMessage, Event};
use crate::reader::headline::parse_header_lines;

const HTTP10_READ_CHUNK: usize = 64 * 1024;

/// A reader bound to one message body, selected by [`crate::body::Framing`].
pub enum BodyReader {
    ContentLength { remaining: u64 },
    Chunked(ChunkedReader),
    Http10,
    /// Already fully read (`ContentLengthZero` framing): the very next call
    /// produces `EndOfMessage` unconditionally.
    Done,
}

impl BodyReader {
    pub fn content_length(len: u64) -> BodyReader {
        if len == 0 {
            BodyReader::Done
        } else {
            BodyReader::ContentLength { remaining: len }
        }
    }

    pub fn chunked() -> BodyReader {
        BodyReader::Chunked(ChunkedReader::new())
    }

    pub fn http10() -> BodyReader {
        BodyReader::Http10
    }

    pub fn done() -> BodyReader {
        BodyReader::Done
    }

    /// Consumes as much of `buf` as is available and ready; returns `Ok(None)`
    /// if a complete `Data`/`EndOfMessage` isn't yet available.
    pub fn read(&mut self, buf: &mut ReceiveBuffer) -> Result<Option<Event>, Error> {
        match self {
            BodyReader::Done => Ok(Some(Event::EndOfMessage(EndOfMessage::default()))),
            BodyReader::ContentLength { remaining } => {
                if *remaining == 0 {
                    return Ok(Some(Event::EndOfMessage(EndOfMessage::default())));
                }
                match buf.extract_at_most(*remaining as usize) {
                    None => Ok(None),
                    Some(data) => {
                        *remaining -= data.len() as u64;
                        Ok(Some(Event::Data(Data::new(data))))
                    }
                }
            }
            BodyReader::Chunked(inner) => inner.read(buf),
            BodyReader::Http10 => match buf.extract_at_most(HTTP10_READ_CHUNK) {
                None => Ok(None),
                Some(data) => Ok(Some(Event::Data(Data::new(data)))),
            },
        }
    }

    /// Called when the transport reports EOF while this reader is active.
    /// A `Content-Length` body cut short is a protocol error; an HTTP/1.0
    /// read-until-close body is *defined* by EOF, so it completes cleanly.
    pub fn read_eof(&self) -> Result<Event, Error> {
        match self {
            BodyReader::Done => Ok(Event::EndOfMessage(EndOfMessage::default())),
            BodyReader::ContentLength { remaining } if *remaining > 0 => {
                Err(Error::Remote(ErrorKind::PeerClosedMidBody))
            }
            BodyReader::ContentLength { .. } => Ok(Event::EndOfMessage(EndOfMessage::default())),
            BodyReader::Chunked(_) => Err(Error::Remote(ErrorKind::PeerClosedMidBody)),
            BodyReader::Http10 => Ok(Event::EndOfMessage(EndOfMessage::default())),
        }
    }
}

const MAX_CHUNK_SIZE_DIGITS: usize = 20;

pub struct ChunkedReader {
    bytes_in_chunk: u64,
    bytes_to_discard: usize,
    reading_trailer: bool,
}

impl ChunkedReader {
    fn new() -> ChunkedReader {
        ChunkedReader { bytes_in_chunk: 0, bytes_to_discard: 0, reading_trailer: false }
    }

    fn read(&mut self, buf: &mut ReceiveBuffer) -> Result<Option<Event>, Error> {
        if self.reading_trailer {
            return match buf.extract_lines() {
                None => Ok(None),
                Some(lines) => {
                    let headers = parse_header_lines(&lines)?;
                    Ok(Some(Event::EndOfMessage(EndOfMessage { headers })))
                }
            };
        }
        if self.bytes_to_discard > 0 {
            match buf.extract_at_most(self.bytes_to_discard) {
                None => return Ok(None),
                Some(data) => {
                    self.bytes_to_discard -= data.len();
                    if self.bytes_to_discard > 0 {
                        return Ok(None);
                    }
                }
            }
        }
        let mut chunk_start = false;
        if self.bytes_in_chunk == 0 {
            // Searches for a bare `\n`, not `\r\n`: a chunk-size line is
            // allowed to end in either, same as a header line.
            let header = match buf.extract_until_next(b"\n") {
                None => return Ok(None),
                Some(h) => h,
            };
            self.bytes_in_chunk = parse_chunk_size(&header)?;
            if self.bytes_in_chunk == 0 {
                self.reading_trailer = true;
                return self.read(buf);
            }
            chunk_start = true;
        }
        let want = self.bytes_in_chunk.min(usize::MAX as u64) as usize;
        match buf.extract_at_most(want) {
            None => Ok(None),
            Some(data) => {
                self.bytes_in_chunk -= data.len() as u64;
                let chunk_end = self.bytes_in_chunk == 0;
                if chunk_end {
                    self.bytes_to_discard = 2;
                }
                Ok(Some(Event::Data(Data { data, chunk_start, chunk_end })))
            }
        }
    }
}

/// Parses a `chunk-size [ chunk-ext ] CRLF` line. Chunk extensions are
/// discarded, as in h11 (nobody depends on them in practice). The hex
/// digit count is capped at 20 (enough for `u64::MAX`) to reject a peer
/// trying to stall the parser on an unbounded digit run.
fn parse_chunk_size(line: &[u8]) -> Result<u64, Error> {
    let line = line.strip_suffix(b"\r\n").or_else(|| line.strip_suffix(b"\n"))
        .ok_or(Error::Remote(ErrorKind::BadChunkFraming))?;
    let size_end = line.iter().position(|&b| b == b';').unwrap_or(line.len());
    let digits = &line[..size_end];
    if digits.is_empty() || digits.len() > MAX_CHUNK_SIZE_DIGITS || !digits.iter().all(u8::is_ascii_hexdigit) {
        return Err(Error::Remote(ErrorKind::BadChunkFraming));
    }
    u64::from_str_radix(std::str::from_utf8(digits).unwrap(), 16)
        .map_err(|_| Error::Remote(ErrorKind::BadChunkFraming))
}
