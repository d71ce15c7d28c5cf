//! Request-line / status-line and header-block parsing.
//!
//! Grounded on `h11/readers.py`'s `header_field_re`/`request_line_re`/
//! `status_line_re` and its `_obsolete_line_fold` generator, reworked from
//! regex matching into direct byte-grammar scans (see `DESIGN.md` for why
//! `httparse` doesn't fit: it has no way to accept a bare `\n` line
//! terminator, which this engine's receive side must tolerate).

use crate::error::{Error, ErrorKind};
use crate::headers::{self, HeaderList};
use crate::version::Version;

/// Parses a request-line: `method SP request-target SP HTTP-version`.
pub fn parse_request_line(line: &[u8]) -> Result<(Vec<u8>, Vec<u8>, Version), Error> {
    let mut parts = line.splitn(3, |&b| b == b' ');
    let method = parts.next().filter(|s| !s.is_empty());
    let target = parts.next().filter(|s| !s.is_empty());
    let version = parts.next();
    match (method, target, version) {
        (Some(method), Some(target), Some(version)) if headers::is_token(method) => {
            let version = Version::parse(version).ok_or(Error::Remote(ErrorKind::BadStartLine))?;
            Ok((method.to_vec(), target.to_vec(), version))
        }
        _ => Err(Error::Remote(ErrorKind::BadStartLine)),
    }
}

/// Parses a status-line: `HTTP-version SP status-code SP reason-phrase`.
pub fn parse_status_line(line: &[u8]) -> Result<(Version, u16, Vec<u8>), Error> {
    if line.len() < 12 || line[8] != b' ' {
        return Err(Error::Remote(ErrorKind::BadStartLine));
    }
    let version = Version::parse(&line[..8]).ok_or(Error::Remote(ErrorKind::BadStartLine))?;
    let rest = &line[9..];
    if rest.len() < 3 || !rest[..3].iter().all(u8::is_ascii_digit) {
        return Err(Error::Remote(ErrorKind::BadStartLine));
    }
    let status_code: u16 = std::str::from_utf8(&rest[..3]).unwrap().parse().unwrap();
    let reason = if rest.len() > 3 {
        if rest[3] != b' ' {
            return Err(Error::Remote(ErrorKind::BadStartLine));
        }
        &rest[4..]
    } else {
        &rest[3..]
    };
    for &b in reason {
        if !(b == b' ' || b == b'\t' || b >= 0x21) {
            return Err(Error::Remote(ErrorKind::BadStartLine));
        }
    }
    Ok((version, status_code, reason.to_vec()))
}

/// Collapses obsolete line folding (a continuation line starting with SP
/// or HTAB) into its predecessor with a single space, then splits each
/// resulting line on `name: value` and validates both halves.
///
/// A fold on the very first line is a hard error: there is no predecessor
/// to fold into.
pub fn parse_header_lines(lines: &[Vec<u8>]) -> Result<HeaderList, Error> {
    let mut folded: Vec<Vec<u8>> = Vec::with_capacity(lines.len());
    for line in lines {
        let is_fold = line.first().map_or(false, |&b| b == b' ' || b == b'\t');
        if is_fold {
            let prev = folded.last_mut().ok_or(Error::Remote(ErrorKind::InvalidHeader(
                "obsolete line folding at the start of a header block")))?;
            let continuation = trim_leading_ows(line);
            prev.push(b' ');
            prev.extend_from_slice(continuation);
        } else {
            folded.push(line.clone());
        }
    }
    let mut out = HeaderList::new();
    for line in folded {
        let colon = line.iter().position(|&b| b == b':').ok_or(Error::Remote(ErrorKind::InvalidHeader(
            "header line has no colon")))?;
        let name = &line[..colon];
        let value = &line[colon + 1..];
        out.append(name, value).map_err(remote)?;
    }
    Ok(out)
}

fn trim_leading_ows(line: &[u8]) -> &[u8] {
    let start = line.iter().position(|&b| b != b' ' && b != b'\t').unwrap_or(line.len());
    &line[start..]
}

/// Reclassifies a header-validation error (which `HeaderList::append`
/// constructs as `Local`, since it's also used when *building* outgoing
/// events) as `Remote` when it arises from parsing received bytes.
fn remote(err: Error) -> Error {
    Error::Remote(err.kind().clone())
}
