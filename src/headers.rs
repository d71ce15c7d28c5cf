//! Header name/value validation and storage.
//!
//! Headers are kept in an ordered list rather than a map: RFC 7230 requires
//! that a proxy never reorder field values, and several headers (notably
//! `Set-Cookie`) are legitimately repeated. Names are lowercased on
//! ingestion so lookups are always case-insensitive; values are opaque,
//! trimmed byte strings.

use crate::error::{Error, ErrorKind};

/// `tchar` from RFC 7230 §3.2.6: the character set allowed in a `token`
/// (method names, header field-names, ...).
fn is_tchar(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.'
        | b'^' | b'_' | b'`' | b'|' | b'~')
        || b.is_ascii_alphanumeric()
}

/// Validates that `bytes` is a non-empty RFC 7230 `token`.
pub fn is_token(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(|&b| is_tchar(b))
}

/// `field-vchar` per RFC 7230: a VCHAR (0x21-0x7E) or obs-text (0x80-0xFF).
fn is_field_vchar(b: u8) -> bool {
    b >= 0x21
}

/// A lowercased, token-validated header name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeaderName(Vec<u8>);

impl HeaderName {
    /// Validates and lowercases a header field-name.
    pub fn new(raw: &[u8]) -> Result<HeaderName, Error> {
        if !is_token(raw) {
            return Err(Error::Local(ErrorKind::InvalidHeader(
                "header name must be a non-empty token")));
        }
        Ok(HeaderName(raw.to_ascii_lowercase()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Safe: token chars are a subset of ASCII.
        std::str::from_utf8(&self.0).unwrap()
    }

    fn eq_lower(&self, lowercase_name: &str) -> bool {
        self.0 == lowercase_name.as_bytes()
    }
}

/// Validates and trims a header field-value.
///
/// Values may not contain CR, LF, or NUL; surrounding optional whitespace
/// (`OWS` in the grammar) is stripped.
pub fn validate_value(raw: &[u8]) -> Result<Vec<u8>, Error> {
    let trimmed = trim_ows(raw);
    for &b in trimmed {
        if b == b'\r' || b == b'\n' || b == 0 {
            return Err(Error::Local(ErrorKind::InvalidHeader(
                "header value contains CR, LF, or NUL")));
        }
        if !(is_field_vchar(b) || b == b' ' || b == b'\t') {
            return Err(Error::Local(ErrorKind::InvalidHeader(
                "header value contains a control character")));
        }
    }
    Ok(trimmed.to_vec())
}

fn trim_ows(bytes: &[u8]) -> &[u8] {
    let is_ows = |b: &u8| *b == b' ' || *b == b'\t';
    let start = bytes.iter().position(|b| !is_ows(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_ows(b)).map(|i| i + 1).unwrap_or(start);
    &bytes[start..end]
}

/// An ordered list of header fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList(Vec<(HeaderName, Vec<u8>)>);

impl HeaderList {
    pub fn new() -> HeaderList {
        HeaderList(Vec::new())
    }

    pub fn from_pairs(pairs: Vec<(HeaderName, Vec<u8>)>) -> HeaderList {
        HeaderList(pairs)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(HeaderName, Vec<u8>)> {
        self.0.iter()
    }

    pub fn push(&mut self, name: HeaderName, value: Vec<u8>) {
        self.0.push((name, value));
    }

    /// Appends a header, validating the raw name/value first.
    pub fn append(&mut self, name: &[u8], value: &[u8]) -> Result<(), Error> {
        let name = HeaderName::new(name)?;
        let value = validate_value(value)?;
        self.push(name, value);
        Ok(())
    }

    /// All values for a (lowercase) header name, in original order.
    pub fn get_all(&self, lowercase_name: &str) -> impl Iterator<Item = &[u8]> {
        self.0.iter()
            .filter(move |(n, _)| n.eq_lower(lowercase_name))
            .map(|(_, v)| v.as_slice())
    }

    pub fn contains(&self, lowercase_name: &str) -> bool {
        self.0.iter().any(|(n, _)| n.eq_lower(lowercase_name))
    }

    /// Removes every header with this (lowercase) name.
    pub fn remove_all(&mut self, lowercase_name: &str) {
        self.0.retain(|(n, _)| !n.eq_lower(lowercase_name));
    }

    /// Comma-separated, OWS-trimmed, lowercased values for a header that is
    /// defined as a comma-separated list (`Connection`, `Transfer-Encoding`).
    ///
    /// Mirrors h11's `get_comma_header`: values are split on `,` without
    /// regard to quoting, which is fine here because the only things this
    /// engine cares to extract this way (`close`, `keep-alive`, `chunked`)
    /// never legitimately contain a comma themselves.
    pub fn comma_values(&self, lowercase_name: &str) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        for raw in self.get_all(lowercase_name) {
            for part in raw.split(|&b| b == b',') {
                let part = trim_ows(part);
                if !part.is_empty() {
                    out.push(part.to_ascii_lowercase());
                }
            }
        }
        out
    }

    pub fn has_comma_token(&self, lowercase_name: &str, lowercase_token: &[u8]) -> bool {
        self.comma_values(lowercase_name).iter().any(|v| v == lowercase_token)
    }

    /// Returns the single `Content-Length` value as an integer.
    ///
    /// Fails if there is more than one occurrence (even with identical
    /// values - RFC 7230 forbids duplication outright) or the value isn't a
    /// plain non-negative decimal integer.
    ///
    /// Returns a [`Error::Local`] by default, since this is equally used to
    /// validate headers we are about to send; callers deriving framing for
    /// bytes received off the wire re-tag the error as `Remote`.
    pub fn content_length(&self) -> Result<Option<u64>, Error> {
        let values: Vec<&[u8]> = self.get_all("content-length").collect();
        match values.as_slice() {
            [] => Ok(None),
            [v] => {
                let v = trim_ows(v);
                if v.is_empty() || !v.iter().all(|b| b.is_ascii_digit()) {
                    return Err(Error::Local(ErrorKind::DuplicateOrBadContentLength));
                }
                std::str::from_utf8(v).ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Some)
                    .ok_or(Error::Local(ErrorKind::DuplicateOrBadContentLength))
            }
            _ => Err(Error::Local(ErrorKind::DuplicateOrBadContentLength)),
        }
    }

    /// Returns `true` if `Transfer-Encoding` names exactly `chunked`, `false`
    /// if the header is absent, or an error if any other coding is named.
    /// See [`HeaderList::content_length`] for the `Local`-by-default note.
    pub fn is_chunked(&self) -> Result<bool, Error> {
        let values = self.comma_values("transfer-encoding");
        if values.is_empty() {
            return Ok(false);
        }
        if values.len() == 1 && values[0] == b"chunked" {
            return Ok(true);
        }
        Err(Error::Local(ErrorKind::UnsupportedTransferEncoding))
    }

    /// `Connection: close` present (case-insensitively, comma-split).
    pub fn has_connection_close(&self) -> bool {
        self.has_comma_token("connection", b"close")
    }

    pub fn has_keep_alive_token(&self) -> bool {
        self.has_comma_token("connection", b"keep-alive")
    }
}

impl IntoIterator for HeaderList {
    type Item = (HeaderName, Vec<u8>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn token_validation() {
        assert!(is_token(b"Content-Length"));
        assert!(is_token(b"X-Foo_Bar.Baz~1"));
        assert!(!is_token(b""));
        assert!(!is_token(b"foo bar"));
        assert!(!is_token(b"foo:bar"));
    }

    #[test]
    fn names_are_lowercased() {
        let n = HeaderName::new(b"Content-Length").unwrap();
        assert_eq!(n.as_bytes(), b"content-length");
    }

    #[test]
    fn values_are_trimmed() {
        assert_eq!(validate_value(b"  hello world  ").unwrap(), b"hello world");
    }

    #[test]
    fn values_reject_control_chars() {
        assert!(validate_value(b"hello\r\nworld").is_err());
        assert!(validate_value(b"hello\0world").is_err());
    }

    #[test]
    fn content_length_rejects_duplicates() {
        let mut h = HeaderList::new();
        h.append(b"Content-Length", b"5").unwrap();
        h.append(b"Content-Length", b"5").unwrap();
        assert!(h.content_length().is_err());
    }

    #[test]
    fn content_length_parses_single_value() {
        let mut h = HeaderList::new();
        h.append(b"Content-Length", b"42").unwrap();
        assert_eq!(h.content_length().unwrap(), Some(42));
    }

    #[test]
    fn transfer_encoding_rejects_non_chunked() {
        let mut h = HeaderList::new();
        h.append(b"Transfer-Encoding", b"gzip").unwrap();
        assert!(h.is_chunked().is_err());
    }

    #[test]
    fn transfer_encoding_accepts_chunked_case_insensitively() {
        let mut h = HeaderList::new();
        h.append(b"Transfer-Encoding", b"CHUNKED").unwrap();
        assert!(h.is_chunked().unwrap());
    }

    #[test]
    fn connection_close_detection_is_comma_aware() {
        let mut h = HeaderList::new();
        h.append(b"Connection", b"keep-alive, close").unwrap();
        assert!(h.has_connection_close());
        assert!(h.has_keep_alive_token());
    }
}
