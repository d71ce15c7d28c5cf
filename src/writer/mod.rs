//! Serializes [`Event`]s into bytes.
//!
//! The request/response head writers format the start-line and headers
//! directly; body writers are selected by [`Framing`] and mirror the
//! readers in [`crate::reader::bodyreader`]. Response planning additionally
//! performs the mandatory framing/`Connection` header repair described in
//! `SPEC_FULL.md` §4.3, grounded on `h11/connection.py`'s
//! `_examine_and_fix_framing_headers`.

pub mod bodywriter;

use crate::body::{self, Framing, RequestContext};
use crate::error::Error;
use crate::event::{InformationalResponse, Request, Response};
use crate::headers::HeaderList;
use crate::version::Version;

pub use bodywriter::BodyWriter;

/// Formats `METHOD SP TARGET SP HTTP/1.1 CRLF`, then headers, then the
/// blank line. Grammar constraints (no whitespace in the target, a token
/// method) were already enforced by `Request::new`.
pub fn write_request_head(req: &Request) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&req.method);
    out.push(b' ');
    out.extend_from_slice(&req.target);
    out.extend_from_slice(b" HTTP/1.1\r\n");
    write_headers(&mut out, &req.headers);
    out
}

/// The body framing this request will use, unmodified by any repair -
/// requests are sent exactly as the caller composed their headers.
pub fn request_framing(req: &Request) -> Result<Framing, Error> {
    body::for_request(&req.headers)
}

/// Formats `HTTP/1.1 SP STATUS SP REASON CRLF` - the trailing space before
/// CRLF is mandatory even when `reason` is empty - then headers verbatim.
/// Informational responses never carry a body, so there is no framing to
/// repair.
pub fn write_informational_response_head(resp: &InformationalResponse) -> Vec<u8> {
    let mut out = Vec::new();
    write_status_line(&mut out, resp.status_code, &resp.reason);
    write_headers(&mut out, &resp.headers);
    out
}

/// Computes the body framing for an outgoing final response and returns
/// the (possibly repaired) headers to actually send, per the table in
/// `SPEC_FULL.md` §4.3:
///
/// - Unknown-length framing offered to an HTTP/1.1 peer is upgraded to
///   `Transfer-Encoding: chunked`.
/// - Unknown-length framing offered to an HTTP/1.0 (or unknown-version)
///   peer has both framing headers stripped, and forces the connection
///   closed after this message.
/// - Whenever `keep_alive` is false (already, or because the previous
///   rule forced it), `Connection: close` is ensured present.
///
/// Returns `(normalized_headers, framing, need_close)`.
pub fn plan_response(
    status_code: u16,
    headers: &HeaderList,
    request: RequestContext,
    peer_version: Version,
    keep_alive: bool,
) -> Result<(HeaderList, Framing, bool), Error> {
    let mut framing = body::for_response(status_code, request, headers)?;
    let mut headers = headers.clone();
    let mut need_close = false;

    match framing {
        Framing::ContentLengthZero | Framing::ContentLength(_) => {}
        Framing::Chunked => {
            body::validate_outgoing(framing, peer_version)?;
            if !headers.is_chunked()? {
                headers.remove_all("transfer-encoding");
                headers.append(b"Transfer-Encoding", b"chunked")?;
            }
        }
        Framing::ReadUntilClose => {
            headers.remove_all("content-length");
            headers.remove_all("transfer-encoding");
            if peer_version == Version::Http11 {
                headers.append(b"Transfer-Encoding", b"chunked")?;
                framing = Framing::Chunked;
            } else {
                need_close = true;
            }
        }
    }

    if !keep_alive || need_close {
        headers.remove_all("connection");
        headers.append(b"Connection", b"close")?;
        need_close = true;
    }

    Ok((headers, framing, need_close))
}

/// Formats the already-planned status line and (repaired) headers.
pub fn write_response_head(status_code: u16, reason: &[u8], headers: &HeaderList) -> Vec<u8> {
    let mut out = Vec::new();
    write_status_line(&mut out, status_code, reason);
    write_headers(&mut out, headers);
    out
}

fn write_status_line(out: &mut Vec<u8>, status_code: u16, reason: &[u8]) {
    out.extend_from_slice(b"HTTP/1.1 ");
    out.extend_from_slice(status_code.to_string().as_bytes());
    out.push(b' ');
    out.extend_from_slice(reason);
    out.extend_from_slice(b"\r\n");
}

fn write_headers(out: &mut Vec<u8>, headers: &HeaderList) {
    for (name, value) in headers.iter() {
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod test {
    use super::*;

    fn headers(pairs: &[(&[u8], &[u8])]) -> HeaderList {
        let mut h = HeaderList::new();
        for (n, v) in pairs {
            h.append(n, v).unwrap();
        }
        h
    }

    #[test]
    fn writes_request_line_and_headers() {
        let req = Request::new(b"GET", b"/a", headers(&[(b"Host", b"x")]), Version::Http11).unwrap();
        let out = write_request_head(&req);
        assert_eq!(out, b"GET /a HTTP/1.1\r\nhost: x\r\n\r\n");
    }

    #[test]
    fn writes_status_line_with_empty_reason() {
        let resp = InformationalResponse::new(100, HeaderList::new(), Version::Http11, b"").unwrap();
        let out = write_informational_response_head(&resp);
        assert_eq!(out, b"HTTP/1.1 100 \r\n\r\n");
    }

    #[test]
    fn upgrades_unknown_length_to_chunked_for_http11_peer() {
        let (headers, framing, need_close) =
            plan_response(200, &HeaderList::new(), RequestContext::none(), Version::Http11, true).unwrap();
        assert_eq!(framing, Framing::Chunked);
        assert!(!need_close);
        assert!(headers.has_comma_token("transfer-encoding", b"chunked"));
    }

    #[test]
    fn falls_back_to_close_delimited_for_http10_peer() {
        let (headers, framing, need_close) =
            plan_response(200, &HeaderList::new(), RequestContext::none(), Version::Http10, true).unwrap();
        assert_eq!(framing, Framing::ReadUntilClose);
        assert!(need_close);
        assert!(headers.has_connection_close());
    }

    #[test]
    fn content_length_response_passes_through_unchanged() {
        let h = headers(&[(b"Content-Length", b"5")]);
        let (out, framing, need_close) =
            plan_response(200, &h, RequestContext::none(), Version::Http11, true).unwrap();
        assert_eq!(framing, Framing::ContentLength(5));
        assert!(!need_close);
        assert_eq!(out.content_length().unwrap(), Some(5));
    }

    #[test]
    fn keep_alive_false_forces_connection_close_header() {
        let (headers, _, need_close) =
            plan_response(204, &HeaderList::new(), RequestContext::none(), Version::Http11, false).unwrap();
        assert!(need_close);
        assert!(headers.has_connection_close());
    }
}
