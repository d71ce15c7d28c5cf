//! Body-framing determination (RFC 7230 §3.3.3).
//!
//! A message's body length is never read off a single header in isolation;
//! it's derived from a fixed precedence over the request/response context
//! and the `Content-Length`/`Transfer-Encoding` headers. [`Framing`] is the
//! outcome of that derivation, and is what readers and writers actually key
//! their behavior on.

use crate::error::{Error, ErrorKind};
use crate::headers::HeaderList;
use crate::version::Version;

/// How a message body is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// No body is present, regardless of headers (HEAD responses, 204/304,
    /// a successful response to CONNECT).
    ContentLengthZero,
    /// Exactly `Content-Length` bytes of body follow.
    ContentLength(u64),
    /// Chunked transfer-coding; length is discovered from the chunk stream.
    Chunked,
    /// No length is declared; the body runs until the connection closes.
    /// Only ever valid for a response.
    ReadUntilClose,
}

/// Request-side context needed to resolve a response's framing: a HEAD
/// request has no response body regardless of what the response headers
/// say, and a successful CONNECT response switches the connection into
/// tunnel mode rather than carrying a framed body at all.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub is_head: bool,
    pub is_connect: bool,
}

impl RequestContext {
    pub fn none() -> RequestContext {
        RequestContext { is_head: false, is_connect: false }
    }
}

/// Determines the framing for an outgoing or incoming request body.
///
/// Requests never default to read-until-close: a request with no
/// `Content-Length` and no `Transfer-Encoding` simply has no body.
pub fn for_request(headers: &HeaderList) -> Result<Framing, Error> {
    if headers.is_chunked()? {
        return Ok(Framing::Chunked);
    }
    if let Some(len) = headers.content_length()? {
        return Ok(Framing::ContentLength(len));
    }
    Ok(Framing::ContentLengthZero)
}

/// Determines the framing for an outgoing or incoming response body.
///
/// `status_code` and `request` describe the request this is a response to;
/// `their_http_version` is the peer's declared version, which gates whether
/// read-until-close is even on the table (an HTTP/1.0 peer can't be handed
/// chunked framing, and if they are the one composing this response, a
/// missing length means read-until-close regardless of our own version).
pub fn for_response(
    status_code: u16,
    request: RequestContext,
    headers: &HeaderList,
) -> Result<Framing, Error> {
    if request.is_head
        || status_code == 204
        || status_code == 304
        || (request.is_connect && (200..300).contains(&status_code))
    {
        return Ok(Framing::ContentLengthZero);
    }
    if headers.is_chunked()? {
        return Ok(Framing::Chunked);
    }
    if let Some(len) = headers.content_length()? {
        return Ok(Framing::ContentLength(len));
    }
    Ok(Framing::ReadUntilClose)
}

/// Rejects framing combinations this engine cannot put on the wire: chunked
/// framing is HTTP/1.1-only, and read-until-close can't be proposed to an
/// HTTP/1.0 peer as a *request* (it isn't a request-side option at all).
pub fn validate_outgoing(framing: Framing, peer_version: Version) -> Result<(), Error> {
    if framing == Framing::Chunked && peer_version == Version::Http10 {
        return Err(Error::Local(ErrorKind::FramingMismatch(
            "cannot use chunked transfer-coding with an HTTP/1.0 peer")));
    }
    Ok(())
}
