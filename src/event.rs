//! Event value types.
//!
//! Each wire-level HTTP/1.1 message maps to a small sequence of these
//! events. Unlike the original implementation's dynamically-validated
//! attribute bundles, every event here is a distinct variant of a sum type
//! with statically-checked fields (per spec.md's Design Notes); grammar
//! validation happens once, in the constructor, rather than being
//! re-derived from runtime reflection.

use crate::error::{Error, ErrorKind};
use crate::headers::{self, HeaderList};
use crate::version::Version;

/// Start of a client-to-server request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Vec<u8>,
    pub target: Vec<u8>,
    pub headers: HeaderList,
    pub http_version: Version,
}

impl Request {
    /// Builds and validates a `Request`.
    ///
    /// Rejects a non-token method, a request-target containing whitespace,
    /// and - for HTTP/1.1 - anything but exactly one `Host` header.
    pub fn new(
        method: &[u8],
        target: &[u8],
        headers: HeaderList,
        http_version: Version,
    ) -> Result<Request, Error> {
        if !headers::is_token(method) {
            return Err(Error::Local(ErrorKind::InvalidEventData(
                "method must be a token")));
        }
        validate_request_target(target)?;
        if http_version == Version::Http11 {
            let host_count = headers.get_all("host").count();
            if host_count != 1 {
                return Err(Error::Local(ErrorKind::BadHostHeader));
            }
        }
        Ok(Request { method: method.to_vec(), target: target.to_vec(), headers, http_version })
    }

    pub fn is_connect(&self) -> bool {
        self.method.eq_ignore_ascii_case(b"CONNECT")
    }

    pub fn is_head(&self) -> bool {
        self.method.eq_ignore_ascii_case(b"HEAD")
    }

    /// True if a non-empty `Upgrade` header is present. Values are already
    /// OWS-trimmed at insertion, so an `Upgrade:` header with only
    /// whitespace (or nothing) after the colon does not count as a switch
    /// proposal, per spec.md §4.4.
    pub fn proposes_upgrade(&self) -> bool {
        self.headers.get_all("upgrade").any(|v| !v.is_empty())
    }
}

fn validate_request_target(target: &[u8]) -> Result<(), Error> {
    if target.is_empty() || target.iter().any(|&b| b == b' ' || b <= 0x1f || b == 0x7f) {
        return Err(Error::Local(ErrorKind::InvalidEventData(
            "request-target must be non-empty and contain no whitespace or control bytes")));
    }
    Ok(())
}

/// A 1xx interim response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InformationalResponse {
    pub status_code: u16,
    pub headers: HeaderList,
    pub http_version: Version,
    pub reason: Vec<u8>,
}

impl InformationalResponse {
    pub fn new(
        status_code: u16,
        headers: HeaderList,
        http_version: Version,
        reason: &[u8],
    ) -> Result<InformationalResponse, Error> {
        if !(100..200).contains(&status_code) {
            return Err(Error::Local(ErrorKind::InvalidEventData(
                "informational status code must be in [100, 200)")));
        }
        validate_reason(reason)?;
        Ok(InformationalResponse {
            status_code,
            headers,
            http_version,
            reason: reason.to_vec(),
        })
    }
}

/// A final (non-1xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status_code: u16,
    pub headers: HeaderList,
    pub http_version: Version,
    pub reason: Vec<u8>,
}

impl Response {
    pub fn new(
        status_code: u16,
        headers: HeaderList,
        http_version: Version,
        reason: &[u8],
    ) -> Result<Response, Error> {
        if !(200..600).contains(&status_code) {
            return Err(Error::Local(ErrorKind::InvalidEventData(
                "response status code must be in [200, 600)")));
        }
        validate_reason(reason)?;
        Ok(Response { status_code, headers, http_version, reason: reason.to_vec() })
    }
}

fn validate_reason(reason: &[u8]) -> Result<(), Error> {
    for &b in reason {
        if !(b == b' ' || b == b'\t' || b >= 0x21) {
            return Err(Error::Local(ErrorKind::InvalidEventData(
                "reason-phrase contains a disallowed control character")));
        }
    }
    Ok(())
}

/// A slice of body data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub data: Vec<u8>,
    /// Informational only: true if this slice starts a new chunk, for
    /// callers that care about chunk boundaries (e.g. for logging).
    pub chunk_start: bool,
    pub chunk_end: bool,
}

impl Data {
    pub fn new(data: Vec<u8>) -> Data {
        Data { data, chunk_start: false, chunk_end: false }
    }
}

/// Terminates the current message. `headers` carries trailers, which are
/// only ever non-empty for a chunked body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EndOfMessage {
    pub headers: HeaderList,
}

/// The connection has been closed in this direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionClosed;

/// A single HTTP/1.1 protocol event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Request(Request),
    InformationalResponse(InformationalResponse),
    Response(Response),
    Data(Data),
    EndOfMessage(EndOfMessage),
    ConnectionClosed(ConnectionClosed),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Request(_) => "Request",
            Event::InformationalResponse(_) => "InformationalResponse",
            Event::Response(_) => "Response",
            Event::Data(_) => "Data",
            Event::EndOfMessage(_) => "EndOfMessage",
            Event::ConnectionClosed(_) => "ConnectionClosed",
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Request(_) => EventKind::Request,
            Event::InformationalResponse(_) => EventKind::InformationalResponse,
            Event::Response(_) => EventKind::Response,
            Event::Data(_) => EventKind::Data,
            Event::EndOfMessage(_) => EventKind::EndOfMessage,
            Event::ConnectionClosed(_) => EventKind::ConnectionClosed,
        }
    }
}

/// The discriminant of an [`Event`], used as a transition-table key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Request,
    InformationalResponse,
    Response,
    Data,
    EndOfMessage,
    ConnectionClosed,
}
