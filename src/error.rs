//! Error types for the protocol engine.
//!
//! Every fault is either a [`Error::Local`] (the caller asked the engine to
//! do something HTTP/1.1 forbids) or a [`Error::Remote`] (the bytes we
//! received are not valid HTTP/1.1). Both carry an [`ErrorKind`], which in
//! turn carries a suggested HTTP status code a server collaborator can use
//! to reply to a misbehaving peer before closing the connection.
//!
//! This mirrors `h11`'s `LocalProtocolError`/`RemoteProtocolError` split,
//! but without the identity-rewriting trick the original uses to turn one
//! into the other: in Rust we just construct the right variant at the call
//! site that knows which side is at fault.

use std::error::Error as StdError;
use std::fmt;

quick_error::quick_error! {
    /// What, specifically, went wrong.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ErrorKind {
        /// An event was constructed with data that is never legal on the wire
        /// (e.g. a request-target containing whitespace).
        InvalidEventData(msg: &'static str) {
            display("invalid event data: {}", msg)
        }
        /// A header name or value failed grammar validation.
        InvalidHeader(msg: &'static str) {
            display("invalid header: {}", msg)
        }
        /// More than one `Content-Length`, or one that isn't a plain integer.
        DuplicateOrBadContentLength {
            display("duplicate or malformed Content-Length header")
        }
        /// `Transfer-Encoding` present with something other than `chunked`.
        UnsupportedTransferEncoding {
            display("only Transfer-Encoding: chunked is supported")
        }
        /// An HTTP/1.1 request with zero, or more than one, `Host` header.
        BadHostHeader {
            display("HTTP/1.1 requests must have exactly one Host header")
        }
        /// The start line (request-line or status-line) didn't parse.
        BadStartLine {
            display("malformed request-line or status-line")
        }
        /// A chunk-size line didn't parse, or exceeded the 20 hex digit cap.
        BadChunkFraming {
            display("malformed chunked-encoding framing")
        }
        /// The peer closed (or we hit the body boundary) before the declared
        /// Content-Length was satisfied.
        PeerClosedMidBody {
            display("connection closed before declared body length was sent")
        }
        /// EOF arrived with a request-line/status-line or header block only
        /// partially received.
        PeerClosedMidHeaders {
            display("connection closed before a complete request/status line and headers arrived")
        }
        /// Bytes arrived in a state where this engine expects none at all
        /// (past `MUST_CLOSE`/`CLOSED`, or in a terminal error state).
        UnexpectedData {
            display("data received in a state where none is expected")
        }
        /// The receive buffer grew past `max_buffer_size` without completing
        /// whatever it was reading.
        BufferOverflow {
            display("incoming data exceeded the configured buffer limit")
        }
        /// `send`/`receive_data` called for an event illegal in the current
        /// state, per the (role, state, event) transition table.
        WrongState(action: &'static str) {
            display("cannot {} in the current connection state", action)
        }
        /// Outgoing Content-Length framing under- or over-run.
        FramingMismatch(msg: &'static str) {
            display("framing mismatch: {}", msg)
        }
        /// A direction already in ERROR (or past CLOSED) was used again.
        AlreadyFailedOrClosed {
            display("this side of the connection already failed or closed")
        }
        /// `start_next_cycle` called before both parties are reusable.
        NotReusable {
            display("connection is not in a reusable state")
        }
    }
}

impl ErrorKind {
    /// Suggested HTTP status code a server might reply with.
    pub fn status_hint(&self) -> u16 {
        use ErrorKind::*;
        match *self {
            BufferOverflow => 431,
            UnsupportedTransferEncoding => 501,
            _ => 400,
        }
    }
}

/// A protocol violation, tagged with which side is responsible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The caller (this process) tried to do something HTTP/1.1 forbids.
    /// Our side of the connection moves to `ERROR`.
    Local(ErrorKind),
    /// The peer sent bytes that violate HTTP/1.1. Their side of the
    /// connection moves to `ERROR`.
    Remote(ErrorKind),
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        match self {
            Error::Local(k) | Error::Remote(k) => k,
        }
    }

    /// Suggested HTTP status code, see [`ErrorKind::status_hint`].
    pub fn status_hint(&self) -> u16 {
        self.kind().status_hint()
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Error::Local(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Remote(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Local(k) => write!(f, "local protocol error: {}", k),
            Error::Remote(k) => write!(f, "remote protocol error: {}", k),
        }
    }
}

impl StdError for Error {}

pub type Result<T> = std::result::Result<T, Error>;
