//! Turns buffered bytes into [`Event`]s.
//!
//! A reader is selected by `(role, state)` for message heads, and by
//! [`crate::body::Framing`] for bodies (see [`bodyreader`]). Each one takes
//! the shared [`ReceiveBuffer`], and either completes an event, asks for
//! more data (`Ok(None)`), or reports a [`Error::Remote`] protocol
//! violation - mirroring h11's `READERS` dispatch table in `readers.py`.

pub mod bodyreader;
pub mod headline;

use crate::buffer::ReceiveBuffer;
use crate::error::Error;
use crate::event::{Event, InformationalResponse, Request, Response};
use headline::{parse_header_lines, parse_request_line, parse_status_line};

fn remote(err: Error) -> Error {
    Error::Remote(err.kind().clone())
}

/// Reads a request-line plus headers into an `Event::Request`. Used for the
/// client's `IDLE` state.
pub fn read_request_head(buf: &mut ReceiveBuffer) -> Result<Option<Event>, Error> {
    let lines = loop {
        let lines = match buf.extract_lines() {
            None => return Ok(None),
            Some(lines) => lines,
        };
        // A bare blank line before any request-line: not a valid request,
        // but also not worth treating as EOF - ask for more data, the way
        // a stray empty keep-alive line between requests is tolerated by
        // popular servers. Loop rather than recurse: a peer can hand us
        // an unbounded run of blank lines in one `receive_data` call.
        if !lines.is_empty() {
            break lines;
        }
    };
    let (method, target, version) = parse_request_line(&lines[0])?;
    let headers = parse_header_lines(&lines[1..])?;
    let request = Request::new(&method, &target, headers, version).map_err(remote)?;
    Ok(Some(Event::Request(request)))
}

/// Reads a status-line plus headers into an `Event::InformationalResponse`
/// or `Event::Response`. Used for the server's `IDLE`/`SEND_RESPONSE` states.
pub fn read_response_head(buf: &mut ReceiveBuffer) -> Result<Option<Event>, Error> {
    let lines = loop {
        let lines = match buf.extract_lines() {
            None => return Ok(None),
            Some(lines) => lines,
        };
        if !lines.is_empty() {
            break lines;
        }
    };
    let (version, status_code, reason) = parse_status_line(&lines[0])?;
    let headers = parse_header_lines(&lines[1..])?;
    if status_code < 200 {
        let response = InformationalResponse::new(status_code, headers, version, &reason).map_err(remote)?;
        Ok(Some(Event::InformationalResponse(response)))
    } else {
        let response = Response::new(status_code, headers, version, &reason).map_err(remote)?;
        Ok(Some(Event::Response(response)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_a_simple_request() {
        let mut buf = ReceiveBuffer::new();
        buf.append(b"GET /a HTTP/1.1\r\nHost: x\r\n\r\n");
        match read_request_head(&mut buf).unwrap().unwrap() {
            Event::Request(req) => {
                assert_eq!(req.method, b"GET");
                assert_eq!(req.target, b"/a");
            }
            _ => panic!("expected Request"),
        }
    }

    #[test]
    fn asks_for_more_data_on_partial_request() {
        let mut buf = ReceiveBuffer::new();
        buf.append(b"GET /a HTTP/1.1\r\nHost: x");
        assert!(read_request_head(&mut buf).unwrap().is_none());
    }

    #[test]
    fn many_leading_blank_lines_do_not_overflow_the_stack() {
        // Regression test: `read_request_head` used to recurse once per
        // leading blank line; a single `receive_data` call can hand us an
        // arbitrarily long run of them.
        let mut buf = ReceiveBuffer::new();
        buf.append(&b"\r\n".repeat(100_000));
        buf.append(b"GET /a HTTP/1.1\r\nHost: x\r\n\r\n");
        match read_request_head(&mut buf).unwrap().unwrap() {
            Event::Request(req) => assert_eq!(req.target, b"/a"),
            _ => panic!("expected Request"),
        }
    }

    #[test]
    fn reads_an_informational_response() {
        let mut buf = ReceiveBuffer::new();
        buf.append(b"HTTP/1.1 100 Continue\r\n\r\n");
        assert!(matches!(
            read_response_head(&mut buf).unwrap().unwrap(),
            Event::InformationalResponse(_)
        ));
    }

    #[test]
    fn reads_a_final_response() {
        let mut buf = ReceiveBuffer::new();
        buf.append(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        assert!(matches!(read_response_head(&mut buf).unwrap().unwrap(), Event::Response(_)));
    }

    #[test]
    fn rejects_malformed_request_line() {
        let mut buf = ReceiveBuffer::new();
        buf.append(b"GET\r\n\r\n");
        assert!(read_request_head(&mut buf).is_err());
    }
}
