//! Per-framing body writers.
//!
//! Grounded on h11's `NoBodyFramer`/`ContentLengthFramer`/`ChunkedFramer`/
//! `HTTP10Framer` in `connection.py`: each tracks just enough state to
//! validate its own framing invariant (a content-length body must end up
//! exactly full; a body-less message must receive no data and no
//! trailers) before formatting bytes.

use crate::body::Framing;
use crate::error::{Error, ErrorKind};
use crate::headers::HeaderList;

pub enum BodyWriter {
    NoBody,
    ContentLength { declared: u64, sent: u64 },
    Chunked,
    Http10,
}

impl BodyWriter {
    pub fn for_framing(framing: Framing) -> BodyWriter {
        match framing {
            Framing::ContentLengthZero => BodyWriter::NoBody,
            Framing::ContentLength(len) => BodyWriter::ContentLength { declared: len, sent: 0 },
            Framing::Chunked => BodyWriter::Chunked,
            Framing::ReadUntilClose => BodyWriter::Http10,
        }
    }

    pub fn write_data(&mut self, data: &[u8]) -> Result<Vec<u8>, Error> {
        match self {
            BodyWriter::NoBody => {
                if !data.is_empty() {
                    return Err(Error::Local(ErrorKind::FramingMismatch(
                        "no body is allowed for this message")));
                }
                Ok(Vec::new())
            }
            BodyWriter::ContentLength { declared, sent } => {
                *sent += data.len() as u64;
                if *sent > *declared {
                    return Err(Error::Local(ErrorKind::FramingMismatch(
                        "wrote more bytes than the declared Content-Length")));
                }
                Ok(data.to_vec())
            }
            BodyWriter::Chunked => {
                if data.is_empty() {
                    return Ok(Vec::new());
                }
                let mut out = Vec::with_capacity(data.len() + 16);
                out.extend_from_slice(format!("{:x}\r\n", data.len()).as_bytes());
                out.extend_from_slice(data);
                out.extend_from_slice(b"\r\n");
                Ok(out)
            }
            BodyWriter::Http10 => Ok(data.to_vec()),
        }
    }

    pub fn write_eom(&mut self, trailers: &HeaderList) -> Result<Vec<u8>, Error> {
        match self {
            BodyWriter::NoBody => {
                if !trailers.is_empty() {
                    return Err(Error::Local(ErrorKind::FramingMismatch(
                        "cannot send trailers on a body-less message")));
                }
                Ok(Vec::new())
            }
            BodyWriter::ContentLength { declared, sent } => {
                if !trailers.is_empty() {
                    return Err(Error::Local(ErrorKind::FramingMismatch(
                        "cannot send trailers with Content-Length framing")));
                }
                if *sent != *declared {
                    return Err(Error::Local(ErrorKind::FramingMismatch(
                        "declared Content-Length doesn't match the bytes actually sent")));
                }
                Ok(Vec::new())
            }
            BodyWriter::Chunked => {
                let mut out = Vec::from(&b"0\r\n"[..]);
                for (name, value) in trailers.iter() {
                    out.extend_from_slice(name.as_bytes());
                    out.extend_from_slice(b": ");
                    out.extend_from_slice(value);
                    out.extend_from_slice(b"\r\n");
                }
                out.extend_from_slice(b"\r\n");
                Ok(out)
            }
            BodyWriter::Http10 => {
                if !trailers.is_empty() {
                    return Err(Error::Local(ErrorKind::FramingMismatch(
                        "cannot send trailers to an HTTP/1.0 peer")));
                }
                // No terminator on the wire; the connection is closed
                // afterward to signal the end of the body.
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn no_body_writer_rejects_data() {
        let mut w = BodyWriter::for_framing(Framing::ContentLengthZero);
        assert!(w.write_data(b"x").is_err());
        assert!(w.write_eom(&HeaderList::new()).is_ok());
    }

    #[test]
    fn content_length_writer_detects_underrun() {
        let mut w = BodyWriter::for_framing(Framing::ContentLength(5));
        w.write_data(b"abc").unwrap();
        assert!(w.write_eom(&HeaderList::new()).is_err());
    }

    #[test]
    fn content_length_writer_detects_overrun() {
        let mut w = BodyWriter::for_framing(Framing::ContentLength(2));
        assert!(w.write_data(b"abc").is_err());
    }

    #[test]
    fn content_length_writer_accepts_exact_length() {
        let mut w = BodyWriter::for_framing(Framing::ContentLength(5));
        w.write_data(b"ab").unwrap();
        w.write_data(b"cde").unwrap();
        assert!(w.write_eom(&HeaderList::new()).is_ok());
    }

    #[test]
    fn chunked_writer_formats_size_and_terminator() {
        let mut w = BodyWriter::for_framing(Framing::Chunked);
        assert_eq!(w.write_data(b"hello").unwrap(), b"5\r\nhello\r\n");
        assert_eq!(w.write_eom(&HeaderList::new()).unwrap(), b"0\r\n\r\n");
    }

    #[test]
    fn chunked_writer_includes_trailers() {
        let mut w = BodyWriter::for_framing(Framing::Chunked);
        let mut trailers = HeaderList::new();
        trailers.append(b"X-Trailer", b"done").unwrap();
        assert_eq!(w.write_eom(&trailers).unwrap(), b"0\r\nx-trailer: done\r\n\r\n");
    }

    #[test]
    fn http10_writer_passes_data_through_verbatim() {
        let mut w = BodyWriter::for_framing(Framing::ReadUntilClose);
        assert_eq!(w.write_data(b"raw").unwrap(), b"raw");
        assert!(w.write_eom(&HeaderList::new()).is_ok());
    }
}
