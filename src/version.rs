use std::fmt;

/// Represents a version of the HTTP spec.
///
/// HTTP/0.9 is only of historic importance and is not supported: any
/// request-line too malformed to match `HTTP/D.D` is simply a parse error,
/// never silently downgraded.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Version {
    /// HTTP/1.0, which closes the connection by default.
    Http10,
    /// HTTP/1.1 as described by RFC 7230 and friends.
    Http11,
}

impl Version {
    /// Parses an `HTTP/D.D` token as it appears in a request or status line.
    ///
    /// Versions `>= 1.1` collapse to `Http11` and versions `< 1.0` collapse
    /// to `Http10` for keep-alive purposes, per the wire-format concessions
    /// in the spec: only the major/minor digits matter, anything beyond
    /// 1.1 is still treated as 1.1 since this engine speaks HTTP/1.x only.
    pub fn parse(bytes: &[u8]) -> Option<Version> {
        if bytes.len() != 8 || &bytes[..5] != b"HTTP/" || bytes[6] != b'.' {
            return None;
        }
        let major = bytes[5];
        let minor = bytes[7];
        if !major.is_ascii_digit() || !minor.is_ascii_digit() {
            return None;
        }
        let major = major - b'0';
        let minor = minor - b'0';
        if major > 1 || (major == 1 && minor >= 1) {
            Some(Version::Http11)
        } else {
            Some(Version::Http10)
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        })
    }
}

#[cfg(test)]
mod test {
    use super::Version;

    #[test]
    fn parses_exact() {
        assert_eq!(Version::parse(b"HTTP/1.0"), Some(Version::Http10));
        assert_eq!(Version::parse(b"HTTP/1.1"), Some(Version::Http11));
    }

    #[test]
    fn clamps_future_minor_versions_to_11() {
        assert_eq!(Version::parse(b"HTTP/1.9"), Some(Version::Http11));
        assert_eq!(Version::parse(b"HTTP/2.0"), Some(Version::Http11));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Version::parse(b"HTTP/1.x"), None);
        assert_eq!(Version::parse(b"http/1.1"), None);
        assert_eq!(Version::parse(b"HTTP/11"), None);
    }
}
