//! HTTP Basic credentials (RFC 7617).

use base64::{Engine, engine::general_purpose::STANDARD};

/// Credentials decoded from an `Authorization: Basic` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// User id part (the client id at the token endpoint).
    pub name: String,
    /// Password part (the client secret).
    pub pass: String,
}

/// Parses an `Authorization` header value of the form `Basic <base64>`.
///
/// The scheme is matched case-insensitively. Returns `None` for any other
/// scheme or for a malformed payload.
#[must_use]
pub fn parse_basic_auth(header: &str) -> Option<BasicCredentials> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (name, pass) = decoded.split_once(':')?;

    Some(BasicCredentials {
        name: name.to_string(),
        pass: pass.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_auth_valid() {
        let header = format!("Basic {}", STANDARD.encode(b"foo:bar"));
        let credentials = parse_basic_auth(&header).unwrap();
        assert_eq!(credentials.name, "foo");
        assert_eq!(credentials.pass, "bar");
    }

    #[test]
    fn test_parse_basic_auth_secret_with_colon() {
        let header = format!("basic {}", STANDARD.encode(b"foo:b:a:r"));
        let credentials = parse_basic_auth(&header).unwrap();
        assert_eq!(credentials.pass, "b:a:r");
    }

    #[test]
    fn test_parse_basic_auth_invalid() {
        assert!(parse_basic_auth("Bearer token").is_none());
        assert!(parse_basic_auth("Basic !!!invalid!!!").is_none());
        let header = format!("Basic {}", STANDARD.encode(b"no-colon-here"));
        assert!(parse_basic_auth(&header).is_none());
    }
}
