//! Character-class validation for request parameters.
//!
//! Grammars from RFC 6749 Appendix A, plus a loose generic URI shape check
//! (scheme followed by a colon, RFC 3986 Section 3).
//!
//! Every predicate rejects the empty string. Callers decide what an absent
//! parameter means before validating it.

use std::sync::LazyLock;

use regex::Regex;

static NCHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\-._A-Za-z0-9]+$").expect("Invalid nchar regex"));

static NQCHAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\x21\x23-\x5B\x5D-\x7E]+$").expect("Invalid nqchar regex")
});

static NQSCHAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\x20-\x21\x23-\x5B\x5D-\x7E]+$").expect("Invalid nqschar regex")
});

static UCHAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\x09\x20-\x7E\x{80}-\x{D7FF}\x{E000}-\x{FFFD}\x{10000}-\x{10FFFF}]+$")
        .expect("Invalid uchar regex")
});

static URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]+:").expect("Invalid uri regex"));

static VSCHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\x20-\x7E]+$").expect("Invalid vschar regex"));

/// `name-char`: ASCII letters, digits, `-`, `.` and `_`.
///
/// Used for `grant_type` values that are not URIs.
#[must_use]
pub fn nchar(value: &str) -> bool {
    NCHAR.is_match(value)
}

/// `nqchar`: printable ASCII without space, `"` and `\`.
#[must_use]
pub fn nqchar(value: &str) -> bool {
    NQCHAR.is_match(value)
}

/// `nqschar`: printable ASCII without `"` and `\`, space allowed.
///
/// Used for `scope`.
#[must_use]
pub fn nqschar(value: &str) -> bool {
    NQSCHAR.is_match(value)
}

/// `unicodecharnocrlf`: any Unicode scalar except control characters,
/// horizontal tab allowed. Rejects CR and LF.
///
/// Used for `username` and `password`.
#[must_use]
pub fn uchar(value: &str) -> bool {
    UCHAR.is_match(value)
}

/// Generic URI shape: a scheme of two or more characters followed by `:`.
#[must_use]
pub fn uri(value: &str) -> bool {
    URI.is_match(value)
}

/// `vschar`: printable ASCII, space included.
#[must_use]
pub fn vschar(value: &str) -> bool {
    VSCHAR.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nchar() {
        assert!(nchar("authorization_code"));
        assert!(nchar("refresh-token.v2"));
        assert!(!nchar("urn:ietf:params:oauth:grant-type:saml2-bearer"));
        assert!(!nchar("with space"));
        assert!(!nchar("ümlaut"));
        assert!(!nchar(""));
    }

    #[test]
    fn test_nqchar() {
        assert!(nqchar("read!write"));
        assert!(!nqchar("read write"));
        assert!(!nqchar("\"quoted\""));
        assert!(!nqchar("back\\slash"));
    }

    #[test]
    fn test_nqschar() {
        assert!(nqschar("read write"));
        assert!(nqschar("openid profile:read"));
        assert!(!nqschar("\"quoted\""));
        assert!(!nqschar("back\\slash"));
        assert!(!nqschar("tab\there"));
    }

    #[test]
    fn test_uchar() {
        assert!(uchar("foo\tbar"));
        assert!(uchar("jörg 名前"));
        assert!(!uchar("foo\r\nbar"));
        assert!(!uchar("foo\nbar"));
        assert!(!uchar("\u{7f}"));
    }

    #[test]
    fn test_uri() {
        assert!(uri("http://example.com/cb"));
        assert!(uri("urn:ietf:params:oauth:grant-type:saml2-bearer"));
        assert!(uri("com.example.app:/callback"));
        assert!(!uri("a:b"));
        assert!(!uri("/relative/path"));
        assert!(!uri("1http://example.com"));
    }

    #[test]
    fn test_vschar() {
        assert!(vschar("foo bar ~!"));
        assert!(!vschar("foo\u{7f}"));
        assert!(!vschar("é"));
        assert!(!vschar(""));
    }
}
