//! Outbound response.

use http::header::{AsHeaderName, IntoHeaderName, LOCATION};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::{Map, Value};

use crate::OAuthResult;
use crate::error::OAuthError;

/// An outbound HTTP response the handlers write into.
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code. Starts at 200.
    pub status: StatusCode,

    /// Response headers.
    pub headers: HeaderMap,

    /// JSON object body.
    pub body: Map<String, Value>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Map::new(),
        }
    }
}

impl Response {
    /// Creates an empty 200 response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a header value, if present and valid UTF-8.
    #[must_use]
    pub fn get<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Sets a header, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if `value` is not a valid header value.
    pub fn set<K: IntoHeaderName>(&mut self, name: K, value: &str) -> OAuthResult<()> {
        let value = HeaderValue::from_str(value).map_err(OAuthError::wrap)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Redirects to `location` with `302 Found`.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if `location` is not a valid header value.
    pub fn redirect(&mut self, location: &str) -> OAuthResult<()> {
        self.set(LOCATION, location)?;
        self.status = StatusCode::FOUND;
        Ok(())
    }

    /// Returns the `Location` header.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.get(LOCATION)
    }
}

#[cfg(test)]
mod tests {
    use http::header::CACHE_CONTROL;

    use super::*;

    #[test]
    fn test_redirect() {
        let mut response = Response::new();
        response.redirect("http://example.com/cb?code=123").unwrap();

        assert_eq!(response.status, StatusCode::FOUND);
        assert_eq!(response.location(), Some("http://example.com/cb?code=123"));
    }

    #[test]
    fn test_set_and_get() {
        let mut response = Response::new();
        response.set(CACHE_CONTROL, "no-store").unwrap();
        assert_eq!(response.get("cache-control"), Some("no-store"));

        assert!(response.set(CACHE_CONTROL, "bad\nvalue").is_err());
        assert_eq!(response.get(CACHE_CONTROL), Some("no-store"));
    }
}
