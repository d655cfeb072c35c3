//! Inbound request.

use std::collections::HashMap;

use http::header::{AsHeaderName, CONTENT_TYPE, IntoHeaderName};
use http::{HeaderMap, HeaderValue, Method};

/// An inbound HTTP request, already parsed into method, headers, query
/// parameters and form body.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// HTTP method.
    pub method: Method,

    /// Request headers. Lookups are case-insensitive.
    pub headers: HeaderMap,

    /// Query string parameters.
    pub query: HashMap<String, String>,

    /// Form body parameters.
    pub body: HashMap<String, String>,
}

impl Request {
    /// Creates an empty request with the given method.
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Builds a request from a raw query string and a raw
    /// `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn from_parts(method: Method, headers: HeaderMap, query: &str, body: &[u8]) -> Self {
        Self {
            method,
            headers,
            query: parse_form(query.as_bytes()),
            body: parse_form(body),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Adds a body parameter.
    #[must_use]
    pub fn with_body(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.body.insert(name.into(), value.into());
        self
    }

    /// Returns a header value, if present and valid UTF-8.
    #[must_use]
    pub fn get<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns `true` if the request's content type is `mime`.
    ///
    /// Parameters such as `charset` are ignored and the comparison is
    /// case-insensitive.
    #[must_use]
    pub fn is(&self, mime: &str) -> bool {
        self.get(CONTENT_TYPE)
            .and_then(|value| value.split(';').next())
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(mime))
    }

    /// Returns a non-empty parameter from the body, falling back to the
    /// query string.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        non_empty(self.body.get(name)).or_else(|| non_empty(self.query.get(name)))
    }

    /// Returns a non-empty body parameter.
    #[must_use]
    pub fn body_param(&self, name: &str) -> Option<&str> {
        non_empty(self.body.get(name))
    }

    /// Returns a non-empty query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        non_empty(self.query.get(name))
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

fn parse_form(input: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(input).into_owned().collect()
}
