//! Authorization response types (RFC 6749 Section 3.1.1).
//!
//! A response type decides how an issued authorization code reaches the
//! client on the success redirect. Only `code` is built in; others can be
//! registered on a [`ResponseTypes`] map.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::OAuthResult;
use crate::error::OAuthError;

/// Builds the success redirect for an issued authorization code.
pub trait ResponseType: Send + Sync {
    /// Returns `redirect_uri` carrying the response parameters.
    fn build_redirect_uri(&self, redirect_uri: &Url) -> Url;
}

/// The `code` response type: appends `code=<value>` to the redirect URI,
/// keeping its existing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeResponseType {
    code: String,
}

impl CodeResponseType {
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `code` is empty.
    pub fn new(code: impl Into<String>) -> OAuthResult<Self> {
        let code = code.into();
        if code.is_empty() {
            return Err(OAuthError::invalid_argument("Missing parameter: `code`"));
        }
        Ok(Self { code })
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl ResponseType for CodeResponseType {
    fn build_redirect_uri(&self, redirect_uri: &Url) -> Url {
        let mut uri = redirect_uri.clone();
        uri.query_pairs_mut().append_pair("code", &self.code);
        uri
    }
}

/// Constructs a response type for an issued code.
pub type ResponseTypeFactory =
    Arc<dyn Fn(&str) -> OAuthResult<Box<dyn ResponseType>> + Send + Sync>;

/// Response types accepted at the authorize endpoint, keyed by
/// `response_type`.
#[derive(Clone)]
pub struct ResponseTypes {
    factories: HashMap<String, ResponseTypeFactory>,
}

impl ResponseTypes {
    /// A map with no response types.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers a response type, replacing any previous one with the same
    /// name.
    pub fn register(&mut self, name: impl Into<String>, factory: ResponseTypeFactory) {
        self.factories.insert(name.into(), factory);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Builds the response type registered under `name` for `code`.
    ///
    /// Returns `None` if `name` is not registered.
    #[must_use]
    pub fn build(&self, name: &str, code: &str) -> Option<OAuthResult<Box<dyn ResponseType>>> {
        self.factories.get(name).map(|factory| factory(code))
    }
}

impl Default for ResponseTypes {
    fn default() -> Self {
        let mut types = Self::empty();
        types.register(
            "code",
            Arc::new(|code: &str| {
                CodeResponseType::new(code).map(|t| Box::new(t) as Box<dyn ResponseType>)
            }),
        );
        types
    }
}

impl fmt::Debug for ResponseTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_empty_code() {
        let err = CodeResponseType::new("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.message(), "Missing parameter: `code`");
    }

    #[test]
    fn test_build_redirect_uri() {
        let response_type = CodeResponseType::new(123.to_string()).unwrap();
        let uri = Url::parse("http://example.com/cb").unwrap();
        assert_eq!(
            response_type.build_redirect_uri(&uri).as_str(),
            "http://example.com/cb?code=123"
        );
    }

    #[test]
    fn test_build_redirect_uri_keeps_query() {
        let response_type = CodeResponseType::new("123").unwrap();
        let uri = Url::parse("http://example.com/cb?foo=bar").unwrap();
        assert_eq!(
            response_type.build_redirect_uri(&uri).as_str(),
            "http://example.com/cb?foo=bar&code=123"
        );
    }

    #[test]
    fn test_default_registry() {
        let types = ResponseTypes::default();
        assert!(types.contains("code"));
        assert!(!types.contains("token"));
        assert!(types.build("token", "123").is_none());

        let uri = Url::parse("http://example.com/cb").unwrap();
        let built = types.build("code", "123").unwrap().unwrap();
        assert_eq!(
            built.build_redirect_uri(&uri).as_str(),
            "http://example.com/cb?code=123"
        );
    }
}
