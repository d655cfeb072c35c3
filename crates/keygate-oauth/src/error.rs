//! OAuth 2.0 error types.
//!
//! Every failure the core raises is an [`OAuthError`]: a single tagged
//! structure carrying an [`ErrorKind`], the HTTP status to answer with, a
//! human-readable message and, for wrapped failures, the original cause.
//!
//! Callers dispatch on [`OAuthError::kind`]. The wire-level `error` code is
//! derived from the kind (see [`ErrorKind::code`]).

use std::fmt;
use std::sync::Arc;

use http::StatusCode;

use crate::model::ModelMethod;

/// Shared, thread-safe cause attached to a wrapped error.
pub type ErrorCause = Arc<dyn std::error::Error + Send + Sync>;

/// An OAuth 2.0 protocol error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct OAuthError {
    kind: ErrorKind,
    status: StatusCode,
    message: String,
    #[source]
    inner: Option<ErrorCause>,
}

impl OAuthError {
    /// Creates an error of the given kind with its default status.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: kind.default_status(),
            message: message.into(),
            inner: None,
        }
    }

    /// Creates a new `InvalidArgument` error (programmer misuse).
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidClient, message)
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidGrant, message)
    }

    /// Creates a new `InvalidScope` error.
    #[must_use]
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidScope, message)
    }

    /// Creates a new `UnauthorizedClient` error.
    #[must_use]
    pub fn unauthorized_client(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnauthorizedClient, message)
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedGrantType, message)
    }

    /// Creates a new `UnsupportedResponseType` error.
    #[must_use]
    pub fn unsupported_response_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedResponseType, message)
    }

    /// Creates a new `AccessDenied` error.
    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessDenied, message)
    }

    /// Creates a new `ServerError` error.
    #[must_use]
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerError, message)
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidToken, message)
    }

    /// Creates a new `InsufficientScope` error.
    #[must_use]
    pub fn insufficient_scope(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientScope, message)
    }

    /// Creates a new `UnauthorizedRequest` error.
    #[must_use]
    pub fn unauthorized_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnauthorizedRequest, message)
    }

    /// Wraps an unexpected failure into a `ServerError`.
    ///
    /// The message is taken from the cause, which stays reachable through
    /// [`std::error::Error::source`].
    #[must_use]
    pub fn wrap(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        let cause: Box<dyn std::error::Error + Send + Sync> = cause.into();
        Self {
            kind: ErrorKind::ServerError,
            status: ErrorKind::ServerError.default_status(),
            message: cause.to_string(),
            inner: Some(Arc::from(cause)),
        }
    }

    /// Creates the `InvalidArgument` error raised when a model lacks a
    /// method a component depends on.
    #[must_use]
    pub fn unimplemented(method: ModelMethod) -> Self {
        Self::invalid_argument(format!(
            "Invalid argument: model does not implement `{method}()`"
        ))
    }

    /// Returns a copy of this error answering with a different status.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the OAuth 2.0 wire code (`error` parameter).
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Returns the human-readable message (`error_description` parameter).
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the wrapped cause, if any.
    #[must_use]
    pub fn inner(&self) -> Option<&ErrorCause> {
        self.inner.as_ref()
    }

    /// Returns `true` if this error was caused by the client (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// Returns `true` if this error was caused by the server (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }
}

/// Kinds of OAuth 2.0 errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A component was constructed or called incorrectly.
    InvalidArgument,
    /// The request is missing a parameter or is otherwise malformed.
    InvalidRequest,
    /// Client authentication failed.
    InvalidClient,
    /// The grant or refresh token is invalid, expired, revoked, or was
    /// issued to another client.
    InvalidGrant,
    /// The requested scope is invalid, unknown, or malformed.
    InvalidScope,
    /// The client may not use this grant type.
    UnauthorizedClient,
    /// The grant type is not supported by the server.
    UnsupportedGrantType,
    /// The response type is not supported by the server.
    UnsupportedResponseType,
    /// The resource owner or server denied the request.
    AccessDenied,
    /// The server hit an unexpected condition.
    ServerError,
    /// The access token is invalid or expired.
    InvalidToken,
    /// The access token lacks the required scope.
    InsufficientScope,
    /// The request carries no authentication information.
    UnauthorizedRequest,
}

impl ErrorKind {
    /// Returns the OAuth 2.0 error code for this kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::InvalidScope => "invalid_scope",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::AccessDenied => "access_denied",
            Self::ServerError => "server_error",
            Self::InvalidToken => "invalid_token",
            Self::InsufficientScope => "insufficient_scope",
            Self::UnauthorizedRequest => "unauthorized_request",
        }
    }

    /// Returns the HTTP status an error of this kind answers with.
    #[must_use]
    pub fn default_status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServerError => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidToken | Self::UnauthorizedRequest => StatusCode::UNAUTHORIZED,
            Self::InsufficientScope => StatusCode::FORBIDDEN,
            Self::InvalidRequest
            | Self::InvalidClient
            | Self::InvalidGrant
            | Self::InvalidScope
            | Self::UnauthorizedClient
            | Self::UnsupportedGrantType
            | Self::UnsupportedResponseType
            | Self::AccessDenied => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors a model (or another collaborator) reports back to the core.
///
/// Protocol errors pass through untouched; anything else is wrapped into a
/// `ServerError` when it reaches the core.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// An OAuth error raised deliberately by the model.
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    /// The model was called for a method it does not implement.
    #[error("model does not implement `{0}()`")]
    Unimplemented(ModelMethod),

    /// A completion callback was dropped without reporting a result.
    #[error("completion callback was dropped without a result")]
    Abandoned,

    /// Any other failure (storage, I/O, ...).
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ModelError {
    /// Wraps an arbitrary failure.
    #[must_use]
    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Other(err.into())
    }
}

impl From<ModelError> for OAuthError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::OAuth(e) => e,
            ModelError::Unimplemented(method) => OAuthError::unimplemented(method),
            ModelError::Abandoned => OAuthError::wrap(ModelError::Abandoned),
            ModelError::Other(cause) => OAuthError::wrap(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OAuthError::invalid_client("Invalid client: client is invalid");
        assert_eq!(err.to_string(), "Invalid client: client is invalid");
        assert_eq!(err.code(), "invalid_client");
        assert_eq!(err.kind(), ErrorKind::InvalidClient);
    }

    #[test]
    fn test_default_status() {
        assert_eq!(
            OAuthError::invalid_argument("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            OAuthError::invalid_grant("x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            OAuthError::server_error("x").status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            OAuthError::invalid_token("x").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            OAuthError::insufficient_scope("x").status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_with_status_keeps_kind() {
        let err = OAuthError::invalid_client("Invalid client: client is invalid")
            .with_status(StatusCode::UNAUTHORIZED);
        assert_eq!(err.kind(), ErrorKind::InvalidClient);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_wrap_preserves_cause() {
        let cause = std::io::Error::other("Unhandled exception");
        let err = OAuthError::wrap(cause);

        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.message(), "Unhandled exception");
        assert!(err.is_server_error());
        assert!(err.inner().is_some());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_model_error_conversion() {
        let err: OAuthError = ModelError::from(OAuthError::access_denied("nope")).into();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
        assert_eq!(err.message(), "nope");

        let err: OAuthError = ModelError::other("database down").into();
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.message(), "database down");

        let err: OAuthError = ModelError::Unimplemented(ModelMethod::SaveToken).into();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            err.message(),
            "Invalid argument: model does not implement `save_token()`"
        );
    }

    #[test]
    fn test_error_kind_codes() {
        assert_eq!(ErrorKind::UnsupportedGrantType.code(), "unsupported_grant_type");
        assert_eq!(
            ErrorKind::UnsupportedResponseType.to_string(),
            "unsupported_response_type"
        );
        assert_eq!(ErrorKind::UnauthorizedClient.code(), "unauthorized_client");
    }
}
