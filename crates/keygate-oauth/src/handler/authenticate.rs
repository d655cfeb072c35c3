//! Bearer token authentication for protected resources (RFC 6750).
//!
//! The token is read from exactly one of:
//!
//! - the `Authorization: Bearer <token>` header;
//! - the `access_token` query parameter, if explicitly allowed;
//! - the `access_token` form body parameter (never with `GET`).
//!
//! Failures carry a `WWW-Authenticate: Bearer realm="Service"` challenge.

use std::fmt;
use std::sync::{Arc, LazyLock};

use http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use http::{HeaderValue, Method};
use regex::Regex;
use time::OffsetDateTime;
use tracing::{debug, error, warn};

use crate::OAuthResult;
use crate::adapter::Outcome;
use crate::config::ServerConfig;
use crate::error::{ErrorKind, ModelError, OAuthError};
use crate::http::{Request, Response};
use crate::model::{self, Model, ModelMethod};
use crate::types::Token;

static BEARER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Bearer\s(\S+)").expect("Invalid bearer regex"));

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Resolves the user behind a request at the authorize endpoint.
///
/// [`AuthenticateHandler`] is the default implementation. Applications with
/// session-based login provide their own.
pub trait Authenticator: Send + Sync {
    /// Authenticates the request. The returned token must carry a user.
    fn authenticate<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
    ) -> Outcome<'a, Option<Token>>;
}

/// Options for [`AuthenticateHandler`].
#[derive(Clone)]
pub struct AuthenticateOptions {
    /// Must implement `get_access_token`, and `verify_scope` when `scope`
    /// is set.
    pub model: Arc<dyn Model>,
    /// Scope the token must cover.
    pub scope: Option<String>,
    pub add_accepted_scopes_header: bool,
    pub add_authorized_scopes_header: bool,
    pub allow_bearer_tokens_in_query_string: bool,
}

impl AuthenticateOptions {
    /// Options with defaults taken from `config`.
    #[must_use]
    pub fn from_config(model: Arc<dyn Model>, config: &ServerConfig) -> Self {
        Self {
            model,
            scope: None,
            add_accepted_scopes_header: config.add_accepted_scopes_header,
            add_authorized_scopes_header: config.add_authorized_scopes_header,
            allow_bearer_tokens_in_query_string: config.allow_bearer_tokens_in_query_string,
        }
    }

    /// Requires the token to cover `scope`.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

impl fmt::Debug for AuthenticateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticateOptions")
            .field("scope", &self.scope)
            .field("add_accepted_scopes_header", &self.add_accepted_scopes_header)
            .field(
                "add_authorized_scopes_header",
                &self.add_authorized_scopes_header,
            )
            .field(
                "allow_bearer_tokens_in_query_string",
                &self.allow_bearer_tokens_in_query_string,
            )
            .finish_non_exhaustive()
    }
}

/// Validates bearer access tokens.
pub struct AuthenticateHandler {
    options: AuthenticateOptions,
}

impl AuthenticateHandler {
    /// Creates the handler.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the model lacks `get_access_token`, or
    /// `verify_scope` while a scope is required.
    pub fn new(options: AuthenticateOptions) -> OAuthResult<Self> {
        model::require(options.model.as_ref(), &[ModelMethod::GetAccessToken])?;
        if options.scope.is_some() {
            model::require(options.model.as_ref(), &[ModelMethod::VerifyScope])?;
        }
        Ok(Self { options })
    }

    /// Authenticates `request` and returns the access token.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest`, `UnauthorizedRequest`, `InvalidToken`,
    /// `InsufficientScope`, or `ServerError` for a misbehaving model. The
    /// matching challenge is set on `response`.
    pub async fn handle(&self, request: &Request, response: &mut Response) -> OAuthResult<Token> {
        match self.authenticate_request(request, response).await {
            Ok(token) => Ok(token),
            Err(e) => {
                if let Some(challenge) = challenge(e.kind()) {
                    response
                        .headers
                        .insert(WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
                }
                if e.is_server_error() {
                    error!(error = %e, "Bearer authentication failed");
                } else {
                    warn!(error = %e, "Bearer authentication rejected");
                }
                Err(e)
            }
        }
    }

    async fn authenticate_request(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<Token> {
        let request_token = self.token_from_request(request)?;
        let token = self.access_token(request_token).await?;
        validate_access_token(&token)?;

        if let Some(scope) = &self.options.scope {
            self.verify_scope(&token, scope).await?;
            self.update_response(response, scope, &token)?;
        }

        debug!(client_id = ?token.client.as_ref().map(|c| &c.id), "Bearer token accepted");
        Ok(token)
    }

    fn token_from_request<'r>(&self, request: &'r Request) -> OAuthResult<&'r str> {
        let header_token = request.get(AUTHORIZATION).filter(|v| !v.is_empty());
        let query_token = request.query_param("access_token");
        let body_token = request.body_param("access_token");

        let provided = [header_token, query_token, body_token]
            .iter()
            .filter(|t| t.is_some())
            .count();

        if provided > 1 {
            return Err(OAuthError::invalid_request(
                "Invalid request: only one authentication method is allowed",
            ));
        }

        if let Some(header) = header_token {
            return token_from_header(header);
        }

        if let Some(token) = query_token {
            if !self.options.allow_bearer_tokens_in_query_string {
                return Err(OAuthError::invalid_request(
                    "Invalid request: do not send bearer tokens in query URLs",
                ));
            }
            return Ok(token);
        }

        if let Some(token) = body_token {
            if request.method == Method::GET {
                return Err(OAuthError::invalid_request(
                    "Invalid request: token may not be passed in the body when using the GET verb",
                ));
            }
            if !request.is(FORM_URLENCODED) {
                return Err(OAuthError::invalid_request(
                    "Invalid request: content must be application/x-www-form-urlencoded",
                ));
            }
            return Ok(token);
        }

        Err(OAuthError::unauthorized_request(
            "Unauthorized request: no authentication given",
        ))
    }

    async fn access_token(&self, request_token: &str) -> OAuthResult<Token> {
        let token = self
            .options
            .model
            .get_access_token(request_token)
            .resolve()
            .await?
            .ok_or_else(|| OAuthError::invalid_token("Invalid token: access token is invalid"))?;

        if token.user.is_none() {
            return Err(OAuthError::server_error(
                "Server error: `get_access_token()` did not return a `user` object",
            ));
        }

        Ok(token)
    }

    async fn verify_scope(&self, token: &Token, scope: &str) -> OAuthResult<()> {
        let covered = self
            .options
            .model
            .verify_scope(token, scope)
            .resolve()
            .await?;

        if !covered {
            return Err(OAuthError::insufficient_scope(
                "Insufficient scope: authorized scope is insufficient",
            ));
        }

        Ok(())
    }

    fn update_response(&self, response: &mut Response, scope: &str, token: &Token) -> OAuthResult<()> {
        if self.options.add_accepted_scopes_header {
            response.set("x-accepted-oauth-scopes", scope)?;
        }
        if self.options.add_authorized_scopes_header {
            if let Some(granted) = &token.scope {
                response.set("x-oauth-scopes", granted)?;
            }
        }
        Ok(())
    }
}

impl Authenticator for AuthenticateHandler {
    fn authenticate<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
    ) -> Outcome<'a, Option<Token>> {
        Outcome::deferred(async move {
            self.handle(request, response)
                .await
                .map(Some)
                .map_err(ModelError::from)
        })
    }
}

impl fmt::Debug for AuthenticateHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticateHandler")
            .field("options", &self.options)
            .finish()
    }
}

fn token_from_header(header: &str) -> OAuthResult<&str> {
    BEARER
        .captures(header)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| {
            OAuthError::invalid_request("Invalid request: malformed authorization header")
        })
}

fn validate_access_token(token: &Token) -> OAuthResult<()> {
    let Some(expires_at) = token.access_token_expires_at else {
        return Err(OAuthError::server_error(
            "Server error: `access_token_expires_at` must be set",
        ));
    };

    if expires_at < OffsetDateTime::now_utc() {
        return Err(OAuthError::invalid_token(
            "Invalid token: access token has expired",
        ));
    }

    Ok(())
}

fn challenge(kind: ErrorKind) -> Option<&'static str> {
    match kind {
        ErrorKind::UnauthorizedRequest => Some(r#"Bearer realm="Service""#),
        ErrorKind::InvalidRequest => Some(r#"Bearer realm="Service",error="invalid_request""#),
        ErrorKind::InvalidToken => Some(r#"Bearer realm="Service",error="invalid_token""#),
        ErrorKind::InsufficientScope => {
            Some(r#"Bearer realm="Service",error="insufficient_scope""#)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use http::header::CONTENT_TYPE;
    use serde_json::json;

    use super::*;
    use crate::types::{Client, User};

    struct AccessTokens {
        token: Option<Token>,
        covers: bool,
    }

    impl Model for AccessTokens {
        fn implements(&self, method: ModelMethod) -> bool {
            matches!(
                method,
                ModelMethod::GetAccessToken | ModelMethod::VerifyScope
            )
        }

        fn get_access_token<'a>(&'a self, access_token: &'a str) -> Outcome<'a, Option<Token>> {
            Outcome::ready(
                self.token
                    .clone()
                    .filter(|t| t.access_token == access_token),
            )
        }

        fn verify_scope<'a>(&'a self, _token: &'a Token, _scope: &'a str) -> Outcome<'a, bool> {
            Outcome::ready(self.covers)
        }
    }

    fn valid_token() -> Token {
        Token {
            access_token: "foo".to_string(),
            access_token_expires_at: Some(OffsetDateTime::now_utc() + time::Duration::hours(1)),
            scope: Some("read write".to_string()),
            client: Some(Client::new("app")),
            user: Some(User::new(json!({ "id": 1 }))),
            ..Token::default()
        }
    }

    fn handler(token: Option<Token>) -> AuthenticateHandler {
        let model = Arc::new(AccessTokens {
            token,
            covers: true,
        });
        AuthenticateHandler::new(AuthenticateOptions::from_config(
            model,
            &ServerConfig::default(),
        ))
        .unwrap()
    }

    fn bearer(value: &'static str) -> Request {
        Request::new(Method::GET).with_header(AUTHORIZATION, HeaderValue::from_static(value))
    }

    #[test]
    fn test_requires_verify_scope_with_scope() {
        struct NoVerify;
        impl Model for NoVerify {
            fn implements(&self, method: ModelMethod) -> bool {
                method == ModelMethod::GetAccessToken
            }
        }

        let options =
            AuthenticateOptions::from_config(Arc::new(NoVerify), &ServerConfig::default());
        assert!(AuthenticateHandler::new(options.clone()).is_ok());

        let err = AuthenticateHandler::new(options.with_scope("read")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_header_token() {
        let mut response = Response::new();
        let token = handler(Some(valid_token()))
            .handle(&bearer("Bearer foo"), &mut response)
            .await
            .unwrap();
        assert_eq!(token.access_token, "foo");
    }

    #[tokio::test]
    async fn test_no_authentication() {
        let mut response = Response::new();
        let err = handler(Some(valid_token()))
            .handle(&Request::new(Method::GET), &mut response)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnauthorizedRequest);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.get(WWW_AUTHENTICATE),
            Some(r#"Bearer realm="Service""#)
        );
    }

    #[tokio::test]
    async fn test_malformed_header() {
        let mut response = Response::new();
        let err = handler(Some(valid_token()))
            .handle(&bearer("Basic foo"), &mut response)
            .await
            .unwrap_err();

        assert_eq!(err.message(), "Invalid request: malformed authorization header");
        assert_eq!(
            response.get(WWW_AUTHENTICATE),
            Some(r#"Bearer realm="Service",error="invalid_request""#)
        );
    }

    #[tokio::test]
    async fn test_more_than_one_method() {
        let request = bearer("Bearer foo").with_query("access_token", "foo");
        let err = handler(Some(valid_token()))
            .handle(&request, &mut Response::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Invalid request: only one authentication method is allowed"
        );
    }

    #[tokio::test]
    async fn test_query_token_not_allowed_by_default() {
        let request = Request::new(Method::GET).with_query("access_token", "foo");
        let err = handler(Some(valid_token()))
            .handle(&request, &mut Response::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Invalid request: do not send bearer tokens in query URLs"
        );
    }

    #[tokio::test]
    async fn test_body_token() {
        let request = Request::new(Method::GET).with_body("access_token", "foo");
        let err = handler(Some(valid_token()))
            .handle(&request, &mut Response::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let request = Request::new(Method::POST)
            .with_header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .with_body("access_token", "foo");
        let token = handler(Some(valid_token()))
            .handle(&request, &mut Response::new())
            .await
            .unwrap();
        assert_eq!(token.access_token, "foo");
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let mut response = Response::new();
        let err = handler(None)
            .handle(&bearer("Bearer foo"), &mut response)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
        assert_eq!(
            response.get(WWW_AUTHENTICATE),
            Some(r#"Bearer realm="Service",error="invalid_token""#)
        );
    }

    #[tokio::test]
    async fn test_expired_token() {
        let mut token = valid_token();
        token.access_token_expires_at = Some(OffsetDateTime::now_utc() - time::Duration::seconds(1));
        let err = handler(Some(token))
            .handle(&bearer("Bearer foo"), &mut Response::new())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Invalid token: access token has expired");
    }

    #[tokio::test]
    async fn test_token_without_user() {
        let mut token = valid_token();
        token.user = None;
        let err = handler(Some(token))
            .handle(&bearer("Bearer foo"), &mut Response::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServerError);
    }

    #[tokio::test]
    async fn test_scope_headers() {
        let model = Arc::new(AccessTokens {
            token: Some(valid_token()),
            covers: true,
        });
        let handler = AuthenticateHandler::new(
            AuthenticateOptions::from_config(model, &ServerConfig::default()).with_scope("read"),
        )
        .unwrap();

        let mut response = Response::new();
        handler
            .handle(&bearer("Bearer foo"), &mut response)
            .await
            .unwrap();
        assert_eq!(response.get("X-Accepted-OAuth-Scopes"), Some("read"));
        assert_eq!(response.get("X-OAuth-Scopes"), Some("read write"));
    }

    #[tokio::test]
    async fn test_insufficient_scope() {
        let model = Arc::new(AccessTokens {
            token: Some(valid_token()),
            covers: false,
        });
        let handler = AuthenticateHandler::new(
            AuthenticateOptions::from_config(model, &ServerConfig::default()).with_scope("admin"),
        )
        .unwrap();

        let mut response = Response::new();
        let err = handler
            .handle(&bearer("Bearer foo"), &mut response)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientScope);
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert!(response.get("X-OAuth-Scopes").is_none());
    }

    #[tokio::test]
    async fn test_authenticator_impl() {
        let handler = handler(Some(valid_token()));
        let request = bearer("Bearer foo");
        let mut response = Response::new();
        let token = handler
            .authenticate(&request, &mut response)
            .resolve()
            .await
            .unwrap();
        assert!(token.is_some_and(|t| t.user.is_some()));
    }
}
