//! Refresh token grant (RFC 6749 Section 6).

use time::OffsetDateTime;
use tracing::debug;

use super::{GrantBase, GrantOptions};
use crate::OAuthResult;
use crate::error::OAuthError;
use crate::http::Request;
use crate::model::{self, ModelMethod};
use crate::types::{Client, NewToken, Token, User};
use crate::validator;

/// Exchanges a refresh token for a new access token.
///
/// The old token is revoked. A new refresh token is issued unless
/// `always_issue_new_refresh_token` is explicitly `false`, in which case the
/// original refresh token and its expiry carry over.
#[derive(Debug, Clone)]
pub struct RefreshTokenGrant {
    base: GrantBase,
}

impl RefreshTokenGrant {
    /// Model methods this grant depends on.
    pub const REQUIRED: &'static [ModelMethod] = &[
        ModelMethod::GetRefreshToken,
        ModelMethod::RevokeToken,
        ModelMethod::SaveToken,
    ];

    /// Creates the grant.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for invalid options or a model missing a
    /// required method.
    pub fn new(options: GrantOptions) -> OAuthResult<Self> {
        let base = GrantBase::new(options)?;
        model::require(base.model(), Self::REQUIRED)?;
        Ok(Self { base })
    }

    /// Handles the token request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for a missing or malformed `refresh_token`,
    /// `InvalidGrant` if the token is unknown, expired, revoked or issued to
    /// another client, and `ServerError` if the model returns an incomplete
    /// token.
    pub async fn handle(&self, request: &Request, client: &Client) -> OAuthResult<Token> {
        let token = self.refresh_token(request, client).await?;
        self.revoke_token(&token).await?;

        let user = token.user.as_ref().ok_or_else(missing_user)?;
        self.save_token(&token, user, client).await
    }

    async fn refresh_token(&self, request: &Request, client: &Client) -> OAuthResult<Token> {
        let value = request
            .body_param("refresh_token")
            .ok_or_else(|| OAuthError::invalid_request("Missing parameter: `refresh_token`"))?;

        if !validator::vschar(value) {
            return Err(OAuthError::invalid_request(
                "Invalid parameter: `refresh_token`",
            ));
        }

        let token = self
            .base
            .model()
            .get_refresh_token(value)
            .resolve()
            .await?
            .ok_or_else(invalid_token)?;

        let token_client = token.client.as_ref().ok_or_else(|| {
            OAuthError::server_error(
                "Server error: `get_refresh_token()` did not return a `client` object",
            )
        })?;

        if token.user.is_none() {
            return Err(missing_user());
        }

        if token_client.id != client.id {
            debug!(client_id = %client.id, "Refresh token was issued to another client");
            return Err(OAuthError::invalid_grant(
                "Invalid grant: refresh token was issued to another client",
            ));
        }

        if token.is_refresh_token_expired_at(OffsetDateTime::now_utc()) {
            return Err(OAuthError::invalid_grant(
                "Invalid grant: refresh token has expired",
            ));
        }

        Ok(token)
    }

    async fn revoke_token(&self, token: &Token) -> OAuthResult<()> {
        let revoked = self.base.model().revoke_token(token).resolve().await?;
        if !revoked {
            return Err(invalid_token());
        }

        Ok(())
    }

    async fn save_token(&self, previous: &Token, user: &User, client: &Client) -> OAuthResult<Token> {
        let base = &self.base;
        let scope = previous.scope.as_deref();

        let token = if base.always_issue_new_refresh_token() == Some(false) {
            let (access_token, access_token_expires_at) = tokio::try_join!(
                base.generate_access_token(client, user, scope),
                async { base.access_token_expires_at() },
            )?;

            NewToken {
                access_token,
                access_token_expires_at: Some(access_token_expires_at),
                refresh_token: previous.refresh_token.clone(),
                refresh_token_expires_at: previous.refresh_token_expires_at,
                scope: previous.scope.clone(),
                authorization_code: None,
            }
        } else {
            let (access_token, refresh_token, access_token_expires_at, refresh_token_expires_at) =
                tokio::try_join!(
                    base.generate_access_token(client, user, scope),
                    base.generate_refresh_token(client, user, scope),
                    async { base.access_token_expires_at() },
                    async { base.refresh_token_expires_at() },
                )?;

            NewToken {
                access_token,
                access_token_expires_at: Some(access_token_expires_at),
                refresh_token: Some(refresh_token),
                refresh_token_expires_at,
                scope: previous.scope.clone(),
                authorization_code: None,
            }
        };

        Ok(base.model().save_token(token, client, user).resolve().await?)
    }
}

fn invalid_token() -> OAuthError {
    OAuthError::invalid_grant("Invalid grant: refresh token is invalid")
}

fn missing_user() -> OAuthError {
    OAuthError::server_error("Server error: `get_refresh_token()` did not return a `user` object")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::adapter::Outcome;
    use crate::error::ErrorKind;
    use crate::model::Model;

    struct Tokens {
        stored: Option<Token>,
        revoked: AtomicBool,
    }

    impl Tokens {
        fn new(stored: Option<Token>) -> Arc<Self> {
            Arc::new(Self {
                stored,
                revoked: AtomicBool::new(false),
            })
        }
    }

    impl Model for Tokens {
        fn implements(&self, method: ModelMethod) -> bool {
            RefreshTokenGrant::REQUIRED.contains(&method)
        }

        fn get_refresh_token<'a>(&'a self, _refresh_token: &'a str) -> Outcome<'a, Option<Token>> {
            Outcome::ready(self.stored.clone())
        }

        fn revoke_token<'a>(&'a self, _token: &'a Token) -> Outcome<'a, bool> {
            Outcome::ready(!self.revoked.swap(true, Ordering::SeqCst))
        }

        fn save_token<'a>(
            &'a self,
            token: NewToken,
            client: &'a Client,
            user: &'a User,
        ) -> Outcome<'a, Token> {
            Outcome::ready(token.into_token(client, user))
        }
    }

    fn stored(expires_in: time::Duration) -> Token {
        Token {
            access_token: "old-access".to_string(),
            refresh_token: Some("old-refresh".to_string()),
            refresh_token_expires_at: Some(OffsetDateTime::now_utc() + expires_in),
            scope: Some("read".to_string()),
            client: Some(Client::new("app")),
            user: Some(User::new(json!({ "id": 1 }))),
            ..Token::default()
        }
    }

    fn options(model: Arc<Tokens>) -> GrantOptions {
        GrantOptions::new(model, Duration::from_secs(120))
            .with_refresh_token_lifetime(Duration::from_secs(3600))
    }

    fn request() -> Request {
        Request::default().with_body("refresh_token", "old-refresh")
    }

    #[tokio::test]
    async fn test_rotates_refresh_token() {
        let model = Tokens::new(Some(stored(time::Duration::hours(1))));
        let token = RefreshTokenGrant::new(options(model.clone()))
            .unwrap()
            .handle(&request(), &Client::new("app"))
            .await
            .unwrap();

        assert_ne!(token.access_token, "old-access");
        assert_ne!(token.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(token.scope.as_deref(), Some("read"));
        assert!(model.revoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_keeps_refresh_token_when_rotation_disabled() {
        let previous = stored(time::Duration::hours(1));
        let model = Tokens::new(Some(previous.clone()));
        let token = RefreshTokenGrant::new(
            options(model.clone()).with_always_issue_new_refresh_token(false),
        )
        .unwrap()
        .handle(&request(), &Client::new("app"))
        .await
        .unwrap();

        assert_ne!(token.access_token, "old-access");
        assert_eq!(token.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(
            token.refresh_token_expires_at,
            previous.refresh_token_expires_at
        );
        assert!(model.revoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_expired_refresh_token() {
        let model = Tokens::new(Some(stored(time::Duration::seconds(-1))));
        let err = RefreshTokenGrant::new(options(model.clone()))
            .unwrap()
            .handle(&request(), &Client::new("app"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidGrant);
        assert_eq!(err.message(), "Invalid grant: refresh token has expired");
        assert!(!model.revoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_unknown_refresh_token() {
        let err = RefreshTokenGrant::new(options(Tokens::new(None)))
            .unwrap()
            .handle(&request(), &Client::new("app"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidGrant);
        assert_eq!(err.message(), "Invalid grant: refresh token is invalid");
    }

    #[tokio::test]
    async fn test_refresh_token_for_another_client() {
        let model = Tokens::new(Some(stored(time::Duration::hours(1))));
        let err = RefreshTokenGrant::new(options(model))
            .unwrap()
            .handle(&request(), &Client::new("other"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidGrant);
    }

    #[tokio::test]
    async fn test_missing_user() {
        let mut token = stored(time::Duration::hours(1));
        token.user = None;
        let err = RefreshTokenGrant::new(options(Tokens::new(Some(token))))
            .unwrap()
            .handle(&request(), &Client::new("app"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServerError);
    }

    #[tokio::test]
    async fn test_second_use_is_rejected() {
        let model = Tokens::new(Some(stored(time::Duration::hours(1))));
        let grant = RefreshTokenGrant::new(options(model)).unwrap();

        assert!(grant.handle(&request(), &Client::new("app")).await.is_ok());
        let err = grant
            .handle(&request(), &Client::new("app"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidGrant);
    }
}
