//! Authorization code grant (RFC 6749 Section 4.1.3).

use time::OffsetDateTime;
use tracing::debug;

use super::{GrantBase, GrantOptions};
use crate::OAuthResult;
use crate::error::OAuthError;
use crate::http::Request;
use crate::model::{self, ModelMethod};
use crate::types::{AuthorizationCode, Client, NewToken, Token, User};
use crate::validator;

/// Exchanges a single-use authorization code for an access and refresh
/// token.
#[derive(Debug, Clone)]
pub struct AuthorizationCodeGrant {
    base: GrantBase,
}

impl AuthorizationCodeGrant {
    /// Model methods this grant depends on.
    pub const REQUIRED: &'static [ModelMethod] = &[
        ModelMethod::GetAuthorizationCode,
        ModelMethod::RevokeAuthorizationCode,
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
    /// Returns `InvalidRequest` for a missing or malformed `code` or
    /// `redirect_uri`, `InvalidGrant` if the code is unknown, expired,
    /// already used or bound to another client, and `ServerError` if the
    /// model returns an incomplete code.
    pub async fn handle(&self, request: &Request, client: &Client) -> OAuthResult<Token> {
        let code = self.authorization_code(request, client).await?;
        validate_redirect_uri(request, &code)?;
        self.revoke_authorization_code(&code).await?;

        let user = code.user.as_ref().ok_or_else(missing_user)?;
        self.save_token(
            user,
            client,
            &code.authorization_code,
            code.scope.as_deref(),
        )
        .await
    }

    async fn authorization_code(
        &self,
        request: &Request,
        client: &Client,
    ) -> OAuthResult<AuthorizationCode> {
        let value = request
            .body_param("code")
            .ok_or_else(|| OAuthError::invalid_request("Missing parameter: `code`"))?;

        if !validator::vschar(value) {
            return Err(OAuthError::invalid_request("Invalid parameter: `code`"));
        }

        let code = self
            .base
            .model()
            .get_authorization_code(value)
            .resolve()
            .await?
            .ok_or_else(invalid_code)?;

        let code_client = code.client.as_ref().ok_or_else(|| {
            OAuthError::server_error(
                "Server error: `get_authorization_code()` did not return a `client` object",
            )
        })?;

        if code.user.is_none() {
            return Err(missing_user());
        }

        if code_client.id != client.id {
            debug!(client_id = %client.id, "Authorization code was issued to another client");
            return Err(invalid_code());
        }

        let Some(expires_at) = code.expires_at else {
            return Err(OAuthError::server_error(
                "Server error: `expires_at` must be set",
            ));
        };

        if expires_at < OffsetDateTime::now_utc() {
            return Err(OAuthError::invalid_grant(
                "Invalid grant: authorization code has expired",
            ));
        }

        if code
            .redirect_uri
            .as_deref()
            .is_some_and(|uri| !uri.is_empty() && !validator::uri(uri))
        {
            return Err(OAuthError::invalid_grant(
                "Invalid grant: `redirect_uri` is not a valid URI",
            ));
        }

        Ok(code)
    }

    async fn revoke_authorization_code(&self, code: &AuthorizationCode) -> OAuthResult<()> {
        let revoked = self
            .base
            .model()
            .revoke_authorization_code(code)
            .resolve()
            .await?;

        if !revoked {
            return Err(invalid_code());
        }

        Ok(())
    }

    async fn save_token(
        &self,
        user: &User,
        client: &Client,
        authorization_code: &str,
        scope: Option<&str>,
    ) -> OAuthResult<Token> {
        let base = &self.base;
        let (scope, access_token, refresh_token, access_token_expires_at, refresh_token_expires_at) =
            tokio::try_join!(
                base.validate_scope(user, client, scope),
                base.generate_access_token(client, user, scope),
                base.generate_refresh_token(client, user, scope),
                async { base.access_token_expires_at() },
                async { base.refresh_token_expires_at() },
            )?;

        let token = NewToken {
            access_token,
            access_token_expires_at: Some(access_token_expires_at),
            refresh_token: Some(refresh_token),
            refresh_token_expires_at,
            scope,
            authorization_code: Some(authorization_code.to_string()),
        };

        Ok(base.model().save_token(token, client, user).resolve().await?)
    }
}

/// The code was bound to a redirect URI at the authorize endpoint; the token
/// request must repeat it exactly.
fn validate_redirect_uri(request: &Request, code: &AuthorizationCode) -> OAuthResult<()> {
    let Some(expected) = code.redirect_uri.as_deref().filter(|u| !u.is_empty()) else {
        return Ok(());
    };

    let redirect_uri = request.param("redirect_uri").unwrap_or_default();
    if !validator::uri(redirect_uri) {
        return Err(OAuthError::invalid_request(
            "Invalid request: `redirect_uri` is not a valid URI",
        ));
    }

    if redirect_uri != expected {
        return Err(OAuthError::invalid_request(
            "Invalid request: `redirect_uri` is invalid",
        ));
    }

    Ok(())
}

fn invalid_code() -> OAuthError {
    OAuthError::invalid_grant("Invalid grant: authorization code is invalid")
}

fn missing_user() -> OAuthError {
    OAuthError::server_error(
        "Server error: `get_authorization_code()` did not return a `user` object",
    )
}
