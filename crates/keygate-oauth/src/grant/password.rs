//! Resource owner password credentials grant (RFC 6749 Section 4.3).

use super::{GrantBase, GrantOptions};
use crate::OAuthResult;
use crate::error::OAuthError;
use crate::http::Request;
use crate::model::{self, ModelMethod};
use crate::types::{Client, NewToken, Token, User};
use crate::validator;

/// Exchanges a username and password for an access and refresh token.
#[derive(Debug, Clone)]
pub struct PasswordGrant {
    base: GrantBase,
}

impl PasswordGrant {
    /// Model methods this grant depends on.
    pub const REQUIRED: &'static [ModelMethod] = &[ModelMethod::GetUser, ModelMethod::SaveToken];

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
    /// Returns `InvalidRequest` for missing or malformed credentials and
    /// `InvalidGrant` if the model rejects them.
    pub async fn handle(&self, request: &Request, client: &Client) -> OAuthResult<Token> {
        let scope = self.base.scope(request)?;
        let user = self.user(request).await?;
        self.save_token(&user, client, scope.as_deref()).await
    }

    async fn user(&self, request: &Request) -> OAuthResult<User> {
        let username = credential(request, "username")?;
        let password = credential(request, "password")?;

        self.base
            .model()
            .get_user(username, password)
            .resolve()
            .await?
            .ok_or_else(|| OAuthError::invalid_grant("Invalid grant: user credentials are invalid"))
    }

    async fn save_token(
        &self,
        user: &User,
        client: &Client,
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
            authorization_code: None,
        };

        Ok(base.model().save_token(token, client, user).resolve().await?)
    }
}

/// Reads a required credential. CR and LF are rejected.
fn credential<'a>(request: &'a Request, name: &str) -> OAuthResult<&'a str> {
    let value = request
        .body_param(name)
        .ok_or_else(|| OAuthError::invalid_request(format!("Missing parameter: `{name}`")))?;

    if !validator::uchar(value) {
        return Err(OAuthError::invalid_request(format!(
            "Invalid parameter: `{name}`"
        )));
    }

    Ok(value)
}
