//! Grant-type engine.
//!
//! Every grant type turns a token request into a saved [`Token`]. They share
//! [`GrantBase`], which owns the lifetimes, the model, token generation and
//! scope validation. The built-in variants are:
//!
//! - [`AuthorizationCodeGrant`] - RFC 6749 Section 4.1
//! - [`ClientCredentialsGrant`] - RFC 6749 Section 4.4
//! - [`PasswordGrant`] - RFC 6749 Section 4.3
//! - [`RefreshTokenGrant`] - RFC 6749 Section 6
//!
//! Additional grant types (RFC 6749 Section 4.5) implement [`ExtensionGrant`]
//! and are registered under their `grant_type` identifier. The token handler
//! dispatches both kinds through the closed [`Grant`] enum.

pub mod authorization_code;
pub mod client_credentials;
pub mod password;
pub mod refresh_token;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::OAuthResult;
use crate::error::OAuthError;
use crate::http::Request;
use crate::model::{Model, ModelMethod};
use crate::token::generate_random_token;
use crate::types::{Client, GrantType, Token, User};
use crate::validator;

pub use authorization_code::AuthorizationCodeGrant;
pub use client_credentials::ClientCredentialsGrant;
pub use password::PasswordGrant;
pub use refresh_token::RefreshTokenGrant;

// =============================================================================
// Shared contract
// =============================================================================

/// Options every grant type is built from.
#[derive(Clone)]
pub struct GrantOptions {
    /// Access token lifetime. Required and non-zero.
    pub access_token_lifetime: Option<Duration>,
    /// Refresh token lifetime.
    pub refresh_token_lifetime: Option<Duration>,
    /// Persistence collaborator.
    pub model: Arc<dyn Model>,
    /// `Some(false)` keeps the original refresh token on refresh.
    pub always_issue_new_refresh_token: Option<bool>,
}

impl GrantOptions {
    /// Options with only an access token lifetime.
    #[must_use]
    pub fn new(model: Arc<dyn Model>, access_token_lifetime: Duration) -> Self {
        Self {
            access_token_lifetime: Some(access_token_lifetime),
            refresh_token_lifetime: None,
            model,
            always_issue_new_refresh_token: None,
        }
    }

    /// Sets the refresh token lifetime.
    #[must_use]
    pub fn with_refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_token_lifetime = Some(lifetime);
        self
    }

    /// Sets refresh token rotation.
    #[must_use]
    pub fn with_always_issue_new_refresh_token(mut self, value: bool) -> Self {
        self.always_issue_new_refresh_token = Some(value);
        self
    }
}

impl fmt::Debug for GrantOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrantOptions")
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .field(
                "always_issue_new_refresh_token",
                &self.always_issue_new_refresh_token,
            )
            .finish_non_exhaustive()
    }
}

/// Behaviour shared by all grant types.
#[derive(Clone)]
pub struct GrantBase {
    access_token_lifetime: Duration,
    refresh_token_lifetime: Option<Duration>,
    model: Arc<dyn Model>,
    always_issue_new_refresh_token: Option<bool>,
}

impl GrantBase {
    /// Validates `options`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the access token lifetime is missing or
    /// zero.
    pub fn new(options: GrantOptions) -> OAuthResult<Self> {
        let access_token_lifetime = options
            .access_token_lifetime
            .filter(|lifetime| !lifetime.is_zero())
            .ok_or_else(|| {
                OAuthError::invalid_argument("Missing parameter: `accessTokenLifetime`")
            })?;

        Ok(Self {
            access_token_lifetime,
            refresh_token_lifetime: options.refresh_token_lifetime,
            model: options.model,
            always_issue_new_refresh_token: options.always_issue_new_refresh_token,
        })
    }

    /// The persistence collaborator.
    #[must_use]
    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }

    #[must_use]
    pub fn access_token_lifetime(&self) -> Duration {
        self.access_token_lifetime
    }

    #[must_use]
    pub fn refresh_token_lifetime(&self) -> Option<Duration> {
        self.refresh_token_lifetime
    }

    #[must_use]
    pub fn always_issue_new_refresh_token(&self) -> Option<bool> {
        self.always_issue_new_refresh_token
    }

    /// Generates an access token, through the model if it has a generator.
    ///
    /// # Errors
    ///
    /// Propagates model and random source failures.
    pub async fn generate_access_token(
        &self,
        client: &Client,
        user: &User,
        scope: Option<&str>,
    ) -> OAuthResult<String> {
        if self.model.implements(ModelMethod::GenerateAccessToken) {
            let generated = self
                .model
                .generate_access_token(client, user, scope)
                .resolve()
                .await?;
            if let Some(token) = generated.filter(|t| !t.is_empty()) {
                return Ok(token);
            }
        }

        generate_random_token()
    }

    /// Generates a refresh token, through the model if it has a generator.
    ///
    /// # Errors
    ///
    /// Propagates model and random source failures.
    pub async fn generate_refresh_token(
        &self,
        client: &Client,
        user: &User,
        scope: Option<&str>,
    ) -> OAuthResult<String> {
        if self.model.implements(ModelMethod::GenerateRefreshToken) {
            let generated = self
                .model
                .generate_refresh_token(client, user, scope)
                .resolve()
                .await?;
            if let Some(token) = generated.filter(|t| !t.is_empty()) {
                return Ok(token);
            }
        }

        generate_random_token()
    }

    /// Now plus the access token lifetime.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if the expiry falls outside the date range.
    pub fn access_token_expires_at(&self) -> OAuthResult<OffsetDateTime> {
        expires_after(self.access_token_lifetime)
    }

    /// Now plus the refresh token lifetime, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if the expiry falls outside the date range.
    pub fn refresh_token_expires_at(&self) -> OAuthResult<Option<OffsetDateTime>> {
        self.refresh_token_lifetime.map(expires_after).transpose()
    }

    /// Reads the requested scope from the body.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if a scope is present but not `nqschar`.
    pub fn scope(&self, request: &Request) -> OAuthResult<Option<String>> {
        match request.body.get("scope") {
            None => Ok(None),
            Some(scope) if validator::nqschar(scope) => Ok(Some(scope.clone())),
            Some(_) => Err(OAuthError::invalid_argument("Invalid parameter: `scope`")),
        }
    }

    /// Lets the model decide the granted scope. Without a model validator
    /// the requested scope passes through.
    ///
    /// # Errors
    ///
    /// Returns `InvalidScope` if the model rejects the scope.
    pub async fn validate_scope(
        &self,
        user: &User,
        client: &Client,
        scope: Option<&str>,
    ) -> OAuthResult<Option<String>> {
        validate_scope(self.model(), user, client, scope).await
    }
}

impl fmt::Debug for GrantBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrantBase")
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .field(
                "always_issue_new_refresh_token",
                &self.always_issue_new_refresh_token,
            )
            .finish_non_exhaustive()
    }
}

/// Scope validation shared by the grants and the authorize handler.
pub(crate) async fn validate_scope(
    model: &dyn Model,
    user: &User,
    client: &Client,
    scope: Option<&str>,
) -> OAuthResult<Option<String>> {
    if !model.implements(ModelMethod::ValidateScope) {
        return Ok(scope.map(str::to_string));
    }

    let validated = model.validate_scope(user, client, scope).resolve().await?;
    match validated.filter(|s| !s.is_empty()) {
        Some(scope) => Ok(Some(scope)),
        None => Err(OAuthError::invalid_scope(
            "Invalid scope: Requested scope is invalid",
        )),
    }
}

/// Now plus `lifetime`, shared with the authorize handler's code expiry.
pub(crate) fn expires_after(lifetime: Duration) -> OAuthResult<OffsetDateTime> {
    time::Duration::try_from(lifetime)
        .ok()
        .and_then(|lifetime| OffsetDateTime::now_utc().checked_add(lifetime))
        .ok_or_else(|| OAuthError::server_error("Server error: lifetime is out of range"))
}

// =============================================================================
// Extension grants
// =============================================================================

/// A grant type beyond the four built-ins, registered under a `grant_type`
/// URI or name.
///
/// # Example
///
/// ```ignore
/// struct SamlBearer;
///
/// #[async_trait]
/// impl ExtensionGrant for SamlBearer {
///     async fn handle(&self, base: &GrantBase, request: &Request, client: &Client) -> OAuthResult<Token> {
///         let user = verify_assertion(request)?;
///         let access_token = base.generate_access_token(client, &user, None).await?;
///         // ...
///     }
/// }
/// ```
#[async_trait]
pub trait ExtensionGrant: Send + Sync {
    /// Handles a token request for this grant type.
    async fn handle(&self, base: &GrantBase, request: &Request, client: &Client)
    -> OAuthResult<Token>;
}

// =============================================================================
// Dispatch
// =============================================================================

/// A grant type the token endpoint can dispatch to.
#[derive(Clone)]
pub enum Grant {
    AuthorizationCode,
    ClientCredentials,
    Password,
    RefreshToken,
    Extension(Arc<dyn ExtensionGrant>),
}

impl Grant {
    /// Handles a token request with this grant type.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the options are invalid or the model
    /// lacks a method the grant needs, and any protocol error the grant
    /// raises.
    pub async fn handle(
        &self,
        options: GrantOptions,
        request: &Request,
        client: &Client,
    ) -> OAuthResult<Token> {
        match self {
            Self::AuthorizationCode => {
                AuthorizationCodeGrant::new(options)?
                    .handle(request, client)
                    .await
            }
            Self::ClientCredentials => {
                ClientCredentialsGrant::new(options)?
                    .handle(request, client)
                    .await
            }
            Self::Password => PasswordGrant::new(options)?.handle(request, client).await,
            Self::RefreshToken => {
                RefreshTokenGrant::new(options)?
                    .handle(request, client)
                    .await
            }
            Self::Extension(grant) => {
                let base = GrantBase::new(options)?;
                grant.handle(&base, request, client).await
            }
        }
    }
}

impl From<GrantType> for Grant {
    fn from(grant_type: GrantType) -> Self {
        match grant_type {
            GrantType::AuthorizationCode => Self::AuthorizationCode,
            GrantType::ClientCredentials => Self::ClientCredentials,
            GrantType::Password => Self::Password,
            GrantType::RefreshToken => Self::RefreshToken,
        }
    }
}

impl fmt::Debug for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthorizationCode => f.write_str("AuthorizationCode"),
            Self::ClientCredentials => f.write_str("ClientCredentials"),
            Self::Password => f.write_str("Password"),
            Self::RefreshToken => f.write_str("RefreshToken"),
            Self::Extension(_) => f.write_str("Extension"),
        }
    }
}

/// Registry of the grant types the token endpoint accepts, keyed by
/// `grant_type`.
pub type GrantRegistry = HashMap<String, Grant>;

/// Registry holding the four built-in grant types.
#[must_use]
pub fn builtin_grants() -> GrantRegistry {
    GrantType::ALL
        .into_iter()
        .map(|grant_type| (grant_type.as_str().to_string(), Grant::from(grant_type)))
        .collect()
}
