//! The persistence collaborator.
//!
//! The core owns no state. Clients, users, authorization codes and tokens
//! live behind a [`Model`], which the server calls through a narrow
//! contract. Every method answers with an [`Outcome`], so an implementation
//! may return a ready value, a future, or drive a completion callback.
//!
//! Most methods are optional. A component that depends on a method checks
//! [`Model::implements`] when it is built and fails with `InvalidArgument`
//! if the method is missing. Optional generators and scope hooks are only
//! called when the model reports them as implemented.
//!
//! # Example
//!
//! ```ignore
//! struct Clients(HashMap<String, Client>);
//!
//! impl Model for Clients {
//!     fn implements(&self, method: ModelMethod) -> bool {
//!         matches!(method, ModelMethod::GetClient)
//!     }
//!
//!     fn get_client<'a>(&'a self, id: &'a str, _secret: Option<&'a str>) -> Outcome<'a, Option<Client>> {
//!         Outcome::ready(self.0.get(id).cloned())
//!     }
//! }
//! ```

use std::fmt;

use crate::OAuthResult;
use crate::adapter::Outcome;
use crate::error::OAuthError;
use crate::types::{AuthorizationCode, Client, NewAuthorizationCode, NewToken, Token, User};

/// Methods of the [`Model`] contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelMethod {
    GetClient,
    GetUserFromClient,
    GetUser,
    GetAuthorizationCode,
    SaveAuthorizationCode,
    RevokeAuthorizationCode,
    GetRefreshToken,
    RevokeToken,
    SaveToken,
    GetAccessToken,
    GenerateAccessToken,
    GenerateRefreshToken,
    GenerateAuthorizationCode,
    ValidateScope,
    VerifyScope,
}

impl ModelMethod {
    /// Returns the method name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetClient => "get_client",
            Self::GetUserFromClient => "get_user_from_client",
            Self::GetUser => "get_user",
            Self::GetAuthorizationCode => "get_authorization_code",
            Self::SaveAuthorizationCode => "save_authorization_code",
            Self::RevokeAuthorizationCode => "revoke_authorization_code",
            Self::GetRefreshToken => "get_refresh_token",
            Self::RevokeToken => "revoke_token",
            Self::SaveToken => "save_token",
            Self::GetAccessToken => "get_access_token",
            Self::GenerateAccessToken => "generate_access_token",
            Self::GenerateRefreshToken => "generate_refresh_token",
            Self::GenerateAuthorizationCode => "generate_authorization_code",
            Self::ValidateScope => "validate_scope",
            Self::VerifyScope => "verify_scope",
        }
    }
}

impl fmt::Display for ModelMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage and policy collaborator.
///
/// Only [`implements`](Model::implements) is required. Every other method
/// defaults to reporting itself as unimplemented.
#[allow(unused_variables)]
pub trait Model: Send + Sync {
    /// Returns `true` if this model provides `method`.
    fn implements(&self, method: ModelMethod) -> bool;

    /// Looks up a client. `secret` is `None` when the client did not
    /// authenticate (public clients, authorize endpoint).
    fn get_client<'a>(
        &'a self,
        client_id: &'a str,
        client_secret: Option<&'a str>,
    ) -> Outcome<'a, Option<Client>> {
        Outcome::unimplemented(ModelMethod::GetClient)
    }

    /// Resolves the user a client acts as (client-credentials grant).
    fn get_user_from_client<'a>(&'a self, client: &'a Client) -> Outcome<'a, Option<User>> {
        Outcome::unimplemented(ModelMethod::GetUserFromClient)
    }

    /// Checks resource owner credentials (password grant).
    fn get_user<'a>(&'a self, username: &'a str, password: &'a str) -> Outcome<'a, Option<User>> {
        Outcome::unimplemented(ModelMethod::GetUser)
    }

    /// Looks up an authorization code.
    fn get_authorization_code<'a>(
        &'a self,
        authorization_code: &'a str,
    ) -> Outcome<'a, Option<AuthorizationCode>> {
        Outcome::unimplemented(ModelMethod::GetAuthorizationCode)
    }

    /// Persists a newly issued authorization code.
    fn save_authorization_code<'a>(
        &'a self,
        code: NewAuthorizationCode,
        client: &'a Client,
        user: &'a User,
    ) -> Outcome<'a, AuthorizationCode> {
        Outcome::unimplemented(ModelMethod::SaveAuthorizationCode)
    }

    /// Revokes an authorization code. Returns `false` if it was already gone.
    fn revoke_authorization_code<'a>(&'a self, code: &'a AuthorizationCode) -> Outcome<'a, bool> {
        Outcome::unimplemented(ModelMethod::RevokeAuthorizationCode)
    }

    /// Looks up a token by its refresh token.
    fn get_refresh_token<'a>(&'a self, refresh_token: &'a str) -> Outcome<'a, Option<Token>> {
        Outcome::unimplemented(ModelMethod::GetRefreshToken)
    }

    /// Revokes a refresh token. Returns `false` if it was already gone.
    fn revoke_token<'a>(&'a self, token: &'a Token) -> Outcome<'a, bool> {
        Outcome::unimplemented(ModelMethod::RevokeToken)
    }

    /// Persists a newly issued token and returns the stored form.
    fn save_token<'a>(
        &'a self,
        token: NewToken,
        client: &'a Client,
        user: &'a User,
    ) -> Outcome<'a, Token> {
        Outcome::unimplemented(ModelMethod::SaveToken)
    }

    /// Looks up a token by its access token.
    fn get_access_token<'a>(&'a self, access_token: &'a str) -> Outcome<'a, Option<Token>> {
        Outcome::unimplemented(ModelMethod::GetAccessToken)
    }

    /// Custom access token generator. `None` falls back to a random token.
    fn generate_access_token<'a>(
        &'a self,
        client: &'a Client,
        user: &'a User,
        scope: Option<&'a str>,
    ) -> Outcome<'a, Option<String>> {
        Outcome::unimplemented(ModelMethod::GenerateAccessToken)
    }

    /// Custom refresh token generator. `None` falls back to a random token.
    fn generate_refresh_token<'a>(
        &'a self,
        client: &'a Client,
        user: &'a User,
        scope: Option<&'a str>,
    ) -> Outcome<'a, Option<String>> {
        Outcome::unimplemented(ModelMethod::GenerateRefreshToken)
    }

    /// Custom authorization code generator. `None` falls back to a random
    /// code.
    fn generate_authorization_code<'a>(
        &'a self,
        client: &'a Client,
        user: &'a User,
        scope: Option<&'a str>,
    ) -> Outcome<'a, Option<String>> {
        Outcome::unimplemented(ModelMethod::GenerateAuthorizationCode)
    }

    /// Decides the scope actually granted. `None` or an empty string rejects
    /// the request with `InvalidScope`.
    fn validate_scope<'a>(
        &'a self,
        user: &'a User,
        client: &'a Client,
        scope: Option<&'a str>,
    ) -> Outcome<'a, Option<String>> {
        Outcome::unimplemented(ModelMethod::ValidateScope)
    }

    /// Checks that a token covers `scope`.
    fn verify_scope<'a>(&'a self, token: &'a Token, scope: &'a str) -> Outcome<'a, bool> {
        Outcome::unimplemented(ModelMethod::VerifyScope)
    }
}

/// Fails with `InvalidArgument` unless `model` implements every method in
/// `required`.
///
/// # Errors
///
/// Returns `InvalidArgument` naming the first missing method.
pub fn require(model: &dyn Model, required: &[ModelMethod]) -> OAuthResult<()> {
    match required.iter().find(|m| !model.implements(**m)) {
        Some(method) => Err(OAuthError::unimplemented(*method)),
        None => Ok(()),
    }
}
