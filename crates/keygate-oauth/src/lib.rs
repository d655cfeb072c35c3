//! # keygate-oauth
//!
//! Framework-independent OAuth 2.0 authorization server core (RFC 6749,
//! RFC 6750).
//!
//! This crate provides:
//! - The authorization endpoint (authorization code flow)
//! - The token endpoint with the four RFC 6749 grant types and extension
//!   grants
//! - Bearer token authentication for protected resources
//! - Parameter validation and token generation
//!
//! ## Overview
//!
//! The core owns no storage. Everything persistent lives behind a
//! [`Model`], which answers through [`Outcome`] so that synchronous,
//! future-based and callback-based implementations all work. Handlers read
//! a framework-neutral [`Request`] and write a [`Response`]; an adapter for
//! a concrete web framework converts to and from these.
//!
//! ## Modules
//!
//! - [`config`] - Server defaults (lifetimes, flags)
//! - [`error`] - Protocol error type and model errors
//! - [`adapter`] - Normalization of collaborator results
//! - [`model`] - The persistence contract
//! - [`grant`] - Grant-type engine
//! - [`handler`] - Authenticate, authorize and token endpoints
//! - [`response_type`] - Authorization response types
//! - [`token`] - Token generation and the Bearer response body
//! - [`http`] - Request and response wrappers
//! - [`validator`] - RFC 6749 Appendix A character classes
//! - [`server`] - Facade building handlers from shared defaults

pub mod adapter;
pub mod config;
pub mod error;
pub mod grant;
pub mod handler;
pub mod http;
pub mod model;
pub mod response_type;
pub mod server;
pub mod token;
pub mod types;
pub mod validator;

pub use crate::adapter::{Completion, Outcome};
pub use crate::config::{ConfigError, ServerConfig};
pub use crate::error::{ErrorKind, ModelError, OAuthError};
pub use crate::grant::{ExtensionGrant, Grant, GrantBase, GrantOptions};
pub use crate::handler::{
    AuthenticateHandler, AuthenticateOptions, Authenticator, AuthorizeHandler, AuthorizeOptions,
    TokenHandler, TokenOptions,
};
pub use crate::http::{Request, Response};
pub use crate::model::{Model, ModelMethod};
pub use crate::response_type::{
    CodeResponseType, ResponseType, ResponseTypeFactory, ResponseTypes,
};
pub use crate::server::OAuth2Server;
pub use crate::token::{BearerToken, TokenModel};
pub use crate::types::{
    AuthorizationCode, Client, GrantType, NewAuthorizationCode, NewToken, Token, User,
};

/// Type alias for OAuth results.
pub type OAuthResult<T> = Result<T, OAuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use keygate_oauth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::OAuthResult;
    pub use crate::adapter::{Completion, Outcome};
    pub use crate::config::{ConfigError, ServerConfig};
    pub use crate::error::{ErrorKind, ModelError, OAuthError};
    pub use crate::grant::{ExtensionGrant, GrantBase};
    pub use crate::handler::Authenticator;
    pub use crate::http::{Request, Response};
    pub use crate::model::{Model, ModelMethod};
    pub use crate::server::OAuth2Server;
    pub use crate::types::{
        AuthorizationCode, Client, GrantType, NewAuthorizationCode, NewToken, Token, User,
    };
}
