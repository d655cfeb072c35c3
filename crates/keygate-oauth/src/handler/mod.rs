//! Endpoint handlers.
//!
//! - [`AuthenticateHandler`] - bearer token validation for protected resources
//! - [`AuthorizeHandler`] - the authorization endpoint
//! - [`TokenHandler`] - the token endpoint

pub mod authenticate;
pub mod authorize;
pub mod token;

pub use authenticate::{AuthenticateHandler, AuthenticateOptions, Authenticator};
pub use authorize::{AuthorizeHandler, AuthorizeOptions};
pub use token::{TokenHandler, TokenOptions};
