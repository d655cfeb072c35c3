//! Domain types exchanged between the core and the model.
//!
//! ## Domain Types
//!
//! - [`Client`] - OAuth 2.0 client registration
//! - [`User`] - opaque resource owner
//! - [`AuthorizationCode`] / [`NewAuthorizationCode`] - single-use codes
//! - [`Token`] / [`NewToken`] - access and refresh tokens

pub mod authorization_code;
pub mod client;
pub mod token;
pub mod user;

pub use authorization_code::{AuthorizationCode, NewAuthorizationCode};
pub use client::{Client, GrantType};
pub use token::{NewToken, Token};
pub use user::User;
