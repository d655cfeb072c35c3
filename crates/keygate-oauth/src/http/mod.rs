//! Framework-independent request and response wrappers.
//!
//! The handlers read from a [`Request`] and write to a [`Response`]; an
//! adapter for a concrete web framework converts to and from these types.
//! They carry no protocol logic.

pub mod basic_auth;
pub mod request;
pub mod response;

pub use basic_auth::{BasicCredentials, parse_basic_auth};
pub use request::Request;
pub use response::Response;
