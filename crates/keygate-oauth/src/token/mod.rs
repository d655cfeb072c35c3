//! Token issuance primitives.
//!
//! - [`generate_random_token`] - opaque random tokens and codes
//! - [`TokenModel`] - projection of a stored token for the wire
//! - [`BearerToken`] - the RFC 6750 Bearer response body

pub mod bearer;
pub mod model;
pub mod util;

pub use bearer::BearerToken;
pub use model::TokenModel;
pub use util::generate_random_token;
