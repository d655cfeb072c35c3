//! In-memory model for the Keygate OAuth 2.0 server.
//!
//! This crate provides [`InMemoryModel`], an implementation of the
//! `keygate_oauth::Model` contract backed by `dashmap` for concurrent access.
//! It suits tests, examples and single-process deployments that can afford
//! to lose their grants on restart.
//!
//! # Example
//!
//! ```ignore
//! use keygate_memory::InMemoryModel;
//! use keygate_oauth::{Client, OAuth2Server, ServerConfig, User};
//!
//! let model = InMemoryModel::new();
//! model.add_client(Client::new("app").with_secret("secret").with_grants(["password"]));
//! model.add_user("alice", "wonderland", User::new(serde_json::json!({ "id": 1 })));
//!
//! let server = OAuth2Server::new(Arc::new(model), ServerConfig::default());
//! ```

pub mod model;

pub use model::InMemoryModel;

/// Type alias for a shareable in-memory model.
pub type SharedModel = std::sync::Arc<InMemoryModel>;

/// Creates a new, empty shared in-memory model.
pub fn create_model() -> SharedModel {
    std::sync::Arc::new(InMemoryModel::new())
}
