//! Server configuration.
//!
//! [`ServerConfig`] carries the defaults shared by the three handlers. Each
//! handler's options are derived from it by [`OAuth2Server`](crate::server::OAuth2Server),
//! and callers may still override a value per call.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Authorization server configuration.
///
/// # Example (TOML)
///
/// ```toml
/// authorization_code_lifetime = "5m"
/// access_token_lifetime = "1h"
/// refresh_token_lifetime = "14d"
/// always_issue_new_refresh_token = true
///
/// [require_client_authentication]
/// password = false
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Lifetime of authorization codes issued at the authorize endpoint.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Default access token lifetime. A client's own lifetime wins.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Default refresh token lifetime. A client's own lifetime wins.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Accept authorize requests without a `state` parameter.
    pub allow_empty_state: bool,

    /// Emit non-standard token attributes in token responses.
    pub allow_extended_token_attributes: bool,

    /// Rotate refresh tokens on use.
    pub always_issue_new_refresh_token: bool,

    /// Per grant type: whether the client must present its secret.
    /// Grant types not listed require authentication.
    pub require_client_authentication: HashMap<String, bool>,

    /// Accept bearer tokens in the `access_token` query parameter.
    pub allow_bearer_tokens_in_query_string: bool,

    /// Send `X-Accepted-OAuth-Scopes` when a scope is required.
    pub add_accepted_scopes_header: bool,

    /// Send `X-OAuth-Scopes` when a scope is required.
    pub add_authorized_scopes_header: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: Duration::from_secs(5 * 60),
            access_token_lifetime: Duration::from_secs(60 * 60),
            refresh_token_lifetime: Duration::from_secs(14 * 24 * 60 * 60),
            allow_empty_state: false,
            allow_extended_token_attributes: false,
            always_issue_new_refresh_token: true,
            require_client_authentication: HashMap::new(),
            allow_bearer_tokens_in_query_string: false,
            add_accepted_scopes_header: true,
            add_authorized_scopes_header: true,
        }
    }
}

impl ServerConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and
    /// `ConfigError::InvalidValue` if validation fails.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any lifetime is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lifetimes = [
            ("authorization_code_lifetime", self.authorization_code_lifetime),
            ("access_token_lifetime", self.access_token_lifetime),
            ("refresh_token_lifetime", self.refresh_token_lifetime),
        ];

        for (name, lifetime) in lifetimes {
            if lifetime.is_zero() {
                return Err(ConfigError::InvalidValue(format!("{name} must be > 0")));
            }
        }

        Ok(())
    }

    /// Returns `true` if clients using `grant_type` must authenticate.
    #[must_use]
    pub fn requires_client_authentication(&self, grant_type: &str) -> bool {
        self.require_client_authentication
            .get(grant_type)
            .copied()
            .unwrap_or(true)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// The configuration document could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
