//! OAuth 2.0 client registration as the model hands it to the core.

use serde::{Deserialize, Serialize};

// =============================================================================
// Grant Type
// =============================================================================

/// Built-in OAuth 2.0 grant types.
///
/// Extension grants are identified by their raw `grant_type` string and have
/// no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow.
    AuthorizationCode,
    /// Client Credentials flow.
    ClientCredentials,
    /// Resource Owner Password Credentials flow.
    Password,
    /// Refresh Token flow.
    RefreshToken,
}

impl GrantType {
    /// All built-in grant types.
    pub const ALL: [GrantType; 4] = [
        Self::AuthorizationCode,
        Self::ClientCredentials,
        Self::Password,
        Self::RefreshToken,
    ];

    /// Returns the OAuth 2.0 grant_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client
// =============================================================================

/// OAuth 2.0 client.
///
/// Owned by the model; the core only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Client identifier.
    pub id: String,

    /// Client secret, if the model exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Grant types this client may use. `None` means the registration is
    /// incomplete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grants: Option<Vec<String>>,

    /// Registered redirect URIs. The first one is the default target.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Access token lifetime override in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_lifetime: Option<u64>,

    /// Refresh token lifetime override in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_lifetime: Option<u64>,
}

impl Client {
    /// Creates a client with the given identifier and nothing else.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the allowed grant types.
    #[must_use]
    pub fn with_grants<I, S>(mut self, grants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grants = Some(grants.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the registered redirect URIs.
    #[must_use]
    pub fn with_redirect_uris<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.redirect_uris = uris.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Returns `true` if `grant_type` is listed in the client's grants.
    #[must_use]
    pub fn allows_grant(&self, grant_type: &str) -> bool {
        self.grants
            .as_ref()
            .is_some_and(|grants| grants.iter().any(|g| g == grant_type))
    }

    /// Returns `true` if `uri` is one of the registered redirect URIs.
    #[must_use]
    pub fn has_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|u| u == uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_grant() {
        let client = Client::new("app").with_grants(["authorization_code", "refresh_token"]);
        assert!(client.allows_grant("authorization_code"));
        assert!(!client.allows_grant("password"));

        let incomplete = Client::new("app");
        assert!(!incomplete.allows_grant("authorization_code"));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let client: Client = serde_json::from_value(serde_json::json!({
            "id": "app",
            "grants": ["password"],
            "redirectUris": ["http://example.com/cb"],
            "accessTokenLifetime": 120
        }))
        .unwrap();

        assert_eq!(client.id, "app");
        assert!(client.has_redirect_uri("http://example.com/cb"));
        assert_eq!(client.access_token_lifetime, Some(120));
        assert!(client.refresh_token_lifetime.is_none());
    }

    #[test]
    fn test_grant_type_as_str() {
        let names: Vec<_> = GrantType::ALL.iter().map(GrantType::as_str).collect();
        assert_eq!(
            names,
            ["authorization_code", "client_credentials", "password", "refresh_token"]
        );
    }
}
