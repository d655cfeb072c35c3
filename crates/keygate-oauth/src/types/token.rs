//! Access and refresh tokens.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use super::{Client, User};

/// A token as stored and returned by the model.
///
/// Attributes the core does not know about are kept in `extra`; they reach
/// the wire only when extended token attributes are enabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Access token value.
    pub access_token: String,

    /// Access token expiration.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub access_token_expires_at: Option<OffsetDateTime>,

    /// Refresh token value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Refresh token expiration.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub refresh_token_expires_at: Option<OffsetDateTime>,

    /// Granted scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Client the token was issued to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<Client>,

    /// User the token was issued for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,

    /// Non-standard attributes.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Token {
    /// Returns `true` if the access token expired before `now`.
    #[must_use]
    pub fn is_access_token_expired_at(&self, now: OffsetDateTime) -> bool {
        self.access_token_expires_at.is_some_and(|exp| exp < now)
    }

    /// Returns `true` if the refresh token expired before `now`.
    #[must_use]
    pub fn is_refresh_token_expired_at(&self, now: OffsetDateTime) -> bool {
        self.refresh_token_expires_at.is_some_and(|exp| exp < now)
    }
}

/// A freshly issued token, handed to `Model::save_token`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewToken {
    /// Access token value.
    pub access_token: String,

    /// Access token expiration.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub access_token_expires_at: Option<OffsetDateTime>,

    /// Refresh token value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Refresh token expiration.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub refresh_token_expires_at: Option<OffsetDateTime>,

    /// Granted scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Code redeemed for this token (authorization-code grant only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<String>,
}

impl NewToken {
    /// Attaches the client and user, producing the stored form.
    ///
    /// The redeemed authorization code, if any, is kept as an extra
    /// attribute.
    #[must_use]
    pub fn into_token(self, client: &Client, user: &User) -> Token {
        let mut extra = Map::new();
        if let Some(code) = self.authorization_code {
            extra.insert("authorizationCode".to_string(), Value::String(code));
        }

        Token {
            access_token: self.access_token,
            access_token_expires_at: self.access_token_expires_at,
            refresh_token: self.refresh_token,
            refresh_token_expires_at: self.refresh_token_expires_at,
            scope: self.scope,
            client: Some(client.clone()),
            user: Some(user.clone()),
            extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_extra_attributes_roundtrip_through_flatten() {
        let token: Token = serde_json::from_value(json!({
            "accessToken": "foo",
            "refreshToken": "bar",
            "foo": "biz"
        }))
        .unwrap();

        assert_eq!(token.access_token, "foo");
        assert_eq!(token.refresh_token.as_deref(), Some("bar"));
        assert_eq!(token.extra.get("foo"), Some(&json!("biz")));
        assert!(!token.extra.contains_key("accessToken"));
    }

    #[test]
    fn test_into_token_keeps_authorization_code() {
        let new_token = NewToken {
            access_token: "foo".to_string(),
            authorization_code: Some("code".to_string()),
            ..NewToken::default()
        };
        let token = new_token.into_token(&Client::new("app"), &User::new(json!({})));

        assert_eq!(token.client.map(|c| c.id), Some("app".to_string()));
        assert_eq!(token.extra.get("authorizationCode"), Some(&json!("code")));
    }
}
