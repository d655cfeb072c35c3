//! Authorization codes.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Client, User};

/// A stored authorization code, as returned by the model.
///
/// Codes are single use: the authorization-code grant revokes the code
/// before it issues a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCode {
    /// The code value.
    pub authorization_code: String,

    /// Client the code was issued to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<Client>,

    /// User who authorized the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,

    /// Granted scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Redirect URI the code was bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// Expiration time. A stored code without one is a model error.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expires_at: Option<OffsetDateTime>,
}

impl AuthorizationCode {
    /// Returns `true` if the code expired before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|exp| exp < now)
    }
}

/// A freshly generated authorization code, handed to
/// `Model::save_authorization_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuthorizationCode {
    /// The code value.
    pub authorization_code: String,

    /// Expiration time.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Redirect URI the code is bound to.
    pub redirect_uri: String,

    /// Granted scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl NewAuthorizationCode {
    /// Attaches the client and user, producing the stored form.
    #[must_use]
    pub fn into_authorization_code(self, client: &Client, user: &User) -> AuthorizationCode {
        AuthorizationCode {
            authorization_code: self.authorization_code,
            client: Some(client.clone()),
            user: Some(user.clone()),
            scope: self.scope,
            redirect_uri: Some(self.redirect_uri),
            expires_at: Some(self.expires_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    #[test]
    fn test_into_authorization_code() {
        let expires_at = OffsetDateTime::now_utc() + Duration::minutes(5);
        let new_code = NewAuthorizationCode {
            authorization_code: "abc".to_string(),
            expires_at,
            redirect_uri: "http://example.com/cb".to_string(),
            scope: Some("read".to_string()),
        };
        let client = Client::new("app");
        let user = User::new(serde_json::json!({ "id": 1 }));

        let code = new_code.into_authorization_code(&client, &user);

        assert_eq!(code.authorization_code, "abc");
        assert_eq!(code.client.as_ref().map(|c| c.id.as_str()), Some("app"));
        assert_eq!(code.redirect_uri.as_deref(), Some("http://example.com/cb"));
        assert_eq!(code.expires_at, Some(expires_at));
        assert!(!code.is_expired_at(OffsetDateTime::now_utc()));
    }

    #[test]
    fn test_is_expired_at() {
        let now = OffsetDateTime::now_utc();
        let code = AuthorizationCode {
            authorization_code: "abc".to_string(),
            client: None,
            user: None,
            scope: None,
            redirect_uri: None,
            expires_at: Some(now - Duration::seconds(1)),
        };
        assert!(code.is_expired_at(now));
    }
}
