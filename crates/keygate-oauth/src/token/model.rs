//! Wire projection of a stored token.

use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::OAuthResult;
use crate::error::OAuthError;
use crate::types::{Client, Token, User};

/// The attributes of a saved [`Token`] that the token endpoint may expose.
///
/// Standard attributes are always kept. Anything else the model attached
/// (`Token::extra`) is carried in `custom_attributes` only when extended
/// token attributes are enabled.
#[derive(Debug, Clone)]
pub struct TokenModel {
    pub access_token: String,
    pub access_token_expires_at: Option<OffsetDateTime>,
    pub refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<OffsetDateTime>,
    pub scope: Option<String>,
    pub client: Client,
    pub user: User,
    /// Remaining access token lifetime in whole seconds, rounded down.
    pub access_token_lifetime: Option<i64>,
    pub custom_attributes: Option<Map<String, Value>>,
}

impl TokenModel {
    /// Projects `token`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the access token is empty or the client
    /// or user is missing.
    pub fn new(token: &Token, allow_extended_token_attributes: bool) -> OAuthResult<Self> {
        if token.access_token.is_empty() {
            return Err(OAuthError::invalid_argument(
                "Missing parameter: `accessToken`",
            ));
        }

        let client = token
            .client
            .clone()
            .ok_or_else(|| OAuthError::invalid_argument("Missing parameter: `client`"))?;

        let user = token
            .user
            .clone()
            .ok_or_else(|| OAuthError::invalid_argument("Missing parameter: `user`"))?;

        let access_token_lifetime = token.access_token_expires_at.map(|expires_at| {
            (expires_at - OffsetDateTime::now_utc())
                .as_seconds_f64()
                .floor() as i64
        });

        let custom_attributes = allow_extended_token_attributes.then(|| token.extra.clone());

        Ok(Self {
            access_token: token.access_token.clone(),
            access_token_expires_at: token.access_token_expires_at,
            refresh_token: token.refresh_token.clone(),
            refresh_token_expires_at: token.refresh_token_expires_at,
            scope: token.scope.clone(),
            client,
            user,
            access_token_lifetime,
            custom_attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::Duration;

    use super::*;
    use crate::error::ErrorKind;

    fn token() -> Token {
        Token {
            access_token: "foo".to_string(),
            client: Some(Client::new("app")),
            user: Some(User::new(json!({}))),
            ..Token::default()
        }
    }

    #[test]
    fn test_missing_fields() {
        let mut missing_client = token();
        missing_client.client = None;
        let err = TokenModel::new(&missing_client, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.message(), "Missing parameter: `client`");

        let mut missing_user = token();
        missing_user.user = None;
        let err = TokenModel::new(&missing_user, false).unwrap_err();
        assert_eq!(err.message(), "Missing parameter: `user`");

        let mut missing_access_token = token();
        missing_access_token.access_token = String::new();
        let err = TokenModel::new(&missing_access_token, false).unwrap_err();
        assert_eq!(err.message(), "Missing parameter: `accessToken`");
    }

    #[test]
    fn test_lifetime_is_rounded_down() {
        let mut token = token();
        token.access_token_expires_at = Some(OffsetDateTime::now_utc() + Duration::seconds(3600));

        let model = TokenModel::new(&token, false).unwrap();
        let lifetime = model.access_token_lifetime.unwrap();
        assert!((3598..=3599).contains(&lifetime));
    }

    #[test]
    fn test_custom_attributes() {
        let mut token = token();
        token.extra.insert("foo".to_string(), json!("bar"));

        let model = TokenModel::new(&token, false).unwrap();
        assert!(model.custom_attributes.is_none());
        assert!(model.access_token_lifetime.is_none());

        let model = TokenModel::new(&token, true).unwrap();
        assert_eq!(
            model.custom_attributes.unwrap().get("foo"),
            Some(&json!("bar"))
        );
    }
}
