//! Bearer token response body (RFC 6750 Section 4).

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::TokenModel;
use crate::OAuthResult;
use crate::error::OAuthError;

/// Token endpoint success body.
///
/// ```json
/// { "access_token": "...", "token_type": "Bearer", "expires_in": 3600,
///   "refresh_token": "...", "scope": "..." }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BearerToken {
    access_token: String,
    access_token_lifetime: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
    custom_attributes: Option<Map<String, Value>>,
}

impl BearerToken {
    /// Creates a Bearer view.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `access_token` is empty.
    pub fn new(
        access_token: impl Into<String>,
        access_token_lifetime: Option<i64>,
        refresh_token: Option<String>,
        scope: Option<String>,
        custom_attributes: Option<Map<String, Value>>,
    ) -> OAuthResult<Self> {
        let access_token = access_token.into();
        if access_token.is_empty() {
            return Err(OAuthError::invalid_argument(
                "Missing parameter: `accessToken`",
            ));
        }

        Ok(Self {
            access_token,
            access_token_lifetime,
            refresh_token,
            scope,
            custom_attributes,
        })
    }

    /// Builds the Bearer view of a projected token.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the access token is empty.
    pub fn from_model(model: &TokenModel) -> OAuthResult<Self> {
        Self::new(
            model.access_token.clone(),
            model.access_token_lifetime,
            model.refresh_token.clone(),
            model.scope.clone(),
            model.custom_attributes.clone(),
        )
    }

    /// Returns the JSON object sent to the client.
    ///
    /// `expires_in`, `refresh_token` and `scope` are omitted when absent.
    /// Custom attributes are merged last.
    #[must_use]
    pub fn value_of(&self) -> Map<String, Value> {
        let mut object = Map::new();
        object.insert("access_token".into(), self.access_token.clone().into());
        object.insert("token_type".into(), "Bearer".into());

        if let Some(lifetime) = self.access_token_lifetime.filter(|l| *l != 0) {
            object.insert("expires_in".into(), lifetime.into());
        }
        if let Some(refresh_token) = self.refresh_token.as_ref().filter(|t| !t.is_empty()) {
            object.insert("refresh_token".into(), refresh_token.clone().into());
        }
        if let Some(scope) = self.scope.as_ref().filter(|s| !s.is_empty()) {
            object.insert("scope".into(), scope.clone().into());
        }
        if let Some(custom) = &self.custom_attributes {
            for (key, value) in custom {
                object.insert(key.clone(), value.clone());
            }
        }

        object
    }
}

impl Serialize for BearerToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value_of().serialize(serializer)
    }
}
