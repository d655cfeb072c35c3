//! Client credentials grant (RFC 6749 Section 4.4).

use super::{GrantBase, GrantOptions};
use crate::OAuthResult;
use crate::error::OAuthError;
use crate::http::Request;
use crate::model::{self, ModelMethod};
use crate::types::{Client, NewToken, Token, User};

/// Issues an access token to a client acting on its own behalf. No refresh
/// token is issued.
#[derive(Debug, Clone)]
pub struct ClientCredentialsGrant {
    base: GrantBase,
}

impl ClientCredentialsGrant {
    /// Model methods this grant depends on.
    pub const REQUIRED: &'static [ModelMethod] =
        &[ModelMethod::GetUserFromClient, ModelMethod::SaveToken];

    /// Creates the grant.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for invalid options or a model missing a
    /// required method.
    pub fn new(options: GrantOptions) -> OAuthResult<Self> {
        let base = GrantBase::new(options)?;
        model::require(base.model(), Self::REQUIRED)?;
        Ok(Self { base })
    }

    /// Handles the token request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if the model has no user for the client.
    pub async fn handle(&self, request: &Request, client: &Client) -> OAuthResult<Token> {
        let scope = self.base.scope(request)?;

        let user = self
            .base
            .model()
            .get_user_from_client(client)
            .resolve()
            .await?
            .ok_or_else(|| OAuthError::invalid_grant("Invalid grant: user credentials are invalid"))?;

        self.save_token(&user, client, scope.as_deref()).await
    }

    async fn save_token(
        &self,
        user: &User,
        client: &Client,
        scope: Option<&str>,
    ) -> OAuthResult<Token> {
        let base = &self.base;
        let (scope, access_token, access_token_expires_at) = tokio::try_join!(
            base.validate_scope(user, client, scope),
            base.generate_access_token(client, user, scope),
            async { base.access_token_expires_at() },
        )?;

        let token = NewToken {
            access_token,
            access_token_expires_at: Some(access_token_expires_at),
            scope,
            ..NewToken::default()
        };

        Ok(base.model().save_token(token, client, user).resolve().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::adapter::Outcome;
    use crate::error::ErrorKind;
    use crate::model::Model;

    struct ServiceAccounts {
        user: Option<User>,
    }

    impl Model for ServiceAccounts {
        fn implements(&self, method: ModelMethod) -> bool {
            ClientCredentialsGrant::REQUIRED.contains(&method)
        }

        fn get_user_from_client<'a>(&'a self, _client: &'a Client) -> Outcome<'a, Option<User>> {
            Outcome::callback(move |done| done.ok(self.user.clone()))
        }

        fn save_token<'a>(
            &'a self,
            token: NewToken,
            client: &'a Client,
            user: &'a User,
        ) -> Outcome<'a, Token> {
            Outcome::deferred(async move { Ok(token.into_token(client, user)) })
        }
    }

    fn grant(user: Option<User>) -> ClientCredentialsGrant {
        ClientCredentialsGrant::new(GrantOptions::new(
            Arc::new(ServiceAccounts { user }),
            Duration::from_secs(120),
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_issues_access_token_only() {
        let request = Request::default().with_body("scope", "read");
        let token = grant(Some(User::new(json!({ "id": "svc" }))))
            .handle(&request, &Client::new("app"))
            .await
            .unwrap();

        assert_eq!(token.access_token.len(), 40);
        assert!(token.access_token_expires_at.is_some());
        assert!(token.refresh_token.is_none());
        assert_eq!(token.scope.as_deref(), Some("read"));
    }

    #[tokio::test]
    async fn test_missing_user() {
        let err = grant(None)
            .handle(&Request::default(), &Client::new("app"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidGrant);
        assert_eq!(err.message(), "Invalid grant: user credentials are invalid");
    }

    #[tokio::test]
    async fn test_invalid_scope_parameter() {
        let request = Request::default().with_body("scope", "\\");
        let err = grant(Some(User::new(json!({}))))
            .handle(&request, &Client::new("app"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
