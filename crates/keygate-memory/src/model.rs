use dashmap::DashMap;
use keygate_oauth::{
    AuthorizationCode, Client, Model, ModelMethod, NewAuthorizationCode, NewToken, Outcome,
    Token, User,
};
use time::OffsetDateTime;
use tracing::debug;

/// A registered resource owner.
#[derive(Debug, Clone)]
struct Account {
    password: String,
    user: User,
}

/// In-memory model using `DashMap` for concurrent access.
///
/// This model provides:
/// - Client lookup with optional secret check
/// - Password and client-credentials user resolution
/// - Authorization code, access token and refresh token storage
/// - Scope verification against the space-delimited token scope
///
/// Revocation removes the entry in a single map operation, so a code or
/// refresh token is revoked at most once even under concurrent requests.
#[derive(Debug, Default)]
pub struct InMemoryModel {
    clients: DashMap<String, Client>,
    accounts: DashMap<String, Account>,
    /// Client id -> the user that client acts as.
    client_users: DashMap<String, User>,
    authorization_codes: DashMap<String, AuthorizationCode>,
    access_tokens: DashMap<String, Token>,
    refresh_tokens: DashMap<String, Token>,
}

impl InMemoryModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a client.
    pub fn add_client(&self, client: Client) {
        self.clients.insert(client.id.clone(), client);
    }

    /// Registers or replaces a resource owner.
    pub fn add_user(&self, username: impl Into<String>, password: impl Into<String>, user: User) {
        self.accounts.insert(
            username.into(),
            Account {
                password: password.into(),
                user,
            },
        );
    }

    /// Sets the user `client_id` acts as under the client-credentials grant.
    pub fn set_client_user(&self, client_id: impl Into<String>, user: User) {
        self.client_users.insert(client_id.into(), user);
    }

    /// Stores an access token directly, bypassing issuance.
    pub fn insert_access_token(&self, token: Token) {
        self.access_tokens.insert(token.access_token.clone(), token);
    }

    /// Stores an authorization code directly, bypassing issuance.
    pub fn insert_authorization_code(&self, code: AuthorizationCode) {
        self.authorization_codes
            .insert(code.authorization_code.clone(), code);
    }

    /// Number of stored authorization codes, expired ones included.
    pub fn authorization_code_count(&self) -> usize {
        self.authorization_codes.len()
    }

    /// Number of stored access tokens.
    pub fn access_token_count(&self) -> usize {
        self.access_tokens.len()
    }

    /// Number of stored refresh tokens.
    pub fn refresh_token_count(&self) -> usize {
        self.refresh_tokens.len()
    }

    /// Drops expired codes and tokens.
    pub fn purge_expired(&self) {
        let now = OffsetDateTime::now_utc();
        self.authorization_codes
            .retain(|_, code| !code.is_expired_at(now));
        self.access_tokens
            .retain(|_, token| !token.is_access_token_expired_at(now));
        self.refresh_tokens
            .retain(|_, token| !token.is_refresh_token_expired_at(now));
    }
}

impl Model for InMemoryModel {
    fn implements(&self, method: ModelMethod) -> bool {
        !matches!(
            method,
            ModelMethod::GenerateAccessToken
                | ModelMethod::GenerateRefreshToken
                | ModelMethod::GenerateAuthorizationCode
                | ModelMethod::ValidateScope
        )
    }

    fn get_client<'a>(
        &'a self,
        client_id: &'a str,
        client_secret: Option<&'a str>,
    ) -> Outcome<'a, Option<Client>> {
        let client = self.clients.get(client_id).and_then(|client| {
            let authenticated =
                client_secret.is_none_or(|secret| client.secret.as_deref() == Some(secret));
            authenticated.then(|| client.value().clone())
        });

        Outcome::ready(client)
    }

    fn get_user_from_client<'a>(&'a self, client: &'a Client) -> Outcome<'a, Option<User>> {
        Outcome::ready(self.client_users.get(&client.id).map(|user| user.value().clone()))
    }

    fn get_user<'a>(&'a self, username: &'a str, password: &'a str) -> Outcome<'a, Option<User>> {
        let user = self
            .accounts
            .get(username)
            .filter(|account| account.password == password)
            .map(|account| account.user.clone());

        Outcome::ready(user)
    }

    fn get_authorization_code<'a>(
        &'a self,
        authorization_code: &'a str,
    ) -> Outcome<'a, Option<AuthorizationCode>> {
        Outcome::ready(
            self.authorization_codes
                .get(authorization_code)
                .map(|code| code.value().clone()),
        )
    }

    fn save_authorization_code<'a>(
        &'a self,
        code: NewAuthorizationCode,
        client: &'a Client,
        user: &'a User,
    ) -> Outcome<'a, AuthorizationCode> {
        let code = code.into_authorization_code(client, user);
        self.authorization_codes
            .insert(code.authorization_code.clone(), code.clone());
        debug!(client_id = %client.id, "Saved authorization code");

        Outcome::ready(code)
    }

    fn revoke_authorization_code<'a>(&'a self, code: &'a AuthorizationCode) -> Outcome<'a, bool> {
        let removed = self
            .authorization_codes
            .remove(&code.authorization_code)
            .is_some();

        Outcome::ready(removed)
    }

    fn get_refresh_token<'a>(&'a self, refresh_token: &'a str) -> Outcome<'a, Option<Token>> {
        Outcome::ready(
            self.refresh_tokens
                .get(refresh_token)
                .map(|token| token.value().clone()),
        )
    }

    fn revoke_token<'a>(&'a self, token: &'a Token) -> Outcome<'a, bool> {
        let removed = token
            .refresh_token
            .as_deref()
            .and_then(|refresh_token| self.refresh_tokens.remove(refresh_token))
            .is_some();

        if removed {
            self.access_tokens.remove(&token.access_token);
        }

        Outcome::ready(removed)
    }

    fn save_token<'a>(
        &'a self,
        token: NewToken,
        client: &'a Client,
        user: &'a User,
    ) -> Outcome<'a, Token> {
        let token = token.into_token(client, user);

        self.access_tokens
            .insert(token.access_token.clone(), token.clone());
        if let Some(refresh_token) = &token.refresh_token {
            self.refresh_tokens
                .insert(refresh_token.clone(), token.clone());
        }
        debug!(client_id = %client.id, "Saved token");

        Outcome::ready(token)
    }

    fn get_access_token<'a>(&'a self, access_token: &'a str) -> Outcome<'a, Option<Token>> {
        Outcome::ready(
            self.access_tokens
                .get(access_token)
                .map(|token| token.value().clone()),
        )
    }

    fn verify_scope<'a>(&'a self, token: &'a Token, scope: &'a str) -> Outcome<'a, bool> {
        let granted: Vec<&str> = token
            .scope
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default();

        Outcome::ready(scope.split_whitespace().all(|s| granted.contains(&s)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client() -> Client {
        Client::new("app")
            .with_secret("secret")
            .with_grants(["password", "refresh_token"])
    }

    fn user() -> User {
        User::new(json!({ "id": 1 }))
    }

    #[tokio::test]
    async fn test_get_client_checks_secret() {
        let model = InMemoryModel::new();
        model.add_client(client());

        let found = model.get_client("app", Some("secret")).resolve().await.unwrap();
        assert_eq!(found, Some(client()));

        let found = model.get_client("app", None).resolve().await.unwrap();
        assert!(found.is_some());

        let found = model.get_client("app", Some("nope")).resolve().await.unwrap();
        assert!(found.is_none());

        let found = model.get_client("other", None).resolve().await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_get_user() {
        let model = InMemoryModel::new();
        model.add_user("alice", "wonderland", user());

        let found = model.get_user("alice", "wonderland").resolve().await.unwrap();
        assert_eq!(found, Some(user()));
        let found = model.get_user("alice", "looking-glass").resolve().await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_revoke_token_once() {
        let model = InMemoryModel::new();
        let token = NewToken {
            access_token: "access".into(),
            refresh_token: Some("refresh".into()),
            ..NewToken::default()
        };
        let token = model
            .save_token(token, &client(), &user())
            .resolve()
            .await
            .unwrap();
        assert_eq!(model.access_token_count(), 1);
        assert_eq!(model.refresh_token_count(), 1);

        assert!(model.revoke_token(&token).resolve().await.unwrap());
        assert!(!model.revoke_token(&token).resolve().await.unwrap());
        assert_eq!(model.access_token_count(), 0);
        assert_eq!(model.refresh_token_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_code_revocation() {
        let model = std::sync::Arc::new(InMemoryModel::new());
        let code = NewAuthorizationCode {
            authorization_code: "code".into(),
            expires_at: OffsetDateTime::now_utc() + time::Duration::minutes(5),
            redirect_uri: "http://example.com/cb".into(),
            scope: None,
        };
        let code = model
            .save_authorization_code(code, &client(), &user())
            .resolve()
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let model = model.clone();
                let code = code.clone();
                tokio::spawn(async move {
                    model.revoke_authorization_code(&code).resolve().await.unwrap()
                })
            })
            .collect();

        let mut revoked = 0;
        for handle in handles {
            if handle.await.unwrap() {
                revoked += 1;
            }
        }
        assert_eq!(revoked, 1);
    }

    #[tokio::test]
    async fn test_verify_scope() {
        let model = InMemoryModel::new();
        let token = Token {
            access_token: "access".into(),
            scope: Some("read write".into()),
            ..Token::default()
        };

        assert!(model.verify_scope(&token, "read").resolve().await.unwrap());
        assert!(model.verify_scope(&token, "write read").resolve().await.unwrap());
        assert!(!model.verify_scope(&token, "admin").resolve().await.unwrap());
    }

    #[test]
    fn test_purge_expired() {
        let model = InMemoryModel::new();
        let now = OffsetDateTime::now_utc();
        model.insert_access_token(Token {
            access_token: "stale".into(),
            access_token_expires_at: Some(now - time::Duration::seconds(1)),
            ..Token::default()
        });
        model.insert_access_token(Token {
            access_token: "fresh".into(),
            access_token_expires_at: Some(now + time::Duration::hours(1)),
            ..Token::default()
        });

        model.purge_expired();
        assert_eq!(model.access_token_count(), 1);
    }
}
