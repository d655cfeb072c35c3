//! Token endpoint (RFC 6749 Section 3.2).
//!
//! Authenticates the client, dispatches to the grant type named by
//! `grant_type` and writes the Bearer token response.
//!
//! # Example
//!
//! ```text
//! POST /token
//! Content-Type: application/x-www-form-urlencoded
//! Authorization: Basic <base64(client_id:client_secret)>
//!
//! grant_type=authorization_code
//! &code=SplxlOBeZQQYbYS6WxSbIA
//! &redirect_uri=https://app.example.com/callback
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::header::{AUTHORIZATION, CACHE_CONTROL, PRAGMA, WWW_AUTHENTICATE};
use http::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::OAuthResult;
use crate::config::ServerConfig;
use crate::error::{ErrorKind, OAuthError};
use crate::grant::{ExtensionGrant, Grant, GrantOptions, GrantRegistry, builtin_grants};
use crate::http::{Request, Response, parse_basic_auth};
use crate::model::{self, Model, ModelMethod};
use crate::token::{BearerToken, TokenModel};
use crate::types::{Client, Token};
use crate::validator;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Options for [`TokenHandler`].
#[derive(Clone)]
pub struct TokenOptions {
    /// Default access token lifetime. Required and non-zero.
    pub access_token_lifetime: Option<Duration>,
    /// Default refresh token lifetime. Required and non-zero.
    pub refresh_token_lifetime: Option<Duration>,
    /// Must implement `get_client`.
    pub model: Arc<dyn Model>,
    /// Grant types beyond the built-ins, keyed by `grant_type`.
    pub extended_grant_types: HashMap<String, Arc<dyn ExtensionGrant>>,
    /// Emit non-standard token attributes.
    pub allow_extended_token_attributes: bool,
    /// Per grant type: whether the client must present its secret.
    pub require_client_authentication: HashMap<String, bool>,
    /// Rotate refresh tokens on use.
    pub always_issue_new_refresh_token: bool,
}

impl TokenOptions {
    /// Options with defaults taken from `config`.
    #[must_use]
    pub fn from_config(model: Arc<dyn Model>, config: &ServerConfig) -> Self {
        Self {
            access_token_lifetime: Some(config.access_token_lifetime),
            refresh_token_lifetime: Some(config.refresh_token_lifetime),
            model,
            extended_grant_types: HashMap::new(),
            allow_extended_token_attributes: config.allow_extended_token_attributes,
            require_client_authentication: config.require_client_authentication.clone(),
            always_issue_new_refresh_token: config.always_issue_new_refresh_token,
        }
    }

    /// Registers an extension grant under `grant_type`.
    #[must_use]
    pub fn with_extension_grant(
        mut self,
        grant_type: impl Into<String>,
        grant: Arc<dyn ExtensionGrant>,
    ) -> Self {
        self.extended_grant_types.insert(grant_type.into(), grant);
        self
    }
}

impl fmt::Debug for TokenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenOptions")
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .field(
                "extended_grant_types",
                &self.extended_grant_types.keys().collect::<Vec<_>>(),
            )
            .field(
                "allow_extended_token_attributes",
                &self.allow_extended_token_attributes,
            )
            .field(
                "require_client_authentication",
                &self.require_client_authentication,
            )
            .field(
                "always_issue_new_refresh_token",
                &self.always_issue_new_refresh_token,
            )
            .finish_non_exhaustive()
    }
}

/// Client credentials extracted from a token request.
#[derive(Debug)]
struct ClientCredentials<'r> {
    client_id: Cow<'r, str>,
    client_secret: Option<Cow<'r, str>>,
}

/// Handles token requests.
pub struct TokenHandler {
    access_token_lifetime: Duration,
    refresh_token_lifetime: Duration,
    model: Arc<dyn Model>,
    grants: GrantRegistry,
    allow_extended_token_attributes: bool,
    require_client_authentication: HashMap<String, bool>,
    always_issue_new_refresh_token: bool,
}

impl TokenHandler {
    /// Creates the handler.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if a lifetime is missing or zero, or the
    /// model does not implement `get_client`.
    pub fn new(options: TokenOptions) -> OAuthResult<Self> {
        let access_token_lifetime = required_lifetime(
            options.access_token_lifetime,
            "Missing parameter: `accessTokenLifetime`",
        )?;
        let refresh_token_lifetime = required_lifetime(
            options.refresh_token_lifetime,
            "Missing parameter: `refreshTokenLifetime`",
        )?;

        model::require(options.model.as_ref(), &[ModelMethod::GetClient])?;

        let mut grants = builtin_grants();
        grants.extend(
            options
                .extended_grant_types
                .into_iter()
                .map(|(name, grant)| (name, Grant::Extension(grant))),
        );

        Ok(Self {
            access_token_lifetime,
            refresh_token_lifetime,
            model: options.model,
            grants,
            allow_extended_token_attributes: options.allow_extended_token_attributes,
            require_client_authentication: options.require_client_authentication,
            always_issue_new_refresh_token: options.always_issue_new_refresh_token,
        })
    }

    /// Handles a token request and returns the saved token.
    ///
    /// On success `response` carries the Bearer body with `Cache-Control:
    /// no-store` and `Pragma: no-cache`. On failure it carries `{ error,
    /// error_description }` with the error's status, and the error is
    /// returned as well.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for a non-POST or non-form request, client
    /// authentication failures, and any error the grant type raises.
    pub async fn handle(&self, request: &Request, response: &mut Response) -> OAuthResult<Token> {
        if request.method != Method::POST {
            return Err(OAuthError::invalid_request(
                "Invalid request: method must be POST",
            ));
        }

        if !request.is(FORM_CONTENT_TYPE) {
            return Err(OAuthError::invalid_request(
                "Invalid request: content must be application/x-www-form-urlencoded",
            ));
        }

        debug!(
            grant_type = ?request.body_param("grant_type"),
            client_id = ?request.param("client_id"),
            "Processing token request"
        );

        match self.issue(request, response).await {
            Ok((token, bearer)) => {
                response.body = bearer.value_of();
                response.set(CACHE_CONTROL, "no-store")?;
                response.set(PRAGMA, "no-cache")?;
                Ok(token)
            }
            Err(e) => {
                if e.is_server_error() {
                    error!(error = %e, "Token request failed");
                } else {
                    warn!(error = %e, "Token request rejected");
                }

                response.body.clear();
                response
                    .body
                    .insert("error".into(), Value::from(e.code()));
                if !e.message().is_empty() {
                    response
                        .body
                        .insert("error_description".into(), Value::from(e.message()));
                }
                response.status = e.status();
                Err(e)
            }
        }
    }

    async fn issue(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<(Token, BearerToken)> {
        let client = self.client(request, response).await?;
        let grant_type = request.body_param("grant_type").unwrap_or_default();

        info!(
            client_id = %client.id,
            grant_type = %grant_type,
            "Client authenticated, processing grant"
        );

        let token = self.handle_grant_type(request, &client).await?;

        let model = TokenModel::new(&token, self.allow_extended_token_attributes)?;
        let bearer = BearerToken::from_model(&model)?;

        info!(
            client_id = %client.id,
            grant_type = %grant_type,
            "Token issued successfully"
        );

        Ok((token, bearer))
    }

    async fn client(&self, request: &Request, response: &mut Response) -> OAuthResult<Client> {
        let result = self.fetch_client(request).await;
        let challenged = request.get(AUTHORIZATION).is_some();

        match result {
            Err(e) if challenged && e.kind() == ErrorKind::InvalidClient => {
                response.set(WWW_AUTHENTICATE, "Basic realm=\"Service\"")?;
                Err(e.with_status(StatusCode::UNAUTHORIZED))
            }
            other => other,
        }
    }

    async fn fetch_client(&self, request: &Request) -> OAuthResult<Client> {
        let credentials = self.client_credentials(request)?;

        if !validator::vschar(&credentials.client_id) {
            return Err(OAuthError::invalid_request("Invalid parameter: `client_id`"));
        }

        if credentials
            .client_secret
            .as_deref()
            .is_some_and(|secret| !validator::vschar(secret))
        {
            return Err(OAuthError::invalid_request(
                "Invalid parameter: `client_secret`",
            ));
        }

        let client = self
            .model
            .get_client(&credentials.client_id, credentials.client_secret.as_deref())
            .resolve()
            .await?
            .ok_or_else(|| OAuthError::invalid_client("Invalid client: client is invalid"))?;

        if client.grants.is_none() {
            return Err(OAuthError::server_error(
                "Server error: missing client `grants`",
            ));
        }

        Ok(client)
    }

    /// Basic header first, then body credentials, then a bare `client_id`
    /// for grant types that do not require client authentication.
    fn client_credentials<'r>(&self, request: &'r Request) -> OAuthResult<ClientCredentials<'r>> {
        if let Some(basic) = request.get(AUTHORIZATION).and_then(parse_basic_auth) {
            if basic.name.is_empty() {
                return Err(OAuthError::invalid_request("Missing parameter: `client_id`"));
            }
            let client_secret = if !basic.pass.is_empty() {
                Some(basic.pass.into())
            } else if self.requires_client_authentication(request) {
                return Err(OAuthError::invalid_request(
                    "Missing parameter: `client_secret`",
                ));
            } else {
                None
            };
            return Ok(ClientCredentials {
                client_id: basic.name.into(),
                client_secret,
            });
        }

        let client_id = request.body_param("client_id");
        let client_secret = request.body_param("client_secret");

        match (client_id, client_secret) {
            (Some(id), Some(secret)) => Ok(ClientCredentials {
                client_id: id.into(),
                client_secret: Some(secret.into()),
            }),
            (Some(id), None) if !self.requires_client_authentication(request) => {
                Ok(ClientCredentials {
                    client_id: id.into(),
                    client_secret: None,
                })
            }
            _ => Err(OAuthError::invalid_client(
                "Invalid client: cannot retrieve client credentials",
            )),
        }
    }

    fn requires_client_authentication(&self, request: &Request) -> bool {
        request
            .body_param("grant_type")
            .and_then(|grant_type| self.require_client_authentication.get(grant_type))
            .copied()
            .unwrap_or(true)
    }

    async fn handle_grant_type(&self, request: &Request, client: &Client) -> OAuthResult<Token> {
        let grant_type = request
            .body_param("grant_type")
            .ok_or_else(|| OAuthError::invalid_request("Missing parameter: `grant_type`"))?;

        if !validator::nchar(grant_type) && !validator::uri(grant_type) {
            return Err(OAuthError::invalid_request(
                "Invalid parameter: `grant_type`",
            ));
        }

        let grant = self.grants.get(grant_type).ok_or_else(|| {
            OAuthError::unsupported_grant_type("Unsupported grant type: `grant_type` is invalid")
        })?;

        if !client.allows_grant(grant_type) {
            return Err(OAuthError::unauthorized_client(
                "Unauthorized client: `grant_type` is invalid",
            ));
        }

        let options = GrantOptions {
            access_token_lifetime: Some(self.access_token_lifetime(client)),
            refresh_token_lifetime: Some(self.refresh_token_lifetime(client)),
            model: self.model.clone(),
            always_issue_new_refresh_token: Some(self.always_issue_new_refresh_token),
        };

        grant.handle(options, request, client).await
    }

    fn access_token_lifetime(&self, client: &Client) -> Duration {
        client
            .access_token_lifetime
            .filter(|secs| *secs > 0)
            .map_or(self.access_token_lifetime, Duration::from_secs)
    }

    fn refresh_token_lifetime(&self, client: &Client) -> Duration {
        client
            .refresh_token_lifetime
            .filter(|secs| *secs > 0)
            .map_or(self.refresh_token_lifetime, Duration::from_secs)
    }
}

impl fmt::Debug for TokenHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenHandler")
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .field("grants", &self.grants.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn required_lifetime(lifetime: Option<Duration>, message: &str) -> OAuthResult<Duration> {
    lifetime
        .filter(|lifetime| !lifetime.is_zero())
        .ok_or_else(|| OAuthError::invalid_argument(message))
}
