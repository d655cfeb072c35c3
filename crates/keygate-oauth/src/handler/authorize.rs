//! Authorization endpoint (RFC 6749 Section 4.1.1).
//!
//! Issues an authorization code to an authenticated user and redirects the
//! user-agent back to the client. Once the client and its redirect target
//! are known, every failure is also reported to the client through the
//! redirect (`error`, `error_description`, `state`).
//!
//! # Flow
//!
//! 1. `allowed=false` in the query denies access outright
//! 2. Code expiry, client and user are resolved concurrently
//! 3. Scope, code value, `state` and `response_type` are validated
//! 4. The code is saved and the success redirect is built

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, error, info, warn};
use url::Url;

use super::authenticate::{AuthenticateHandler, AuthenticateOptions, Authenticator};
use crate::OAuthResult;
use crate::config::ServerConfig;
use crate::error::OAuthError;
use crate::grant;
use crate::http::{Request, Response};
use crate::model::{self, Model, ModelMethod};
use crate::response_type::ResponseTypes;
use crate::token::generate_random_token;
use crate::types::{AuthorizationCode, Client, GrantType, NewAuthorizationCode, User};
use crate::validator;

/// Options for [`AuthorizeHandler`].
#[derive(Clone)]
pub struct AuthorizeOptions {
    /// Lifetime of issued codes. Required and non-zero.
    pub authorization_code_lifetime: Option<Duration>,
    /// Must implement `get_client` and `save_authorization_code`.
    pub model: Arc<dyn Model>,
    /// Resolves the user. Defaults to bearer token authentication over the
    /// same model.
    pub authenticate_handler: Option<Arc<dyn Authenticator>>,
    /// Accept requests without `state`.
    pub allow_empty_state: bool,
    /// Used by the default authenticate handler.
    pub allow_bearer_tokens_in_query_string: bool,
    /// Accepted `response_type` values.
    pub response_types: ResponseTypes,
}

impl AuthorizeOptions {
    /// Options with defaults taken from `config`.
    #[must_use]
    pub fn from_config(model: Arc<dyn Model>, config: &ServerConfig) -> Self {
        Self {
            authorization_code_lifetime: Some(config.authorization_code_lifetime),
            model,
            authenticate_handler: None,
            allow_empty_state: config.allow_empty_state,
            allow_bearer_tokens_in_query_string: config.allow_bearer_tokens_in_query_string,
            response_types: ResponseTypes::default(),
        }
    }

    /// Uses `authenticator` to resolve the user.
    #[must_use]
    pub fn with_authenticate_handler(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticate_handler = Some(authenticator);
        self
    }
}

impl fmt::Debug for AuthorizeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizeOptions")
            .field(
                "authorization_code_lifetime",
                &self.authorization_code_lifetime,
            )
            .field("allow_empty_state", &self.allow_empty_state)
            .field("response_types", &self.response_types)
            .finish_non_exhaustive()
    }
}

/// Handles authorization requests.
pub struct AuthorizeHandler {
    authorization_code_lifetime: Duration,
    model: Arc<dyn Model>,
    authenticator: Arc<dyn Authenticator>,
    allow_empty_state: bool,
    response_types: ResponseTypes,
}

impl AuthorizeHandler {
    /// Creates the handler.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the code lifetime is missing or zero, or
    /// the model lacks a required method.
    pub fn new(options: AuthorizeOptions) -> OAuthResult<Self> {
        let authorization_code_lifetime = options
            .authorization_code_lifetime
            .filter(|lifetime| !lifetime.is_zero())
            .ok_or_else(|| {
                OAuthError::invalid_argument("Missing parameter: `authorizationCodeLifetime`")
            })?;

        model::require(
            options.model.as_ref(),
            &[ModelMethod::GetClient, ModelMethod::SaveAuthorizationCode],
        )?;

        let authenticator = match options.authenticate_handler {
            Some(authenticator) => authenticator,
            None => Arc::new(AuthenticateHandler::new(AuthenticateOptions {
                model: options.model.clone(),
                scope: None,
                add_accepted_scopes_header: true,
                add_authorized_scopes_header: true,
                allow_bearer_tokens_in_query_string: options.allow_bearer_tokens_in_query_string,
            })?),
        };

        Ok(Self {
            authorization_code_lifetime,
            model: options.model,
            authenticator,
            allow_empty_state: options.allow_empty_state,
            response_types: options.response_types,
        })
    }

    /// Handles an authorization request and returns the saved code.
    ///
    /// On success `response` redirects to the client with `code` and
    /// `state`. On failure after the client is known, `response` redirects
    /// with `error`, `error_description` and `state`, and the error is
    /// returned as well.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` if the user denied access, client errors
    /// (`InvalidRequest`, `InvalidClient`, `UnauthorizedClient`) without a
    /// redirect, and any later failure with an error redirect.
    pub async fn handle(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<AuthorizationCode> {
        if request.query.get("allowed").map(String::as_str) == Some("false") {
            warn!("User denied access to application");
            return Err(OAuthError::access_denied(
                "Access denied: user denied access to application",
            ));
        }

        debug!(
            client_id = ?request.param("client_id"),
            response_type = ?request.param("response_type"),
            "Processing authorization request"
        );

        let (expires_at, client, user) = tokio::join!(
            async { self.authorization_code_expires_at() },
            self.client(request),
            self.user(request, response),
        );

        let client = client.inspect_err(|e| warn!(error = %e, "Authorization client rejected"))?;
        let expires_at = expires_at?;
        let (raw_redirect_uri, redirect_uri) = redirect_uri(request, &client)?;

        let mut state = None;
        let result = self
            .authorize(
                request,
                &client,
                user,
                expires_at,
                (raw_redirect_uri, &redirect_uri),
                &mut state,
            )
            .await;

        match result {
            Ok((code, success_uri)) => {
                update_response(response, success_uri, state.as_deref())?;
                info!(client_id = %client.id, "Authorization code issued");
                Ok(code)
            }
            Err(e) => {
                if e.is_server_error() {
                    error!(client_id = %client.id, error = %e, "Authorization request failed");
                } else {
                    warn!(client_id = %client.id, error = %e, "Authorization request rejected");
                }

                let error_uri = build_error_redirect_uri(&redirect_uri, &e);
                if let Err(redirect_err) = update_response(response, error_uri, state.as_deref()) {
                    error!(error = %redirect_err, "Failed to build error redirect");
                }
                Err(e)
            }
        }
    }

    async fn authorize(
        &self,
        request: &Request,
        client: &Client,
        user: OAuthResult<User>,
        expires_at: OffsetDateTime,
        (raw_redirect_uri, redirect_uri): (&str, &Url),
        state: &mut Option<String>,
    ) -> OAuthResult<(AuthorizationCode, Url)> {
        let user = user?;

        let requested_scope = requested_scope(request)?;
        let scope =
            grant::validate_scope(self.model.as_ref(), &user, client, requested_scope).await?;

        let authorization_code = self
            .generate_authorization_code(client, &user, scope.as_deref())
            .await?;

        *state = self.state(request)?;
        let response_type = response_type(request, &self.response_types)?;

        let code = NewAuthorizationCode {
            authorization_code,
            expires_at,
            redirect_uri: raw_redirect_uri.to_string(),
            scope,
        };
        let code = self
            .model
            .save_authorization_code(code, client, &user)
            .resolve()
            .await?;

        let response_type = self
            .response_types
            .build(response_type, &code.authorization_code)
            .ok_or_else(unsupported_response_type)??;

        let success_uri = response_type.build_redirect_uri(redirect_uri);
        Ok((code, success_uri))
    }

    fn authorization_code_expires_at(&self) -> OAuthResult<OffsetDateTime> {
        grant::expires_after(self.authorization_code_lifetime)
    }

    async fn generate_authorization_code(
        &self,
        client: &Client,
        user: &User,
        scope: Option<&str>,
    ) -> OAuthResult<String> {
        if self
            .model
            .implements(ModelMethod::GenerateAuthorizationCode)
        {
            let generated = self
                .model
                .generate_authorization_code(client, user, scope)
                .resolve()
                .await?;
            if let Some(code) = generated.filter(|c| !c.is_empty()) {
                return Ok(code);
            }
        }

        generate_random_token()
    }

    async fn client(&self, request: &Request) -> OAuthResult<Client> {
        let client_id = request
            .param("client_id")
            .ok_or_else(|| OAuthError::invalid_request("Missing parameter: `client_id`"))?;

        if !validator::vschar(client_id) {
            return Err(OAuthError::invalid_request("Invalid parameter: `client_id`"));
        }

        let redirect_uri = request.param("redirect_uri");
        if redirect_uri.is_some_and(|uri| !validator::uri(uri)) {
            return Err(OAuthError::invalid_request(
                "Invalid request: `redirect_uri` is not a valid URI",
            ));
        }

        let client = self
            .model
            .get_client(client_id, None)
            .resolve()
            .await?
            .ok_or_else(|| {
                OAuthError::invalid_client("Invalid client: client credentials are invalid")
            })?;

        if client.grants.is_none() {
            return Err(OAuthError::invalid_client(
                "Invalid client: missing client `grants`",
            ));
        }

        if !client.allows_grant(GrantType::AuthorizationCode.as_str()) {
            return Err(OAuthError::unauthorized_client(
                "Unauthorized client: `grant_type` is invalid",
            ));
        }

        if client.redirect_uris.is_empty() {
            return Err(OAuthError::invalid_client(
                "Invalid client: missing client `redirectUri`",
            ));
        }

        if redirect_uri.is_some_and(|uri| !client.has_redirect_uri(uri)) {
            return Err(OAuthError::invalid_client(
                "Invalid client: `redirect_uri` does not match client value",
            ));
        }

        Ok(client)
    }

    async fn user(&self, request: &Request, response: &mut Response) -> OAuthResult<User> {
        let token = self
            .authenticator
            .authenticate(request, response)
            .resolve()
            .await?;

        token.and_then(|t| t.user).ok_or_else(|| {
            OAuthError::server_error("Server error: `handle()` did not return a `user` object")
        })
    }

    fn state(&self, request: &Request) -> OAuthResult<Option<String>> {
        match request.param("state") {
            None if self.allow_empty_state => Ok(None),
            None => Err(OAuthError::invalid_request("Missing parameter: `state`")),
            Some(state) if validator::vschar(state) => Ok(Some(state.to_string())),
            Some(_) => Err(OAuthError::invalid_request("Invalid parameter: `state`")),
        }
    }
}

impl fmt::Debug for AuthorizeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizeHandler")
            .field(
                "authorization_code_lifetime",
                &self.authorization_code_lifetime,
            )
            .field("allow_empty_state", &self.allow_empty_state)
            .field("response_types", &self.response_types)
            .finish_non_exhaustive()
    }
}

/// The request's redirect URI, else the client's first registered one, as
/// given and parsed.
fn redirect_uri<'r>(request: &'r Request, client: &'r Client) -> OAuthResult<(&'r str, Url)> {
    let uri = request
        .param("redirect_uri")
        .or_else(|| client.redirect_uris.first().map(String::as_str))
        .unwrap_or_default();

    let parsed = Url::parse(uri).map_err(|e| {
        warn!(error = %e, "Redirect URI could not be parsed");
        OAuthError::invalid_request("Invalid request: `redirect_uri` is not a valid URI")
    })?;

    Ok((uri, parsed))
}

fn requested_scope(request: &Request) -> OAuthResult<Option<&str>> {
    match request.param("scope") {
        Some(scope) if !validator::nqschar(scope) => {
            Err(OAuthError::invalid_scope("Invalid parameter: `scope`"))
        }
        scope => Ok(scope),
    }
}

fn response_type<'r>(request: &'r Request, response_types: &ResponseTypes) -> OAuthResult<&'r str> {
    let response_type = request
        .param("response_type")
        .ok_or_else(|| OAuthError::invalid_request("Missing parameter: `response_type`"))?;

    if !response_types.contains(response_type) {
        return Err(unsupported_response_type());
    }

    Ok(response_type)
}

fn unsupported_response_type() -> OAuthError {
    OAuthError::unsupported_response_type(
        "Unsupported response type: `response_type` is not supported",
    )
}

fn build_error_redirect_uri(redirect_uri: &Url, error: &OAuthError) -> Url {
    let mut uri = redirect_uri.clone();
    {
        let mut pairs = uri.query_pairs_mut();
        pairs.append_pair("error", error.code());
        if !error.message().is_empty() {
            pairs.append_pair("error_description", error.message());
        }
    }
    uri
}

fn update_response(response: &mut Response, mut uri: Url, state: Option<&str>) -> OAuthResult<()> {
    if let Some(state) = state {
        uri.query_pairs_mut().append_pair("state", state);
    }
    response.redirect(uri.as_str())
}
