//! Server facade.
//!
//! [`OAuth2Server`] holds the model, the [`ServerConfig`] defaults and the
//! registered extensions, and builds a handler for each call. The `*_with`
//! variants take options derived from the defaults and adjusted by the
//! caller.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::OAuthResult;
use crate::config::ServerConfig;
use crate::grant::ExtensionGrant;
use crate::handler::{
    AuthenticateHandler, AuthenticateOptions, AuthorizeHandler, AuthorizeOptions, TokenHandler,
    TokenOptions,
};
use crate::http::{Request, Response};
use crate::model::Model;
use crate::response_type::{ResponseTypeFactory, ResponseTypes};
use crate::types::{AuthorizationCode, Token};

/// OAuth 2.0 authorization server.
///
/// # Example
///
/// ```ignore
/// let server = OAuth2Server::new(Arc::new(model), ServerConfig::default());
///
/// let mut response = Response::new();
/// match server.token(&request, &mut response).await {
///     Ok(token) => { /* response holds the Bearer body */ }
///     Err(e) => { /* response holds { error, error_description } */ }
/// }
/// ```
#[derive(Clone)]
pub struct OAuth2Server {
    model: Arc<dyn Model>,
    config: ServerConfig,
    extension_grants: HashMap<String, Arc<dyn ExtensionGrant>>,
    response_types: ResponseTypes,
}

impl OAuth2Server {
    /// Creates a server over `model`.
    #[must_use]
    pub fn new(model: Arc<dyn Model>, config: ServerConfig) -> Self {
        Self {
            model,
            config,
            extension_grants: HashMap::new(),
            response_types: ResponseTypes::default(),
        }
    }

    /// Registers an extension grant under `grant_type`.
    #[must_use]
    pub fn with_extension_grant(
        mut self,
        grant_type: impl Into<String>,
        grant: Arc<dyn ExtensionGrant>,
    ) -> Self {
        self.extension_grants.insert(grant_type.into(), grant);
        self
    }

    /// Registers an additional `response_type` for the authorize endpoint.
    #[must_use]
    pub fn with_response_type(
        mut self,
        response_type: impl Into<String>,
        factory: ResponseTypeFactory,
    ) -> Self {
        self.response_types.register(response_type, factory);
        self
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    #[must_use]
    pub fn model(&self) -> &Arc<dyn Model> {
        &self.model
    }

    // =========================================================================
    // Options
    // =========================================================================

    /// Authenticate options from the server defaults.
    #[must_use]
    pub fn authenticate_options(&self) -> AuthenticateOptions {
        AuthenticateOptions::from_config(self.model.clone(), &self.config)
    }

    /// Authorize options from the server defaults.
    #[must_use]
    pub fn authorize_options(&self) -> AuthorizeOptions {
        let mut options = AuthorizeOptions::from_config(self.model.clone(), &self.config);
        options.response_types = self.response_types.clone();
        options
    }

    /// Token options from the server defaults, with the registered
    /// extension grants.
    #[must_use]
    pub fn token_options(&self) -> TokenOptions {
        let mut options = TokenOptions::from_config(self.model.clone(), &self.config);
        options.extended_grant_types = self.extension_grants.clone();
        options
    }

    // =========================================================================
    // Endpoints
    // =========================================================================

    /// Validates the bearer token of a request to a protected resource.
    ///
    /// # Errors
    ///
    /// See [`AuthenticateHandler::handle`].
    pub async fn authenticate(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<Token> {
        self.authenticate_with(self.authenticate_options(), request, response)
            .await
    }

    /// Like [`authenticate`](Self::authenticate) with explicit options.
    ///
    /// # Errors
    ///
    /// See [`AuthenticateHandler::handle`].
    pub async fn authenticate_with(
        &self,
        options: AuthenticateOptions,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<Token> {
        AuthenticateHandler::new(options)?
            .handle(request, response)
            .await
    }

    /// Handles an authorization request.
    ///
    /// # Errors
    ///
    /// See [`AuthorizeHandler::handle`].
    pub async fn authorize(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<AuthorizationCode> {
        self.authorize_with(self.authorize_options(), request, response)
            .await
    }

    /// Like [`authorize`](Self::authorize) with explicit options.
    ///
    /// # Errors
    ///
    /// See [`AuthorizeHandler::handle`].
    pub async fn authorize_with(
        &self,
        options: AuthorizeOptions,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<AuthorizationCode> {
        AuthorizeHandler::new(options)?
            .handle(request, response)
            .await
    }

    /// Handles a token request.
    ///
    /// # Errors
    ///
    /// See [`TokenHandler::handle`].
    pub async fn token(&self, request: &Request, response: &mut Response) -> OAuthResult<Token> {
        self.token_with(self.token_options(), request, response)
            .await
    }

    /// Like [`token`](Self::token) with explicit options.
    ///
    /// # Errors
    ///
    /// See [`TokenHandler::handle`].
    pub async fn token_with(
        &self,
        options: TokenOptions,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<Token> {
        TokenHandler::new(options)?.handle(request, response).await
    }
}

impl fmt::Debug for OAuth2Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Server")
            .field("config", &self.config)
            .field(
                "extension_grants",
                &self.extension_grants.keys().collect::<Vec<_>>(),
            )
            .field("response_types", &self.response_types)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::ErrorKind;
    use crate::model::ModelMethod;
    use crate::response_type::CodeResponseType;

    struct ClientsOnly;

    impl Model for ClientsOnly {
        fn implements(&self, method: ModelMethod) -> bool {
            method == ModelMethod::GetClient
        }
    }

    fn server() -> OAuth2Server {
        let config = ServerConfig {
            access_token_lifetime: Duration::from_secs(120),
            ..ServerConfig::default()
        };
        OAuth2Server::new(Arc::new(ClientsOnly), config)
    }

    #[test]
    fn test_options_follow_config() {
        let server = server();
        assert_eq!(
            server.token_options().access_token_lifetime,
            Some(Duration::from_secs(120))
        );
        assert_eq!(
            server.authorize_options().authorization_code_lifetime,
            Some(Duration::from_secs(300))
        );
        assert!(server.authenticate_options().add_accepted_scopes_header);
    }

    #[test]
    fn test_registered_response_type_reaches_authorize_options() {
        let server = server().with_response_type(
            "code id_token",
            Arc::new(|code: &str| {
                CodeResponseType::new(code).map(|t| Box::new(t) as Box<dyn crate::ResponseType>)
            }),
        );

        let types = server.authorize_options().response_types;
        assert!(types.contains("code"));
        assert!(types.contains("code id_token"));
    }

    #[tokio::test]
    async fn test_authenticate_requires_get_access_token() {
        let err = tokio_test::assert_err!(
            server()
                .authenticate(&Request::default(), &mut Response::new())
                .await
        );
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
