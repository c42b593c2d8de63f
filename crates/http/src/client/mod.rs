//! Studyboard HTTP client
//!
//! Every call goes through [`ApiClient::execute`]: the stored access token is
//! attached on the way out, and a 401 on the way back triggers one refresh
//! exchange followed by one replay of the call. Concurrent calls that hit a
//! 401 while a refresh is running wait for it instead of starting their own.

pub mod auth;
pub mod credentials;
pub mod error;
pub mod handler;
pub mod problems;
pub mod projects;
pub mod roles;
pub mod session;
pub mod subjects;
pub mod tasks;

use credentials::{CredentialStore, TokenStorage};
use error::{ClientError, RefreshFailure};
use handler::{LogUnauthenticated, UnauthenticatedHandler};
use reqwest::header::{self, HeaderValue};
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use session::{RefreshGuard, RefreshTicket, SessionCoordinator};
use std::sync::Arc;
use std::time::Duration;
use studyboard_core::{RefreshTokenRequest, TokenPair};
use tracing::{debug, info, warn};

/// Default user agent sent with every request
pub const USER_AGENT: &str = concat!("studyboard-client/", env!("CARGO_PKG_VERSION"));

/// Studyboard API client
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: TokenStorage,
    session: Arc<SessionCoordinator>,
    on_unauthenticated: Arc<dyn UnauthenticatedHandler>,
}

impl ApiClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stored session credentials
    pub fn tokens(&self) -> &TokenStorage {
        &self.tokens
    }

    /// Refresh coordination shared by all clones of this client
    pub fn session(&self) -> &SessionCoordinator {
        &self.session
    }

    /// Whether a credential pair is currently stored
    pub fn is_logged_in(&self) -> bool {
        self.tokens.tokens().is_some()
    }

    /// Create a request builder relative to the base URL.
    ///
    /// Credentials are not attached here; [`ApiClient::execute`] attaches
    /// whatever token is stored at the moment the request is sent.
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }

    /// Execute an authenticated request and decode its JSON body
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        decode(response).await
    }

    /// Execute an authenticated request whose body is of no interest
    pub async fn execute_empty(&self, request: reqwest::RequestBuilder) -> Result<(), ClientError> {
        let response = self.send(request).await?;
        ensure_success(response).await.map(drop)
    }

    /// Execute a request without session recovery.
    ///
    /// The stored token is still attached. Used for login and registration,
    /// where a 401 means bad credentials rather than an expired session.
    pub async fn execute_public<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let mut request = request.build()?;
        self.authorize(&mut request)?;
        let response = self.client.execute(request).await?;
        decode(response).await
    }

    /// Send a request, recovering once from an expired access token
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, ClientError> {
        let mut request = request.build()?;
        let replay = request.try_clone();
        self.authorize(&mut request)?;

        debug!(method = %request.method(), url = %request.url(), "Sending request");
        let response = self.client.execute(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let message = error_message(response).await;
        let Some(mut replay) = replay else {
            return Err(ClientError::ReplayUnavailable);
        };

        let tokens = match self.session.begin_refresh() {
            RefreshTicket::Follower(pending) => {
                pending.wait().await.map_err(ClientError::RefreshFailed)?
            }
            RefreshTicket::Leader(guard) => {
                let Some(refresh_token) = self.tokens.refresh_token() else {
                    guard.settle(&Err(RefreshFailure::missing_refresh_token()));
                    info!("Access token rejected and no refresh token stored");
                    self.end_session();
                    return Err(ClientError::AuthorizationExpired(message));
                };
                self.lead_refresh(guard, &refresh_token)
                    .await
                    .map_err(ClientError::RefreshFailed)?
            }
        };

        set_bearer(&mut replay, &tokens.access_token)?;
        self.replay(replay).await
    }

    /// Send a request that already went through one refresh. A second 401 is
    /// final.
    async fn replay(&self, request: reqwest::Request) -> Result<Response, ClientError> {
        debug!(method = %request.method(), url = %request.url(), "Replaying request");
        let response = self.client.execute(request).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            let message = error_message(response).await;
            warn!("Request rejected again after token refresh");
            return Err(ClientError::AuthorizationRetryFailed(message));
        }
        Ok(response)
    }

    /// Run the refresh exchange as leader, persist the result and settle the
    /// queue. On failure the session is ended.
    async fn lead_refresh(
        &self,
        guard: RefreshGuard<'_>,
        refresh_token: &str,
    ) -> Result<TokenPair, RefreshFailure> {
        let outcome = match self.exchange_refresh_token(refresh_token).await {
            Ok(tokens) => self
                .tokens
                .set_tokens(&tokens)
                .map(|()| tokens)
                .map_err(RefreshFailure::from),
            Err(failure) => Err(failure),
        };
        guard.settle(&outcome);

        match &outcome {
            Ok(_) => info!("Session refreshed"),
            Err(failure) => {
                warn!(status = ?failure.status, "Token refresh failed: {failure}");
                self.end_session();
            }
        }
        outcome
    }

    /// `POST /auth/refresh` straight on the transport, outside the recovery
    /// path so a failing refresh can never recurse into another refresh.
    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenPair, RefreshFailure> {
        let body = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        let response = self
            .request(reqwest::Method::POST, "/auth/refresh")
            .json(&body)
            .send()
            .await
            .map_err(|e| RefreshFailure::new(None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(RefreshFailure::new(Some(status.as_u16()), message));
        }

        response
            .json::<TokenPair>()
            .await
            .map_err(|e| RefreshFailure::new(Some(status.as_u16()), e.to_string()))
    }

    /// Refresh through the coordinator with an explicit refresh token
    pub(crate) async fn coordinated_refresh(
        &self,
        refresh_token: &str,
    ) -> Result<TokenPair, ClientError> {
        let outcome = match self.session.begin_refresh() {
            RefreshTicket::Follower(pending) => pending.wait().await,
            RefreshTicket::Leader(guard) => self.lead_refresh(guard, refresh_token).await,
        };
        outcome.map_err(ClientError::RefreshFailed)
    }

    /// Attach the stored access token, if any
    fn authorize(&self, request: &mut reqwest::Request) -> Result<(), ClientError> {
        if let Some(token) = self.tokens.access_token() {
            set_bearer(request, &token)?;
        }
        Ok(())
    }

    /// Clear credentials and hand control to the unauthenticated handler
    fn end_session(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!("Failed to clear credentials: {e}");
        }
        self.on_unauthenticated.on_unauthenticated();
    }
}

fn set_bearer(request: &mut reqwest::Request, token: &str) -> Result<(), ClientError> {
    let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
        ClientError::Configuration("access token is not a valid header value".into())
    })?;
    request.headers_mut().insert(header::AUTHORIZATION, value);
    Ok(())
}

/// Turn a non-success response into the matching error
async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let message = error_message(response).await;
        Err(ClientError::from_status(status, message))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(serde_json::from_value(serde_json::Value::Null)?);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

/// Extract a readable message from an error body.
///
/// The API answers errors with plain text; JSON bodies carrying `message` or
/// `error` are understood too.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let text = text.trim();

    if let Ok(serde_json::Value::Object(body)) = serde_json::from_str::<serde_json::Value>(text) {
        for key in ["message", "error"] {
            if let Some(message) = body.get(key).and_then(serde_json::Value::as_str) {
                return message.to_string();
            }
        }
    }

    if text.is_empty() {
        status
            .canonical_reason()
            .map_or_else(|| status.to_string(), str::to_string)
    } else {
        text.to_string()
    }
}

/// Builder for ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    store: Option<Arc<dyn CredentialStore>>,
    on_unauthenticated: Option<Arc<dyn UnauthenticatedHandler>>,
}

impl ApiClientBuilder {
    /// Set the base URL, including the `/api` prefix
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Where session credentials are kept (in memory by default)
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// What to do when the session cannot be recovered
    pub fn on_unauthenticated(mut self, handler: Arc<dyn UnauthenticatedHandler>) -> Self {
        self.on_unauthenticated = Some(handler);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url: {e}")))?;

        let mut client_builder = ClientBuilder::new();

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        client_builder =
            client_builder.user_agent(self.user_agent.unwrap_or_else(|| USER_AGENT.to_string()));

        let client = client_builder.build()?;

        let tokens = self.store.map_or_else(TokenStorage::default, TokenStorage::new);

        Ok(ApiClient {
            client,
            base_url,
            tokens,
            session: Arc::new(SessionCoordinator::new()),
            on_unauthenticated: self
                .on_unauthenticated
                .unwrap_or_else(|| Arc::new(LogUnauthenticated)),
        })
    }
}
