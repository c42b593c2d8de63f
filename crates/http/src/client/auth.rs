//! Authentication API client methods

use super::{ApiClient, ClientError};
use reqwest::Method;
use studyboard_core::{
    AuthResponse, LoginRequest, RefreshTokenRequest, RegisterRequest, TokenPair, Validate,
};
use tracing::{info, warn};

impl ApiClient {
    /// Create an account and start a session
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, ClientError> {
        request.validate()?;
        let req = self.request(Method::POST, "/auth/register").json(&request);
        let response: AuthResponse = self.execute_public(req).await?;
        self.tokens().set_tokens(&TokenPair::from(&response))?;
        info!(user = %response.user.id, "Registered and logged in");
        Ok(response)
    }

    /// Log in and persist the issued credential pair
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ClientError> {
        request.validate()?;
        let req = self.request(Method::POST, "/auth/login").json(&request);
        let response: AuthResponse = self.execute_public(req).await?;
        self.tokens().set_tokens(&TokenPair::from(&response))?;
        info!(user = %response.user.id, "Logged in");
        Ok(response)
    }

    /// Exchange a refresh token for a new credential pair.
    ///
    /// Shares the single in-flight refresh with automatic recovery: if one is
    /// already running, this waits for its outcome instead.
    pub async fn refresh(&self, request: RefreshTokenRequest) -> Result<TokenPair, ClientError> {
        request.validate()?;
        self.coordinated_refresh(&request.refresh_token).await
    }

    /// End the session on the server and locally.
    ///
    /// Local credentials are cleared even when the server call fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let req = self.request(Method::POST, "/auth/logout");
        let result = self.execute_empty(req).await;
        if let Err(e) = &result {
            warn!("Server logout failed: {e}");
        }
        self.tokens().clear()?;
        info!("Logged out");
        result
    }
}
