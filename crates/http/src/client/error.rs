//! Client error types

use crate::client::credentials::StorageError;
use studyboard_core::ValidationError;
use thiserror::Error;

/// Fallback shown to users when the server gave no usable message
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or transport error, no response received
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// 401 that could not be recovered, e.g. no refresh token was stored
    #[error("Authorization expired: {0}")]
    AuthorizationExpired(String),

    /// 401 on a request that was already replayed after a refresh
    #[error("Authorization failed after token refresh: {0}")]
    AuthorizationRetryFailed(String),

    /// The refresh exchange itself failed
    #[error("Token refresh failed: {0}")]
    RefreshFailed(RefreshFailure),

    /// The request body cannot be cloned, so it cannot be replayed
    #[error("Request cannot be replayed after authorization failure")]
    ReplayUnavailable,

    /// Payload rejected before sending
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// Credential storage failure
    #[error("Credential storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthorizationExpired(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// HTTP status associated with this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::ServerError { status, .. } => Some(*status),
            Self::BadRequest(_) => Some(400),
            Self::AuthorizationExpired(_) | Self::AuthorizationRetryFailed(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::RefreshFailed(failure) => failure.status,
            _ => None,
        }
    }

    /// Whether the session is gone and the user has to log in again
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::AuthorizationExpired(_)
                | Self::AuthorizationRetryFailed(_)
                | Self::RefreshFailed(_)
        )
    }

    /// Message suitable for showing to a user.
    ///
    /// Terminal authentication failures return `None`: the session handler
    /// takes over and nothing should be rendered for them.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::RefreshFailed(_) | Self::AuthorizationRetryFailed(_) => None,
            Self::BadRequest(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::AuthorizationExpired(message)
            | Self::ServerError { message, .. }
                if !message.trim().is_empty() =>
            {
                Some(message.clone())
            }
            Self::Validation(error) => Some(error.to_string()),
            _ => Some(GENERIC_ERROR_MESSAGE.to_string()),
        }
    }
}

/// Why a refresh exchange did not produce new credentials.
///
/// Cloneable so a single failure can be handed to every queued request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RefreshFailure {
    /// Status returned by the refresh endpoint, `None` if no response arrived
    pub status: Option<u16>,
    pub message: String,
}

impl RefreshFailure {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn missing_refresh_token() -> Self {
        Self::new(None, "no refresh token stored")
    }

    pub fn abandoned() -> Self {
        Self::new(None, "refresh was abandoned before it completed")
    }
}

impl From<StorageError> for RefreshFailure {
    fn from(error: StorageError) -> Self {
        Self::new(None, format!("failed to store refreshed credentials: {error}"))
    }
}
