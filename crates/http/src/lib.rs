//! Studyboard HTTP client
//!
//! Typed access to the Studyboard REST API with bearer authentication and
//! transparent access-token refresh.

pub mod client;

pub use client::credentials::{
    CredentialStore, MemoryCredentialStore, StorageError, TokenStorage,
};
pub use client::error::{ClientError, RefreshFailure};
pub use client::handler::{LogUnauthenticated, UnauthenticatedHandler};
pub use client::session::SessionCoordinator;
pub use client::{ApiClient, ApiClientBuilder};

#[cfg(not(target_arch = "wasm32"))]
pub use client::credentials::FileCredentialStore;

#[cfg(target_arch = "wasm32")]
pub use client::credentials::LocalStorageCredentialStore;
#[cfg(target_arch = "wasm32")]
pub use client::handler::LoginRedirect;

pub use studyboard_core as core;
