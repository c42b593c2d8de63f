//! Credential storage
//!
//! The session lives in a small synchronous key/value store under two fixed
//! keys. [`TokenStorage`] is the typed view the client works with; the
//! [`CredentialStore`] trait is the substrate underneath it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use studyboard_core::TokenPair;
use thiserror::Error;

/// Storage key of the access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key of the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Credential storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed credential file: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Synchronous key/value store holding session credentials
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Typed access to the stored credential pair
#[derive(Clone)]
pub struct TokenStorage {
    store: Arc<dyn CredentialStore>,
}

impl TokenStorage {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store.get(REFRESH_TOKEN_KEY)
    }

    /// Both tokens, if both are present
    pub fn tokens(&self) -> Option<TokenPair> {
        Some(TokenPair {
            access_token: self.access_token()?,
            refresh_token: self.refresh_token()?,
        })
    }

    pub fn set_tokens(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        self.store.set(ACCESS_TOKEN_KEY, &tokens.access_token)?;
        self.store.set(REFRESH_TOKEN_KEY, &tokens.refresh_token)
    }

    /// Remove both entries. The second removal runs even if the first fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        let access = self.store.remove(ACCESS_TOKEN_KEY);
        let refresh = self.store.remove(REFRESH_TOKEN_KEY);
        access.and(refresh)
    }
}

impl Default for TokenStorage {
    fn default() -> Self {
        Self::new(Arc::new(MemoryCredentialStore::default()))
    }
}

/// In-process store, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, String>>,
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileCredentialStore;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use super::{CredentialStore, StorageError};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::{Mutex, PoisonError};
    use tracing::debug;

    /// Store backed by a JSON object file.
    ///
    /// Entries are cached in memory and every mutation rewrites the file
    /// through a temporary sibling followed by a rename.
    #[derive(Debug)]
    pub struct FileCredentialStore {
        path: PathBuf,
        entries: Mutex<HashMap<String, String>>,
    }

    impl FileCredentialStore {
        /// Open the store, loading existing entries if the file exists
        pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
            let path = path.into();
            let entries = match std::fs::read_to_string(&path) {
                Ok(content) if content.trim().is_empty() => HashMap::new(),
                Ok(content) => serde_json::from_str(&content)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
                Err(e) => return Err(e.into()),
            };
            debug!(path = %path.display(), entries = entries.len(), "Opened credential store");

            Ok(Self {
                path,
                entries: Mutex::new(entries),
            })
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let tmp = self.path.with_extension("tmp");
            std::fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
            }

            std::fs::rename(&tmp, &self.path)?;
            Ok(())
        }
    }

    impl CredentialStore for FileCredentialStore {
        fn get(&self, key: &str) -> Option<String> {
            self.entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(key)
                .cloned()
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            let mut next = entries.clone();
            next.insert(key.to_string(), value.to_string());
            self.persist(&next)?;
            *entries = next;
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if !entries.contains_key(key) {
                return Ok(());
            }
            let mut next = entries.clone();
            next.remove(key);
            self.persist(&next)?;
            *entries = next;
            Ok(())
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::LocalStorageCredentialStore;

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::{CredentialStore, StorageError};
    use gloo::storage::{LocalStorage, Storage};

    /// Store backed by the browser's local storage.
    ///
    /// Values are written raw, not JSON-encoded, so the layout matches what
    /// other scripts on the same origin expect.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct LocalStorageCredentialStore;

    impl CredentialStore for LocalStorageCredentialStore {
        fn get(&self, key: &str) -> Option<String> {
            LocalStorage::raw().get_item(key).ok().flatten()
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            LocalStorage::raw()
                .set_item(key, value)
                .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            LocalStorage::raw()
                .remove_item(key)
                .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        }
    }

    #[test]
    fn test_round_trip_and_clear() {
        let storage = TokenStorage::default();
        assert!(storage.tokens().is_none());

        storage.set_tokens(&pair("t1", "r1")).unwrap();
        assert_eq!(storage.access_token().as_deref(), Some("t1"));
        assert_eq!(storage.refresh_token().as_deref(), Some("r1"));
        assert_eq!(storage.tokens(), Some(pair("t1", "r1")));

        storage.clear().unwrap();
        assert!(storage.access_token().is_none());
        assert!(storage.refresh_token().is_none());
    }

    #[test]
    fn test_tokens_are_stored_verbatim() {
        let storage = TokenStorage::default();
        let access = "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiLQv9GA0LjQstC10YIifQ.sig==";
        storage.set_tokens(&pair(access, " r1 ")).unwrap();
        assert_eq!(storage.access_token().as_deref(), Some(access));
        assert_eq!(storage.refresh_token().as_deref(), Some(" r1 "));
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let store = FileCredentialStore::open(&path).unwrap();
        assert_eq!(store.path(), path);
        let storage = TokenStorage::new(Arc::new(store));
        storage.set_tokens(&pair("t1", "r1")).unwrap();

        let reopened = TokenStorage::new(Arc::new(FileCredentialStore::open(&path).unwrap()));
        assert_eq!(reopened.tokens(), Some(pair("t1", "r1")));

        reopened.clear().unwrap();
        let cleared = FileCredentialStore::open(&path).unwrap();
        assert!(cleared.get(ACCESS_TOKEN_KEY).is_none());
        assert!(cleared.get(REFRESH_TOKEN_KEY).is_none());
    }

    #[test]
    fn test_file_store_memory_follows_disk_on_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state");
        let store = FileCredentialStore::open(state.join("credentials.json")).unwrap();
        store.set(ACCESS_TOKEN_KEY, "t1").unwrap();

        // A file where the directory should be makes every write fail
        std::fs::remove_dir_all(&state).unwrap();
        std::fs::write(&state, "blocker").unwrap();

        assert!(store.set(REFRESH_TOKEN_KEY, "r1").is_err());
        assert!(store.get(REFRESH_TOKEN_KEY).is_none());

        assert!(store.remove(ACCESS_TOKEN_KEY).is_err());
        assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("t1"));
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            FileCredentialStore::open(&path),
            Err(StorageError::Serialization(_))
        ));
    }
}
