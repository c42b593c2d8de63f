//! Reaction to a session that cannot be recovered

use tracing::warn;

/// Invoked after credentials have been cleared because the session is gone
/// (no refresh token, or the refresh exchange failed).
#[cfg_attr(test, mockall::automock)]
pub trait UnauthenticatedHandler: Send + Sync {
    fn on_unauthenticated(&self);
}

impl<F> UnauthenticatedHandler for F
where
    F: Fn() + Send + Sync,
{
    fn on_unauthenticated(&self) {
        self()
    }
}

/// Handler that only records the event
#[derive(Debug, Default, Clone, Copy)]
pub struct LogUnauthenticated;

impl UnauthenticatedHandler for LogUnauthenticated {
    fn on_unauthenticated(&self) {
        warn!("Session ended, credentials cleared; log in again to continue");
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::LoginRedirect;

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::UnauthenticatedHandler;
    use tracing::error;

    /// Full page navigation to the login route, dropping in-memory state
    #[derive(Debug, Clone)]
    pub struct LoginRedirect {
        target: String,
    }

    impl LoginRedirect {
        pub fn new(target: impl Into<String>) -> Self {
            Self {
                target: target.into(),
            }
        }
    }

    impl Default for LoginRedirect {
        fn default() -> Self {
            Self::new("/login")
        }
    }

    impl UnauthenticatedHandler for LoginRedirect {
        fn on_unauthenticated(&self) {
            let Some(window) = web_sys::window() else {
                error!("No window available for login redirect");
                return;
            };
            if let Err(e) = window.location().set_href(&self.target) {
                error!("Login redirect failed: {e:?}");
            }
        }
    }
}
