//! Single-flight coordination of token refreshes
//!
//! Whoever first observes an expired session becomes the leader and runs the
//! refresh exchange. Everyone arriving while that exchange is in flight is
//! queued and receives the leader's outcome, in arrival order, once it
//! settles. The in-flight flag and the queue are only touched under one
//! short lock that is never held across an await.

use crate::client::error::RefreshFailure;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use studyboard_core::TokenPair;
use tokio::sync::oneshot;
use tracing::debug;

/// What a settled refresh hands to every participant
pub type RefreshOutcome = Result<TokenPair, RefreshFailure>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    pending: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// Owner of the refresh-in-progress flag and the pending-request queue
#[derive(Default)]
pub struct SessionCoordinator {
    state: Mutex<RefreshState>,
}

/// Result of asking to refresh
pub enum RefreshTicket<'a> {
    /// No refresh was running; the holder must perform it and settle
    Leader(RefreshGuard<'a>),
    /// A refresh is already running; wait for its outcome
    Follower(PendingRefresh),
}

impl SessionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the refresh, or join the queue behind the one in flight
    pub fn begin_refresh(&self) -> RefreshTicket<'_> {
        let mut state = self.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.pending.push_back(tx);
            debug!(queued = state.pending.len(), "Refresh in flight, queueing request");
            RefreshTicket::Follower(PendingRefresh { rx })
        } else {
            state.refreshing = true;
            RefreshTicket::Leader(RefreshGuard {
                coordinator: self,
                settled: false,
            })
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Number of requests waiting on the current refresh
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    fn settle(&self, outcome: &RefreshOutcome) {
        // Flag and queue are released together so no request can queue
        // behind a refresh that has already delivered its outcome.
        let pending = {
            let mut state = self.lock();
            state.refreshing = false;
            std::mem::take(&mut state.pending)
        };

        debug!(
            waiters = pending.len(),
            success = outcome.is_ok(),
            "Refresh settled"
        );
        for waiter in pending {
            // A waiter that went away no longer cares
            let _ = waiter.send(outcome.clone());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Leadership of the in-flight refresh.
///
/// Dropping the guard without calling [`RefreshGuard::settle`] fails every
/// queued request and clears the flag.
pub struct RefreshGuard<'a> {
    coordinator: &'a SessionCoordinator,
    settled: bool,
}

impl RefreshGuard<'_> {
    /// Release the flag and hand `outcome` to every queued request
    pub fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.settle(&Err(RefreshFailure::abandoned()));
        }
    }
}

/// A place in the queue behind an in-flight refresh
pub struct PendingRefresh {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl PendingRefresh {
    pub async fn wait(self) -> RefreshOutcome {
        self.rx
            .await
            .unwrap_or_else(|_| Err(RefreshFailure::abandoned()))
    }
}
