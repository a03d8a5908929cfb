//! Cooperative cancellation
//!
//! A `CancelHandle` stays with the caller; the run holds a `CancelToken`.
//! The swarm checks the token at the top of each turn only, so an in-flight
//! turn always finishes before the run stops.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    reason: Mutex<Option<String>>,
}

/// Caller side: requests cancellation
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token to pass into `Swarm::run_with_cancel`
    pub fn token(&self) -> CancelToken {
        CancelToken {
            state: Arc::clone(&self.state),
        }
    }

    /// Request cancellation; the first reason wins
    pub fn cancel(&self, reason: impl Into<String>) {
        {
            let mut slot = self.state.reason.lock();
            if slot.is_none() {
                *slot = Some(reason.into());
            }
        }
        self.state.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }
}

/// Run side: observes cancellation
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    /// Token that is never cancelled
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<String> {
        self.state.reason.lock().clone()
    }
}
