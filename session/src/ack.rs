//! Ack tracking for optimistic object creation.
//!
//! DESIGN
//! ======
//! Every locally created object is applied immediately and broadcast with
//! its id; the server later answers with a per-object ack or error. The
//! tracker pairs each in-flight id with a oneshot waiter and an abortable
//! timeout timer, so exactly one outcome is ever delivered:
//!
//! - server ack            -> `Confirmed`
//! - server error          -> `Errored`
//! - timer fires first     -> `TimedOut`
//! - connection drops      -> `Disconnected` (all pending at once)
//! - same id re-tracked    -> `Superseded` (old waiter only)
//!
//! Timers are real tokio sleeps; tests drive them with a paused clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, warn};
use wire::ObjectId;

#[cfg(test)]
#[path = "ack_test.rs"]
mod tests;

/// Final disposition of one tracked object creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    /// Server accepted the object.
    Confirmed,
    /// Server rejected the object with a message.
    Errored(String),
    /// No answer within the configured window.
    TimedOut,
    /// Connection dropped while waiting.
    Disconnected,
    /// A newer waiter was registered for the same id.
    Superseded,
}

struct Pending {
    notify: oneshot::Sender<AckOutcome>,
    timer: AbortHandle,
}

/// Shared tracker of in-flight object creations. Cheap to clone.
#[derive(Clone)]
pub struct AckTracker {
    inner: Arc<Mutex<HashMap<ObjectId, Pending>>>,
    timeout: Duration,
}

impl AckTracker {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), timeout }
    }

    /// Register an id and receive its eventual outcome.
    ///
    /// Must be called from within a tokio runtime (spawns the timeout
    /// timer). Re-tracking an id supersedes the previous waiter.
    pub fn track(&self, id: ObjectId) -> oneshot::Receiver<AckOutcome> {
        let (tx, rx) = oneshot::channel();

        let tracker = self.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(tracker.timeout).await;
            if tracker.settle(id, AckOutcome::TimedOut) {
                warn!(%id, "object creation ack timed out");
            }
        })
        .abort_handle();

        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = inner.insert(id, Pending { notify: tx, timer }) {
            debug!(%id, "re-tracked object, superseding previous waiter");
            previous.timer.abort();
            let _ = previous.notify.send(AckOutcome::Superseded);
        }
        rx
    }

    /// Server acked the object.
    pub fn confirm(&self, id: ObjectId) {
        if !self.settle(id, AckOutcome::Confirmed) {
            debug!(%id, "ack for untracked object, ignoring");
        }
    }

    /// Server rejected the object.
    pub fn fail(&self, id: ObjectId, message: String) {
        if !self.settle(id, AckOutcome::Errored(message)) {
            debug!(%id, "error for untracked object, ignoring");
        }
    }

    /// Resolve every pending waiter with `Disconnected`.
    pub fn reject_all(&self) {
        let drained: Vec<(ObjectId, Pending)> = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.drain().collect()
        };
        for (id, pending) in drained {
            debug!(%id, "rejecting pending ack on disconnect");
            pending.timer.abort();
            let _ = pending.notify.send(AckOutcome::Disconnected);
        }
    }

    /// Number of creations still waiting for an answer.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Remove and resolve one waiter. Returns whether the id was tracked.
    fn settle(&self, id: ObjectId, outcome: AckOutcome) -> bool {
        let pending = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.remove(&id)
        };
        match pending {
            Some(p) => {
                p.timer.abort();
                let _ = p.notify.send(outcome);
                true
            }
            None => false,
        }
    }
}
