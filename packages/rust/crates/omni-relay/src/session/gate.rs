//! Per-session gate for the foreground phase of a question.
//!
//! Context build, staleness purge and pending-turn append run under the gate so two
//! questions of one session never interleave them. Completion calls run outside it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Async lock keyed by session id. Idle sessions leave no entry behind.
#[derive(Clone, Default)]
pub struct SessionGate {
    locks: LockMap,
}

/// Exclusive hold on one session; released on drop.
pub struct SessionGuard {
    held: Option<OwnedMutexGuard<()>>,
    lock: Arc<Mutex<()>>,
    session_id: String,
    locks: LockMap,
}

impl SessionGate {
    /// Wait until no other holder of `session_id` remains.
    pub async fn acquire(&self, session_id: &str) -> SessionGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(session_id.to_string()).or_default())
        };
        let held = Arc::clone(&lock).lock_owned().await;
        SessionGuard {
            held: Some(held),
            lock,
            session_id: session_id.to_string(),
            locks: Arc::clone(&self.locks),
        }
    }

    #[doc(hidden)]
    pub fn active_sessions(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(self.held.take());
        // Map entry + this guard: no waiter holds a clone.
        let idle = Arc::strong_count(&self.lock) == 2
            && locks
                .get(&self.session_id)
                .is_some_and(|current| Arc::ptr_eq(current, &self.lock));
        if idle {
            locks.remove(&self.session_id);
        }
    }
}
