//! One-shot result cell shared by racing listeners.
//!
//! Several listeners (load, error, timeout, cancellation) may each try to
//! finish the same request. The first `settle` delivers its outcome; every
//! later call is a no-op and reports `false`.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

pub(crate) struct Settlement<R> {
    slot: Arc<Mutex<Option<oneshot::Sender<R>>>>,
}

impl<R> Clone for Settlement<R> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

/// Create a cell and the receiver its single outcome is delivered to.
pub(crate) fn settlement<R>() -> (Settlement<R>, oneshot::Receiver<R>) {
    let (tx, rx) = oneshot::channel();
    let cell = Settlement {
        slot: Arc::new(Mutex::new(Some(tx))),
    };
    (cell, rx)
}

impl<R> Settlement<R> {
    /// Deliver `outcome` if nothing has been delivered yet.
    pub(crate) fn settle(&self, outcome: R) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            // A dropped receiver means the caller stopped waiting; the
            // request still counts as settled.
            Some(tx) => {
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
