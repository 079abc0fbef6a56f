//! Cooperative cancellation.
//!
//! A `CancelSource` owns the right to cancel; the `CancelToken`s it hands
//! out only observe. Cancellation settles once: the first reason sticks and
//! later `cancel` calls are ignored. The executor never polls a token, it
//! awaits `cancelled()` alongside the request outcome.

use std::fmt;

use tokio::sync::watch;

/// Reason a request was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancel {
    pub message: Option<String>,
}

impl fmt::Display for Cancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message.as_deref().unwrap_or("canceled"))
    }
}

impl std::error::Error for Cancel {}

impl Cancel {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Observer half of a cancellation signal.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<Option<Cancel>>,
}

impl CancelToken {
    /// The reason, if cancellation has already happened.
    pub fn reason(&self) -> Option<Cancel> {
        self.rx.borrow().clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// `Err` with the reason once cancelled.
    pub fn throw_if_requested(&self) -> Result<(), Cancel> {
        match self.reason() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    /// Resolve with the reason when the token is cancelled.
    ///
    /// Never resolves if the source is dropped without cancelling.
    pub async fn cancelled(&self) -> Cancel {
        let mut rx = self.rx.clone();
        loop {
            if let Some(reason) = rx.borrow_and_update().clone() {
                return reason;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("reason", &self.reason())
            .finish()
    }
}

/// Owner half of a cancellation signal.
pub struct CancelSource {
    tx: watch::Sender<Option<Cancel>>,
    token: CancelToken,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self {
            tx,
            token: CancelToken { rx },
        }
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Cancel with `message`. Returns `false` if already cancelled.
    pub fn cancel(&self, message: impl Into<String>) -> bool {
        let reason = Cancel::new(message);
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(reason);
            true
        })
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelSource")
            .field("token", &self.token)
            .finish()
    }
}
