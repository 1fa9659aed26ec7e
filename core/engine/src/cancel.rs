//! Cooperative cancellation for script calls.

use crate::error::{ErrorKind, RuntimeError};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// A cloneable cancellation handle polled by the interpreter's step gate.
///
/// The token is observed between AST nodes and between iteration-callback
/// rounds, so cancellation latency is bounded by the cost of a single
/// builtin invocation. Cloning is cheap; all clones share one flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Creates a token that never fires unless [`cancel`](Self::cancel) is
    /// called.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that also fires once `timeout` has elapsed.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Requests cancellation. Takes effect at the next step.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested (deadline not considered).
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns the cancellation error if the token has fired.
    pub(crate) fn check(&self) -> Result<(), RuntimeError> {
        if self.cancelled.load(Ordering::Acquire) {
            return Err(RuntimeError::new(ErrorKind::Runtime, "context cancelled"));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(RuntimeError::new(ErrorKind::Runtime, "deadline exceeded"));
            }
        }
        Ok(())
    }
}
