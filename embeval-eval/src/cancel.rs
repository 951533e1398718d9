//! Cooperative cancellation for sweeps and single evaluations.
//!
//! A [`CancelToken`] is created per invocation and passed into the
//! orchestrator — its lifecycle is scoped to one sweep, never process-wide.
//! The evaluator checks it between suspension points; dropping the event
//! stream also aborts work at the next yield.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::EvalError;

/// A cloneable cancellation token.
///
/// Cancelling is idempotent and observed by all clones.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// Create a new, un-cancelled token.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { inner: Arc::new(tx) }
    }

    /// Request cancellation. All clones observe the change.
    pub fn cancel(&self) {
        self.inner.send_replace(true);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.inner.borrow()
    }

    /// Return `Err(EvalError::Cancelled)` if cancellation has been
    /// requested; used as a checkpoint between suspension points.
    pub fn check(&self) -> Result<(), EvalError> {
        if self.is_cancelled() { Err(EvalError::Cancelled) } else { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_cancellation() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        assert!(clone.check().is_ok());

        token.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(clone.check(), Err(EvalError::Cancelled)));
    }
}
