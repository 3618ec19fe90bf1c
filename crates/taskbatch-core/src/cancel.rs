//! Cooperative cancellation.
//!
//! Workers are never killed. A stalled task is asked to stop by cancelling
//! its token; the computation observes the request the next time it polls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::calculator::TaskError;
use crate::constants::CANCEL_POLL_INTERVAL;

/// Cooperative cancellation token using atomic bools.
///
/// Clones share the same flag. A token made with [`CancellationToken::child`]
/// is cancelled when it or any of its ancestors is cancelled, while
/// cancelling the child leaves the parent untouched.
///
/// # Example
/// ```
/// use taskbatch_core::cancel::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// assert!(token.check_cancelled().is_err());
/// ```
#[derive(Clone, Debug)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    ancestors: Vec<Arc<AtomicBool>>,
}

impl CancellationToken {
    /// Create a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            ancestors: Vec::new(),
        }
    }

    /// Derive a token that also observes this one.
    #[must_use]
    pub fn child(&self) -> Self {
        let mut ancestors = self.ancestors.clone();
        ancestors.push(Arc::clone(&self.cancelled));
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            ancestors,
        }
    }

    /// Check if cancellation has been requested on this token or an ancestor.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
            || self.ancestors.iter().any(|a| a.load(Ordering::Acquire))
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check for cancellation, returning an error if cancelled.
    pub fn check_cancelled(&self) -> Result<(), TaskError> {
        if self.is_cancelled() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleep for `total`, waking every [`CANCEL_POLL_INTERVAL`] to poll `cancel`.
///
/// Returns `Err(TaskError::Cancelled)` as soon as cancellation is observed.
/// A `total` too large to form a deadline sleeps until cancelled.
///
/// ```
/// use std::time::Duration;
/// use taskbatch_core::cancel::{sleep_cancellable, CancellationToken};
///
/// let token = CancellationToken::new();
/// token.cancel();
/// assert!(sleep_cancellable(&token, Duration::from_secs(60)).is_err());
/// ```
pub fn sleep_cancellable(cancel: &CancellationToken, total: Duration) -> Result<(), TaskError> {
    let deadline = Instant::now().checked_add(total);
    loop {
        cancel.check_cancelled()?;
        let remaining = match deadline {
            Some(d) => d.saturating_duration_since(Instant::now()),
            None => CANCEL_POLL_INTERVAL,
        };
        if remaining.is_zero() {
            return Ok(());
        }
        std::thread::sleep(remaining.min(CANCEL_POLL_INTERVAL));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn check_cancelled_err() {
        let token = CancellationToken::new();
        assert!(token.check_cancelled().is_ok());
        token.cancel();
        assert_eq!(token.check_cancelled(), Err(TaskError::Cancelled));
    }

    #[test]
    fn cancellation_propagates_through_clone() {
        let token1 = CancellationToken::new();
        let token2 = token1.clone();
        token1.cancel();
        assert!(token2.is_cancelled());
    }

    #[test]
    fn child_observes_parent_but_not_reverse() {
        let parent = CancellationToken::new();
        let child = parent.child();
        let grandchild = child.child();

        child.cancel();
        assert!(!parent.is_cancelled());
        assert!(grandchild.is_cancelled());

        let other = parent.child();
        assert!(!other.is_cancelled());
        parent.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn sleep_cancellable_completes() {
        let token = CancellationToken::new();
        let start = Instant::now();
        assert!(sleep_cancellable(&token, Duration::from_millis(30)).is_ok());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn sleep_cancellable_stops_early() {
        let token = CancellationToken::new();
        let remote = token.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let start = Instant::now();
        let result = sleep_cancellable(&token, Duration::from_secs(30));
        canceller.join().unwrap();

        assert_eq!(result, Err(TaskError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn sleep_cancellable_unbounded_until_cancelled() {
        let token = CancellationToken::new();
        let remote = token.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        assert_eq!(
            sleep_cancellable(&token, Duration::MAX),
            Err(TaskError::Cancelled)
        );
        canceller.join().unwrap();
    }
}
