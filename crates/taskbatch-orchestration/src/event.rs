//! Auto-reset event.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A signal that releases one waiter and then re-arms itself.
///
/// Setting an event that is already set has no further effect, so any number
/// of `set` calls before a wait release exactly one `wait`.
#[derive(Debug, Default)]
pub struct AutoResetEvent {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl AutoResetEvent {
    #[must_use]
    pub fn new(initially_set: bool) -> Self {
        Self {
            signaled: Mutex::new(initially_set),
            cond: Condvar::new(),
        }
    }

    /// Signal the event, waking one waiter if any.
    pub fn set(&self) {
        let mut signaled = self.signaled.lock();
        *signaled = true;
        self.cond.notify_one();
    }

    /// Clear the signal without waking anyone.
    pub fn reset(&self) {
        *self.signaled.lock() = false;
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.signaled.lock()
    }

    /// Block until signaled, consuming the signal.
    pub fn wait(&self) {
        let mut signaled = self.signaled.lock();
        while !*signaled {
            self.cond.wait(&mut signaled);
        }
        *signaled = false;
    }

    /// Block until signaled or `timeout` elapses.
    ///
    /// Returns `true` if the signal was consumed. A timeout too large to form
    /// a deadline waits without bound.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };
        let mut signaled = self.signaled.lock();
        while !*signaled {
            if self.cond.wait_until(&mut signaled, deadline).timed_out() {
                break;
            }
        }
        let consumed = *signaled;
        *signaled = false;
        consumed
    }
}
