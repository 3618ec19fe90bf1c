//! Completion coordinator (countdown latch).
//!
//! Tracks how many dispatched tasks are still outstanding. Each task reports
//! exactly once; the report that brings the count to zero signals the
//! waiting driver.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tracing::{debug, error};

use crate::event::AutoResetEvent;

/// Error returned when more tasks report than were dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("completion reported after all {initial} tasks were done")]
pub struct OverReported {
    pub initial: usize,
}

/// Countdown latch with auto-reset wake-up.
#[derive(Debug)]
pub struct Coordinator {
    initial: AtomicUsize,
    outstanding: AtomicUsize,
    all_done: AutoResetEvent,
}

impl Coordinator {
    /// Coordinator for a batch of `n` tasks. A batch of zero is already done.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            initial: AtomicUsize::new(n),
            outstanding: AtomicUsize::new(n),
            all_done: AutoResetEvent::new(n == 0),
        }
    }

    /// Record one finished task.
    ///
    /// Returns `Ok(true)` for the report that completed the batch. The
    /// decrement is a single atomic update and never goes below zero.
    pub fn report_done(&self) -> Result<bool, OverReported> {
        let previous = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map_err(|_| {
                let err = OverReported {
                    initial: self.initial(),
                };
                error!(%err, "Coordinator over-reported");
                err
            })?;

        debug!(outstanding = previous - 1, "Task reported done");
        if previous == 1 {
            self.all_done.set();
            return Ok(true);
        }
        Ok(false)
    }

    /// Block until every task has reported.
    pub fn wait_for_all(&self) {
        self.all_done.wait();
    }

    /// Block until every task has reported or `timeout` elapses.
    ///
    /// Returns `true` when the batch completed.
    pub fn wait_for_all_timeout(&self, timeout: Duration) -> bool {
        self.all_done.wait_timeout(timeout)
    }

    /// Tasks that have not reported yet.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Batch size the coordinator was created or last reset with.
    #[must_use]
    pub fn initial(&self) -> usize {
        self.initial.load(Ordering::Acquire)
    }

    /// Re-arm for a new batch of `n` tasks, discarding any stale signal.
    ///
    /// Must not be called while tasks of the previous batch can still report.
    pub fn reset(&self, n: usize) {
        self.all_done.reset();
        self.initial.store(n, Ordering::Release);
        self.outstanding.store(n, Ordering::Release);
        if n == 0 {
            self.all_done.set();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counts_down_and_signals_once() {
        let coord = Coordinator::new(3);
        assert_eq!(coord.report_done(), Ok(false));
        assert_eq!(coord.report_done(), Ok(false));
        assert_eq!(coord.report_done(), Ok(true));
        assert_eq!(coord.outstanding(), 0);
        assert!(coord.wait_for_all_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn empty_batch_is_already_done() {
        let coord = Coordinator::new(0);
        assert!(coord.wait_for_all_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn max_timeout_does_not_overflow() {
        let coord = Coordinator::new(1);
        coord.report_done().unwrap();
        assert!(coord.wait_for_all_timeout(Duration::MAX));
    }

    #[test]
    fn over_report_is_rejected() {
        let coord = Coordinator::new(1);
        assert_eq!(coord.report_done(), Ok(true));
        assert_eq!(coord.report_done(), Err(OverReported { initial: 1 }));
        assert_eq!(coord.outstanding(), 0);
    }

    #[test]
    fn wait_times_out_while_outstanding() {
        let coord = Coordinator::new(2);
        coord.report_done().unwrap();
        assert!(!coord.wait_for_all_timeout(Duration::from_millis(20)));
        assert_eq!(coord.outstanding(), 1);
    }

    #[test]
    fn wake_is_consumed() {
        let coord = Coordinator::new(1);
        coord.report_done().unwrap();
        coord.wait_for_all();
        assert!(!coord.wait_for_all_timeout(Duration::from_millis(20)));
    }

    #[test]
    fn reset_starts_clean_batch() {
        let coord = Coordinator::new(1);
        coord.report_done().unwrap();
        coord.reset(2);
        assert_eq!(coord.initial(), 2);
        assert_eq!(coord.outstanding(), 2);
        assert!(!coord.wait_for_all_timeout(Duration::from_millis(10)));
        coord.report_done().unwrap();
        coord.report_done().unwrap();
        assert!(coord.wait_for_all_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn concurrent_reports_lose_nothing() {
        let n = 64;
        let coord = Arc::new(Coordinator::new(n));
        let handles: Vec<_> = (0..n)
            .map(|_| {
                let c = Arc::clone(&coord);
                std::thread::spawn(move || c.report_done().unwrap())
            })
            .collect();
        let finals = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&last| last)
            .count();

        assert_eq!(finals, 1);
        assert!(coord.wait_for_all_timeout(Duration::from_secs(5)));
        assert_eq!(coord.outstanding(), 0);
    }
}
