//! Batch options and configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CANCEL_GRACE, DEFAULT_DELAY_MS, DEFAULT_JOIN_TIMEOUT, MIN_DELAY_MS,
};

/// How worker tasks are put on threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dispatch {
    /// One dedicated OS thread per task.
    #[default]
    Threads,
    /// Tasks queued onto a shared thread pool.
    Pool,
}

/// Options for running a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Simulated work delay given to each calculator.
    pub delay: Duration,
    /// First bounded wait for the whole batch.
    pub join_timeout: Duration,
    /// Second bounded wait after cancellation was requested.
    pub cancel_grace: Duration,
    /// Dispatch mode.
    pub dispatch: Dispatch,
    /// Pool size for [`Dispatch::Pool`] (0 = available parallelism).
    pub pool_threads: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            cancel_grace: DEFAULT_CANCEL_GRACE,
            dispatch: Dispatch::Threads,
            pool_threads: 0,
        }
    }
}

impl Options {
    /// Normalize options, applying defaults where values are zero or too small.
    ///
    /// A delay below [`MIN_DELAY_MS`] is replaced by the default delay.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        if self.delay < Duration::from_millis(MIN_DELAY_MS) {
            self.delay = Duration::from_millis(DEFAULT_DELAY_MS);
        }
        if self.join_timeout.is_zero() {
            self.join_timeout = DEFAULT_JOIN_TIMEOUT;
        }
        if self.cancel_grace.is_zero() {
            self.cancel_grace = DEFAULT_CANCEL_GRACE;
        }
        if self.pool_threads == 0 {
            self.pool_threads = std::thread::available_parallelism().map_or(4, usize::from);
        }
        self
    }

    /// Delay from an optional millisecond argument, defaulted when absent or
    /// below the floor.
    #[must_use]
    pub fn delay_from_arg(ms: Option<u64>) -> Duration {
        match ms {
            Some(ms) if ms >= MIN_DELAY_MS => Duration::from_millis(ms),
            _ => Duration::from_millis(DEFAULT_DELAY_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let opts = Options::default();
        assert_eq!(opts.delay, Duration::from_millis(DEFAULT_DELAY_MS));
        assert_eq!(opts.join_timeout, DEFAULT_JOIN_TIMEOUT);
        assert_eq!(opts.cancel_grace, DEFAULT_CANCEL_GRACE);
        assert_eq!(opts.dispatch, Dispatch::Threads);
    }

    #[test]
    fn normalize_zero_and_small_values() {
        let opts = Options {
            delay: Duration::from_millis(MIN_DELAY_MS - 1),
            join_timeout: Duration::ZERO,
            cancel_grace: Duration::ZERO,
            dispatch: Dispatch::Pool,
            pool_threads: 0,
        }
        .normalize();
        assert_eq!(opts.delay, Duration::from_millis(DEFAULT_DELAY_MS));
        assert_eq!(opts.join_timeout, DEFAULT_JOIN_TIMEOUT);
        assert_eq!(opts.cancel_grace, DEFAULT_CANCEL_GRACE);
        assert!(opts.pool_threads >= 1);
    }

    #[test]
    fn normalize_keeps_valid_values() {
        let opts = Options {
            delay: Duration::from_millis(MIN_DELAY_MS),
            join_timeout: Duration::from_millis(250),
            cancel_grace: Duration::from_millis(50),
            dispatch: Dispatch::Threads,
            pool_threads: 3,
        }
        .normalize();
        assert_eq!(opts.delay, Duration::from_millis(MIN_DELAY_MS));
        assert_eq!(opts.join_timeout, Duration::from_millis(250));
        assert_eq!(opts.pool_threads, 3);
    }

    #[test]
    fn delay_argument_floor() {
        assert_eq!(
            Options::delay_from_arg(None),
            Duration::from_millis(DEFAULT_DELAY_MS)
        );
        assert_eq!(
            Options::delay_from_arg(Some(5)),
            Duration::from_millis(DEFAULT_DELAY_MS)
        );
        assert_eq!(
            Options::delay_from_arg(Some(250)),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn dispatch_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Dispatch::Pool).unwrap(), "\"pool\"");
    }
}
