//! Constants for delays, timeouts and exit codes.

use std::time::Duration;

/// Default simulated work delay in milliseconds.
pub const DEFAULT_DELAY_MS: u64 = 1000;

/// Delays below this many milliseconds fall back to [`DEFAULT_DELAY_MS`].
pub const MIN_DELAY_MS: u64 = 100;

/// Default bound on the driver's first wait for a batch.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on the second wait, after cancellation was requested.
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Upper bound accepted for either bounded wait.
pub const MAX_WAIT: Duration = Duration::from_secs(24 * 3600);

/// How often cancellable sleeps poll their token.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Largest amount a single deposit or withdrawal may move.
pub const MAX_TRANSACTION_AMOUNT: f64 = 10_000.0;

/// Process exit codes.
pub mod exit_codes {
    /// Generic error.
    pub const ERROR_GENERIC: i32 = 1;
    /// At least one task did not finish before the bounded wait.
    pub const ERROR_TIMEOUT: i32 = 2;
    /// Invalid configuration.
    pub const ERROR_CONFIG: i32 = 4;
    /// Run cancelled by user (Ctrl+C).
    pub const ERROR_CANCELED: i32 = 130;
}
