//! Error handling and exit codes.

use taskbatch_core::constants::exit_codes;

/// Run-level failures that map to a specific exit code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{timed_out} task(s) did not finish before the bounded wait")]
    TimedOut { timed_out: usize },

    #[error("interrupted")]
    Cancelled,
}

/// Exit code for whatever error ended the run.
///
/// Task faults never reach here: they are part of the batch report.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AppError>() {
        Some(AppError::Config(_)) => exit_codes::ERROR_CONFIG,
        Some(AppError::TimedOut { .. }) => exit_codes::ERROR_TIMEOUT,
        Some(AppError::Cancelled) => exit_codes::ERROR_CANCELED,
        None => exit_codes::ERROR_GENERIC,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_error_codes() {
        assert_eq!(exit_code(&AppError::Config("x".into()).into()), 4);
        assert_eq!(exit_code(&AppError::TimedOut { timed_out: 1 }.into()), 2);
        assert_eq!(exit_code(&AppError::Cancelled.into()), 130);
        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);

        let wrapped = anyhow::Error::from(AppError::Config("x".into())).context("while starting");
        assert_eq!(exit_code(&wrapped), 4);
    }
}
