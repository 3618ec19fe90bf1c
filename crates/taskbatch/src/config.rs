//! Application configuration from CLI flags and environment.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use taskbatch_cli::presenter::OutputMode;
use taskbatch_core::constants::MAX_WAIT;
use taskbatch_core::options::{Dispatch, Options};

use crate::errors::AppError;

/// taskbatch — run a fixed batch of worker tasks and collect every result.
#[derive(Parser, Debug)]
#[command(name = "taskbatch", version, about)]
#[allow(clippy::struct_excessive_bools)]
pub struct AppConfig {
    #[command(subcommand)]
    pub command: Command,

    /// First bounded wait for the batch (e.g. "5s", "500ms", "1m").
    #[arg(long, global = true, default_value = "5s", env = "TASKBATCH_TIMEOUT")]
    pub timeout: String,

    /// Second bounded wait after cancellation was requested.
    #[arg(long, global = true, default_value = "5s", env = "TASKBATCH_GRACE")]
    pub grace: String,

    /// How tasks are put on threads.
    #[arg(
        long,
        global = true,
        value_enum,
        default_value = "threads",
        env = "TASKBATCH_DISPATCH"
    )]
    pub dispatch: DispatchArg,

    /// Pool size for `--dispatch pool` (0 = available parallelism).
    #[arg(long, global = true, default_value = "0", env = "TASKBATCH_POOL_THREADS")]
    pub pool_threads: usize,

    /// Emit results as JSON on stdout.
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub json: bool,

    /// Quiet mode (only output values).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output: debug logging, task timings and progress.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Demo scenarios.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Two tasks raising a to the power b.
    Power {
        #[command(flatten)]
        delay: DelayArg,
    },

    /// A withdrawal that breaks the account's overdraft rule.
    Overdraft {
        #[command(flatten)]
        delay: DelayArg,

        /// Starting balance.
        #[arg(long, default_value_t = 100.0)]
        balance: f64,

        /// Amount to withdraw.
        #[arg(long, default_value_t = 150.0)]
        amount: f64,

        /// How far below zero the account may go.
        #[arg(long, default_value_t = 0.0)]
        overdraft_limit: f64,
    },

    /// Many tasks, one of which stalls past the bounded wait.
    Batch {
        #[command(flatten)]
        delay: DelayArg,

        /// Number of tasks.
        #[arg(long, default_value_t = 10, env = "TASKBATCH_TASKS")]
        tasks: usize,

        /// Index of the stalled task (default: the last one).
        #[arg(long)]
        stall: Option<usize>,

        /// Run without a stalled task.
        #[arg(long, conflicts_with = "stall")]
        no_stall: bool,
    },

    /// Invoke every calculator operation through one ordered callback list.
    Multicast {
        /// First operand.
        #[arg(default_value_t = 6.0, allow_negative_numbers = true)]
        a: f64,

        /// Second operand.
        #[arg(default_value_t = 3.0, allow_negative_numbers = true)]
        b: f64,

        /// Remove an operation from the list before invoking (repeatable).
        #[arg(long, value_name = "NAME")]
        unsubscribe: Vec<String>,
    },

    /// Parse the built-in tab-separated ledger, skipping malformed records.
    Ledger,
}

/// Positional work delay shared by the timed scenarios.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct DelayArg {
    /// Simulated work per task in milliseconds (below 100 uses the default of 1000).
    #[arg(value_name = "DELAY_MS", env = "TASKBATCH_DELAY_MS")]
    pub delay_ms: Option<u64>,
}

/// Dispatch mode as accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchArg {
    Threads,
    Pool,
}

impl From<DispatchArg> for Dispatch {
    fn from(arg: DispatchArg) -> Self {
        match arg {
            DispatchArg::Threads => Dispatch::Threads,
            DispatchArg::Pool => Dispatch::Pool,
        }
    }
}

impl AppConfig {
    /// Parse CLI arguments.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Positional delay of the selected scenario, if it takes one.
    #[must_use]
    pub fn delay_ms(&self) -> Option<u64> {
        match &self.command {
            Command::Power { delay }
            | Command::Overdraft { delay, .. }
            | Command::Batch { delay, .. } => delay.delay_ms,
            Command::Multicast { .. } | Command::Ledger => None,
        }
    }

    /// Batch options from the flags, normalized.
    pub fn options(&self) -> Result<Options, AppError> {
        let join_timeout = bounded_wait("--timeout", &self.timeout)?;
        let cancel_grace = bounded_wait("--grace", &self.grace)?;

        Ok(Options {
            delay: Options::delay_from_arg(self.delay_ms()),
            join_timeout,
            cancel_grace,
            dispatch: self.dispatch.into(),
            pool_threads: self.pool_threads,
        }
        .normalize())
    }

    #[must_use]
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Human
        }
    }
}

fn bounded_wait(flag: &str, value: &str) -> Result<Duration, AppError> {
    let wait = parse_duration(value)
        .ok_or_else(|| AppError::Config(format!("invalid {flag} {value:?}")))?;
    if wait > MAX_WAIT {
        return Err(AppError::Config(format!(
            "{flag} {value:?} exceeds the maximum of {}h",
            MAX_WAIT.as_secs() / 3600
        )));
    }
    Ok(wait)
}

/// Parse a duration string like "5m", "1h", "30s", "250ms".
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        let n: u64 = ms.parse().ok()?;
        Some(Duration::from_millis(n))
    } else if let Some(mins) = s.strip_suffix('m') {
        let n: u64 = mins.parse().ok()?;
        Some(Duration::from_secs(n.checked_mul(60)?))
    } else if let Some(hours) = s.strip_suffix('h') {
        let n: u64 = hours.parse().ok()?;
        Some(Duration::from_secs(n.checked_mul(3600)?))
    } else if let Some(secs) = s.strip_suffix('s') {
        let n: u64 = secs.parse().ok()?;
        Some(Duration::from_secs(n))
    } else {
        let n: u64 = s.parse().ok()?;
        Some(Duration::from_secs(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AppConfig {
        AppConfig::try_parse_from(std::iter::once("taskbatch").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn parse_duration_formats() {
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("7"), Some(Duration::from_secs(7)));
    }

    #[test]
    fn parse_duration_ms() {
        assert_eq!(parse_duration("1ms"), Some(Duration::from_millis(1)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("-5s"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn delay_defaults_and_floor() {
        let cfg = parse(&["power"]);
        assert_eq!(cfg.options().unwrap().delay, Duration::from_millis(1000));

        let cfg = parse(&["power", "250"]);
        assert_eq!(cfg.options().unwrap().delay, Duration::from_millis(250));

        let cfg = parse(&["power", "20"]);
        assert_eq!(cfg.options().unwrap().delay, Duration::from_millis(1000));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cfg = parse(&["batch", "100", "--timeout", "300ms", "--dispatch", "pool", "--json"]);
        let opts = cfg.options().unwrap();
        assert_eq!(opts.join_timeout, Duration::from_millis(300));
        assert_eq!(opts.dispatch, Dispatch::Pool);
        assert!(opts.pool_threads > 0);
        assert_eq!(cfg.output_mode(), OutputMode::Json);
    }

    #[test]
    fn invalid_timeout_is_config_error() {
        let cfg = parse(&["power", "--timeout", "later"]);
        assert!(matches!(cfg.options(), Err(AppError::Config(_))));
    }

    #[test]
    fn oversized_waits_are_config_errors() {
        let cfg = parse(&["power", "--timeout", "18446744073709551615"]);
        assert!(matches!(cfg.options(), Err(AppError::Config(m)) if m.contains("--timeout")));

        let cfg = parse(&["power", "--grace", "25h"]);
        assert!(matches!(cfg.options(), Err(AppError::Config(m)) if m.contains("--grace")));

        let cfg = parse(&["power", "--timeout", "24h"]);
        assert_eq!(cfg.options().unwrap().join_timeout, MAX_WAIT);
    }

    #[test]
    fn batch_arguments() {
        let cfg = parse(&["batch", "--tasks", "4", "--stall", "2"]);
        match cfg.command {
            Command::Batch {
                tasks,
                stall,
                no_stall,
                ..
            } => {
                assert_eq!(tasks, 4);
                assert_eq!(stall, Some(2));
                assert!(!no_stall);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn multicast_operands_and_unsubscribe() {
        let cfg = parse(&["multicast", "2", "-4", "--unsubscribe", "power"]);
        match cfg.command {
            Command::Multicast { a, b, unsubscribe } => {
                assert!((a - 2.0).abs() < f64::EPSILON);
                assert!((b + 4.0).abs() < f64::EPSILON);
                assert_eq!(unsubscribe, vec!["power".to_string()]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn json_conflicts_with_quiet() {
        let res = AppConfig::try_parse_from(["taskbatch", "ledger", "--json", "--quiet"]);
        assert!(res.is_err());
    }
}
