//! Application entry point and scenario dispatch.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use tracing::{info, warn};

use taskbatch_cli::output::format_value;
use taskbatch_cli::presenter::{CLIResultPresenter, OutputMode};
use taskbatch_core::account::{Account, AccountKind, SharedAccount, Withdrawal};
use taskbatch_core::calculator::{
    Computation, ComplicatedCalculator, FnComputation, Operation, TaskError,
};
use taskbatch_core::calculator_multicast;
use taskbatch_core::cancel::{sleep_cancellable, CancellationToken};
use taskbatch_core::observer::ObserverSubject;
use taskbatch_core::observers::{ChannelObserver, LoggingObserver};
use taskbatch_core::options::Options;
use taskbatch_core::records::{parse_ledger, SAMPLE_LEDGER};
use taskbatch_core::task::{TaskEvent, TaskEventKind, TaskSpec};
use taskbatch_orchestration::interfaces::{BatchReport, ResultPresenter};
use taskbatch_orchestration::orchestrator::execute_batch_with_observer;
use taskbatch_orchestration::sink::OutputSink;

use crate::config::{AppConfig, Command};
use crate::errors::AppError;

/// Operand pairs for the power scenario.
pub const POWER_OPERANDS: [(f64, f64); 2] = [(10.4, 7.451), (18.7, 3.6)];

/// Work given to the stalled task in the batch scenario. It only ends early
/// through cancellation.
pub const STALL_DELAY: Duration = Duration::from_secs(3600);

const PROGRESS_CHANNEL_CAPACITY: usize = 256;
const PROGRESS_POLL: Duration = Duration::from_millis(50);

/// Everything a scenario needs to run and report.
pub struct Session {
    pub opts: Options,
    /// Root token, cancelled by Ctrl+C.
    pub cancel: CancellationToken,
    pub presenter: CLIResultPresenter,
    /// Where tasks and the driver write diagnostics.
    pub diagnostics: OutputSink,
    /// Print a line per finished task while the batch runs.
    pub progress: bool,
}

/// Run the application.
pub fn run(config: &AppConfig) -> Result<()> {
    let opts = config.options()?;
    let mode = config.output_mode();

    let stdout = OutputSink::stdout();
    let diagnostics = if mode == OutputMode::Human {
        stdout.clone()
    } else {
        OutputSink::stderr()
    };

    let cancel = CancellationToken::new();
    ctrlc_handler(cancel.clone());

    let session = Session {
        opts,
        cancel,
        presenter: CLIResultPresenter::new(stdout, mode, config.verbose),
        diagnostics,
        progress: config.verbose && mode == OutputMode::Human,
    };
    execute(&config.command, &session)
}

/// Run one scenario.
pub fn execute(command: &Command, session: &Session) -> Result<()> {
    info!(?command, delay = ?session.opts.delay, "Running scenario");
    match command {
        Command::Power { .. } => run_power(session),
        Command::Overdraft {
            balance,
            amount,
            overdraft_limit,
            ..
        } => run_overdraft(session, *balance, *amount, *overdraft_limit),
        Command::Batch {
            tasks,
            stall,
            no_stall,
            ..
        } => {
            let stall = if *no_stall {
                None
            } else {
                Some(stall.unwrap_or_else(|| tasks.saturating_sub(1)))
            };
            run_stalled_batch(session, *tasks, stall)
        }
        Command::Multicast { a, b, unsubscribe } => run_multicast(session, *a, *b, unsubscribe),
        Command::Ledger => {
            let ledger = parse_ledger(SAMPLE_LEDGER.as_bytes());
            session.presenter.present_ledger("Ledger", &ledger);
            Ok(())
        }
    }
}

fn run_power(session: &Session) -> Result<()> {
    let calc: Arc<dyn Computation> = Arc::new(ComplicatedCalculator::new(
        Operation::Power,
        session.opts.delay,
    ));
    let specs = POWER_OPERANDS
        .iter()
        .enumerate()
        .map(|(i, &(a, b))| TaskSpec::new(format!("power-{i}"), a, b, Arc::clone(&calc)))
        .collect();

    let report = run_batch(specs, session);
    session.presenter.present_batch("Power", &report);
    finish(&report, session)
}

fn run_overdraft(session: &Session, balance: f64, amount: f64, overdraft_limit: f64) -> Result<()> {
    let account: SharedAccount = Arc::new(Mutex::new(Account::new(
        1,
        "Demo checking",
        AccountKind::Checking { overdraft_limit },
        balance,
    )));

    let withdrawal = Withdrawal::new(Arc::clone(&account));
    let delay = session.opts.delay;
    let computation = FnComputation::new(
        "withdrawal",
        move |cancel: &CancellationToken, a: f64, b: f64| -> Result<f64, TaskError> {
            sleep_cancellable(cancel, delay)?;
            withdrawal.compute(cancel, a, b)
        },
    );
    let specs = vec![TaskSpec::new("withdraw", amount, 1.0, Arc::new(computation))];

    let report = run_batch(specs, session);
    session.presenter.present_batch("Overdraft", &report);

    let after = account.lock().balance();
    session.presenter.present_notice(&format!(
        "Balance after withdrawal attempt: {}",
        format_value(after)
    ));
    finish(&report, session)
}

fn run_stalled_batch(session: &Session, tasks: usize, stall: Option<usize>) -> Result<()> {
    if tasks == 0 {
        return Err(AppError::Config("--tasks must be at least 1".into()).into());
    }
    if let Some(index) = stall.filter(|&i| i >= tasks) {
        return Err(AppError::Config(format!(
            "--stall {index} is out of range for {tasks} task(s)"
        ))
        .into());
    }

    let report = run_batch(batch_specs(tasks, stall, session.opts.delay), session);
    session.presenter.present_batch("Batch", &report);
    finish(&report, session)
}

/// Specs for the batch scenario: operations cycle through every
/// [`Operation`]; the task at `stall` gets [`STALL_DELAY`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn batch_specs(tasks: usize, stall: Option<usize>, delay: Duration) -> Vec<TaskSpec> {
    (0..tasks)
        .map(|i| {
            let op = Operation::ALL[i % Operation::ALL.len()];
            let work = if stall == Some(i) { STALL_DELAY } else { delay };
            TaskSpec::new(
                format!("{}-{i}", op.name()),
                (i + 1) as f64,
                2.0,
                Arc::new(ComplicatedCalculator::new(op, work)),
            )
        })
        .collect()
}

fn run_multicast(session: &Session, a: f64, b: f64, unsubscribe: &[String]) -> Result<()> {
    let ops = calculator_multicast();
    for name in unsubscribe {
        if !ops.unsubscribe(name) {
            return Err(AppError::Config(format!(
                "no operation named {name:?}; expected one of {:?}",
                ops.names()
            ))
            .into());
        }
    }

    let results = ops.invoke_named(&(a, b));
    session.presenter.present_multicast("Multicast", (a, b), &results);
    Ok(())
}

fn run_batch(specs: Vec<TaskSpec>, session: &Session) -> BatchReport {
    let total = specs.len();
    let subject = Arc::new(ObserverSubject::new());
    subject.register(Arc::new(LoggingObserver::new()));

    let progress = if session.progress {
        let (tx, rx) = crossbeam_channel::bounded(PROGRESS_CHANNEL_CAPACITY);
        subject.register(Arc::new(ChannelObserver::new(tx)));
        ProgressPrinter::spawn(rx, session.diagnostics.clone(), total)
    } else {
        None
    };

    let report = execute_batch_with_observer(
        specs,
        &session.opts,
        &session.cancel,
        &session.diagnostics,
        subject,
    );

    if let Some(progress) = progress {
        progress.finish();
    }
    report
}

fn finish(report: &BatchReport, session: &Session) -> Result<()> {
    if session.cancel.is_cancelled() {
        return Err(AppError::Cancelled.into());
    }
    let timed_out = report.timed_out();
    if timed_out > 0 {
        return Err(AppError::TimedOut { timed_out }.into());
    }
    Ok(())
}

/// Background thread printing one line per finished task.
struct ProgressPrinter {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl ProgressPrinter {
    fn spawn(events: Receiver<TaskEvent>, sink: OutputSink, total: usize) -> Option<Self> {
        let stop = CancellationToken::new();
        let thread_stop = stop.clone();
        let spawned = std::thread::Builder::new()
            .name("progress".into())
            .spawn(move || {
                let mut finished = 0;
                let mut print = |event: &TaskEvent| {
                    if !event.is_terminal() {
                        return;
                    }
                    let outcome = if matches!(event.kind, TaskEventKind::Failed(_)) {
                        "failed"
                    } else {
                        "completed"
                    };
                    finished += 1;
                    let _ = sink.line(&format!(
                        "  progress: {finished}/{total} ({} {outcome})",
                        event.label
                    ));
                };

                loop {
                    match events.recv_timeout(PROGRESS_POLL) {
                        Ok(event) => print(&event),
                        Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) if thread_stop.is_cancelled() => {
                            for event in events.try_iter() {
                                print(&event);
                            }
                            break;
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                }
            });

        match spawned {
            Ok(handle) => Some(Self { stop, handle }),
            Err(e) => {
                warn!(error = %e, "Could not start progress thread");
                None
            }
        }
    }

    fn finish(self) {
        self.stop.cancel();
        if self.handle.join().is_err() {
            warn!("Progress thread panicked");
        }
    }
}

fn ctrlc_handler(cancel: CancellationToken) {
    if let Err(e) = ctrlc::set_handler(move || {
        cancel.cancel();
    }) {
        warn!(error = %e, "Could not install Ctrl+C handler");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskbatch_orchestration::sink::CaptureBuffer;

    fn session(mode: OutputMode, progress: bool) -> (Session, CaptureBuffer) {
        let (sink, buffer) = OutputSink::memory();
        let session = Session {
            opts: Options {
                delay: Duration::from_millis(100),
                join_timeout: Duration::from_secs(10),
                cancel_grace: Duration::from_secs(5),
                ..Options::default()
            }
            .normalize(),
            cancel: CancellationToken::new(),
            presenter: CLIResultPresenter::new(sink.clone(), mode, false),
            diagnostics: sink,
            progress,
        };
        (session, buffer)
    }

    #[test]
    fn power_scenario_prints_both_results() {
        let (session, buffer) = session(OutputMode::Quiet, false);
        run_power(&session).unwrap();

        let values: Vec<f64> = buffer.lines().iter().map(|l| l.parse().unwrap()).collect();
        assert_eq!(values.len(), 2);
        for (value, (a, b)) in values.iter().zip(POWER_OPERANDS) {
            let expected = f64::powf(a, b);
            assert!(((value - expected) / expected).abs() < 1e-9);
        }
    }

    #[test]
    fn overdraft_keeps_balance() {
        let (session, buffer) = session(OutputMode::Human, false);
        run_overdraft(&session, 100.0, 150.0, 0.0).unwrap();

        let out = buffer.contents();
        assert!(out.contains("task 0 (withdraw) faulted"));
        assert!(out.contains("insufficient funds"));
        assert!(out.contains("Balance after withdrawal attempt: 100.00"));
    }

    #[test]
    fn stalled_batch_times_out() {
        let (mut session, buffer) = session(OutputMode::Human, true);
        session.opts.join_timeout = Duration::from_millis(600);

        let err = run_stalled_batch(&session, 10, Some(9)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::TimedOut { timed_out: 1 })
        ));

        let out = buffer.contents();
        assert!(out.contains("9 completed, 0 failed, 1 timed out"));
        assert!(out.contains("requesting cancellation"));
        assert!(out.contains("progress: "));
    }

    #[test]
    fn batch_without_stall_succeeds() {
        let (session, _buffer) = session(OutputMode::Quiet, false);
        run_stalled_batch(&session, 5, None).unwrap();
    }

    #[test]
    fn stall_out_of_range_is_config_error() {
        let (session, _buffer) = session(OutputMode::Quiet, false);
        let err = run_stalled_batch(&session, 3, Some(3)).unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::Config(_))));
    }

    #[test]
    fn batch_specs_cycle_operations() {
        let specs = batch_specs(7, Some(2), Duration::from_millis(100));
        assert_eq!(specs.len(), 7);
        assert_eq!(specs[0].label, "add-0");
        assert_eq!(specs[5].label, "add-5");
        assert_eq!(specs[4].computation.name(), "power");
    }

    #[test]
    fn multicast_unknown_name_is_rejected() {
        let (session, _buffer) = session(OutputMode::Human, false);
        let err = run_multicast(&session, 1.0, 2.0, &["modulo".into()]).unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::Config(_))));
    }

    #[test]
    fn multicast_after_unsubscribe() {
        let (session, buffer) = session(OutputMode::Quiet, false);
        run_multicast(&session, 6.0, 3.0, &["power".into(), "divide".into()]).unwrap();
        assert_eq!(buffer.lines(), vec!["9", "3", "18"]);
    }

    #[test]
    fn cancelled_session_reports_cancelled() {
        let (session, _buffer) = session(OutputMode::Quiet, false);
        session.cancel.cancel();
        let err = run_power(&session).unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::Cancelled)));
    }
}
