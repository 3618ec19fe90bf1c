//! CLI result presenter.
//!
//! Human output goes through the shared [`OutputSink`] so it never
//! interleaves with diagnostics written by still-running tasks. `--json`
//! emits one JSON document per presented result instead.

use serde::Serialize;
use serde_json::json;
use tracing::warn;

use taskbatch_core::calculator::TaskError;
use taskbatch_core::records::Ledger;
use taskbatch_orchestration::interfaces::{BatchReport, ResultPresenter, TaskReport, TaskStatus};
use taskbatch_orchestration::sink::OutputSink;

use crate::output::{format_duration, format_value};
use crate::ui;

/// How results are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    Human,
    /// Values only, one per line.
    Quiet,
    Json,
}

/// CLI result presenter.
pub struct CLIResultPresenter {
    sink: OutputSink,
    mode: OutputMode,
    verbose: bool,
}

impl CLIResultPresenter {
    #[must_use]
    pub fn new(sink: OutputSink, mode: OutputMode, verbose: bool) -> Self {
        Self {
            sink,
            mode,
            verbose,
        }
    }

    /// Present the named results of one multicast invocation, in
    /// registration order.
    pub fn present_multicast(
        &self,
        title: &str,
        args: (f64, f64),
        results: &[(String, Result<f64, TaskError>)],
    ) {
        match self.mode {
            OutputMode::Json => {
                let entries: Vec<_> = results
                    .iter()
                    .map(|(name, result)| match result {
                        Ok(value) => json!({ "name": name, "value": value }),
                        Err(e) => json!({ "name": name, "error": e.to_string() }),
                    })
                    .collect();
                self.emit_json(&json!({
                    "title": title,
                    "operands": { "a": args.0, "b": args.1 },
                    "results": entries,
                }));
            }
            OutputMode::Quiet => {
                let lines: Vec<String> = results
                    .iter()
                    .map(|(_, r)| match r {
                        Ok(v) => v.to_string(),
                        Err(_) => "FAILED".to_string(),
                    })
                    .collect();
                self.write(&lines);
            }
            OutputMode::Human => {
                let mut lines = vec![
                    ui::header(title),
                    format!("operands ({}, {})", args.0, args.1),
                ];
                for (name, result) in results {
                    lines.push(match result {
                        Ok(v) => format!("  {name:<10} = {}", format_value(*v)),
                        Err(e) => format!("  {name:<10} ! {e}"),
                    });
                }
                lines.push(format!("{} callback(s) invoked", results.len()));
                self.write(&lines);
            }
        }
    }

    /// Present parsed ledger accounts and the records that were skipped.
    pub fn present_ledger(&self, title: &str, ledger: &Ledger) {
        match self.mode {
            OutputMode::Json => {
                let skipped: Vec<_> = ledger
                    .skipped
                    .iter()
                    .map(|s| json!({ "line": s.line, "error": s.error.to_string() }))
                    .collect();
                self.emit_json(&json!({
                    "title": title,
                    "accounts": ledger.accounts,
                    "skipped": skipped,
                }));
            }
            OutputMode::Quiet => {
                let lines: Vec<String> = ledger
                    .accounts
                    .iter()
                    .map(|a| format!("{}\t{}", a.id(), a.balance()))
                    .collect();
                self.write(&lines);
            }
            OutputMode::Human => {
                let mut lines = vec![ui::header(title)];
                for account in &ledger.accounts {
                    lines.push(format!(
                        "  {:>6}  {:<8}  {:<20} {:>12}  (available {})",
                        account.id(),
                        account.kind().label(),
                        account.name(),
                        format_value(account.balance()),
                        format_value(account.available()),
                    ));
                }
                for skipped in &ledger.skipped {
                    lines.push(format!("  line {} skipped: {}", skipped.line, skipped.error));
                }
                lines.push(format!(
                    "{} account(s) loaded, {} record(s) skipped",
                    ledger.accounts.len(),
                    ledger.skipped.len()
                ));
                self.write(&lines);
            }
        }
    }

    fn task_line(&self, task: &TaskReport) -> String {
        let tag = ui::status_tag(&task.status);
        let head = format!(
            "  {tag} #{} {} {}{}",
            task.id, task.label, task.computation, task.operands
        );
        let timing = match (self.verbose, task.duration) {
            (true, Some(d)) => format!("  ({})", format_duration(d)),
            _ => String::new(),
        };
        match &task.status {
            TaskStatus::Completed { value } => format!("{head} = {}{timing}", format_value(*value)),
            TaskStatus::Failed { error } => format!("{head}: {error}{timing}"),
            TaskStatus::TimedOut { stopped: true } => {
                format!("{head}: stopped after cancellation")
            }
            TaskStatus::TimedOut { stopped: false } => format!("{head}: still running"),
        }
    }

    fn emit_json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => self.write(&[text]),
            Err(e) => self.present_error(&format!("could not serialize result: {e}")),
        }
    }

    fn write<S: AsRef<str>>(&self, lines: &[S]) {
        if let Err(e) = self.sink.write_block(lines) {
            warn!(error = %e, "Could not write to output sink");
        }
    }
}

impl ResultPresenter for CLIResultPresenter {
    fn present_batch(&self, title: &str, report: &BatchReport) {
        match self.mode {
            OutputMode::Json => {
                self.emit_json(&json!({ "title": title, "report": report }));
            }
            OutputMode::Quiet => {
                let lines: Vec<String> = report
                    .tasks
                    .iter()
                    .map(|t| match t.status.value() {
                        Some(v) => v.to_string(),
                        None => t.status.label().to_string(),
                    })
                    .collect();
                self.write(&lines);
            }
            OutputMode::Human => {
                let mut lines = vec![ui::header(title)];
                lines.extend(report.tasks.iter().map(|t| self.task_line(t)));
                lines.push(format!(
                    "{} completed, {} failed, {} timed out in {}",
                    report.completed(),
                    report.failed(),
                    report.timed_out(),
                    format_duration(report.elapsed)
                ));
                if report.escalated {
                    lines.push("Cancellation was requested after the bounded wait expired".into());
                }
                if report.still_running > 0 {
                    lines.push(format!(
                        "{} task(s) were still running at exit",
                        report.still_running
                    ));
                }
                self.write(&lines);
            }
        }
    }

    fn present_notice(&self, message: &str) {
        if self.mode == OutputMode::Human {
            self.write(&[message]);
        }
    }

    fn present_error(&self, error: &str) {
        ui::print_error(error);
    }
}
