//! Orchestration interfaces.

use std::time::Duration;

use serde::Serialize;

use taskbatch_core::task::Operands;

/// Final state of one task as seen by the driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    /// The computation produced a value.
    Completed { value: f64 },
    /// The computation faulted; the task has no value.
    Failed { error: String },
    /// The task had not finished when the first bounded wait expired.
    /// `stopped` tells whether it honoured cancellation within the grace period.
    TimedOut { stopped: bool },
}

impl TaskStatus {
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        match self {
            TaskStatus::Completed { value } => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Completed { .. } => "OK",
            TaskStatus::Failed { .. } => "FAILED",
            TaskStatus::TimedOut { .. } => "TIMED OUT",
        }
    }
}

/// Result of a single task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    /// Dispatch index.
    pub id: usize,
    pub label: String,
    pub computation: String,
    pub operands: Operands,
    pub status: TaskStatus,
    /// Time spent computing; `None` when the task never finished.
    #[serde(serialize_with = "serialize_opt_duration")]
    pub duration: Option<Duration>,
}

/// Result of a whole batch, tasks in dispatch order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub tasks: Vec<TaskReport>,
    /// The first bounded wait expired and cancellation was requested.
    pub escalated: bool,
    /// Tasks still running when the driver gave up waiting.
    pub still_running: usize,
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

impl BatchReport {
    #[must_use]
    pub fn completed(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Completed { .. }))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Failed { .. }))
    }

    #[must_use]
    pub fn timed_out(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::TimedOut { .. }))
    }

    /// Values of completed tasks, in dispatch order.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.tasks.iter().filter_map(|t| t.status.value()).collect()
    }

    fn count(&self, pred: impl Fn(&TaskStatus) -> bool) -> usize {
        self.tasks.iter().filter(|t| pred(&t.status)).count()
    }
}

fn serialize_opt_duration<S: serde::Serializer>(
    d: &Option<Duration>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_some(&d.as_secs_f64()),
        None => s.serialize_none(),
    }
}

fn serialize_duration<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Trait for presenting results to the user.
pub trait ResultPresenter: Send + Sync {
    /// Present a finished batch.
    fn present_batch(&self, title: &str, report: &BatchReport);

    /// Present a free-form notice.
    fn present_notice(&self, message: &str);

    /// Present an error.
    fn present_error(&self, error: &str);
}
