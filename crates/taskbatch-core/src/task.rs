//! Task data model.
//!
//! A [`Task`] is created by the driver before dispatch, written exactly once
//! by the worker that runs it, and read by the driver only after completion
//! has been observed.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::calculator::{Computation, TaskError};

/// The two numeric inputs of a task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Operands {
    pub a: f64,
    pub b: f64,
}

impl Operands {
    #[must_use]
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }
}

impl fmt::Display for Operands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.a, self.b)
    }
}

/// Description of a task to dispatch.
#[derive(Clone)]
pub struct TaskSpec {
    pub label: String,
    pub operands: Operands,
    pub computation: Arc<dyn Computation>,
}

impl TaskSpec {
    pub fn new(
        label: impl Into<String>,
        a: f64,
        b: f64,
        computation: Arc<dyn Computation>,
    ) -> Self {
        Self {
            label: label.into(),
            operands: Operands::new(a, b),
            computation,
        }
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("label", &self.label)
            .field("operands", &self.operands)
            .field("computation", &self.computation.name())
            .finish()
    }
}

/// Result of running a task once.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub result: Result<f64, TaskError>,
    pub duration: Duration,
}

/// A dispatched unit of work.
pub struct Task {
    id: usize,
    spec: TaskSpec,
    outcome: OnceLock<TaskOutcome>,
    done: AtomicBool,
}

impl Task {
    #[must_use]
    pub fn new(id: usize, spec: TaskSpec) -> Self {
        Self {
            id,
            spec,
            outcome: OnceLock::new(),
            done: AtomicBool::new(false),
        }
    }

    /// Dispatch index.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.spec.label
    }

    #[must_use]
    pub fn operands(&self) -> Operands {
        self.spec.operands
    }

    #[must_use]
    pub fn computation(&self) -> &dyn Computation {
        self.spec.computation.as_ref()
    }

    /// Store the outcome. Only the first call has any effect.
    ///
    /// Returns `false` when an outcome was already recorded.
    pub fn record(&self, outcome: TaskOutcome) -> bool {
        let accepted = self.outcome.set(outcome).is_ok();
        if !accepted {
            warn!(task = self.id, "Outcome already recorded; ignoring second write");
        }
        accepted
    }

    /// Mark the task finished. Called once the outcome slot is final.
    pub fn mark_done(&self) {
        self.done.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&TaskOutcome> {
        self.outcome.get()
    }

    /// Computed value, absent until a successful computation finished.
    #[must_use]
    pub fn result(&self) -> Option<f64> {
        self.outcome().and_then(|o| o.result.as_ref().ok().copied())
    }

    /// Recorded fault, if the computation failed.
    #[must_use]
    pub fn fault(&self) -> Option<&TaskError> {
        self.outcome().and_then(|o| o.result.as_ref().err())
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("spec", &self.spec)
            .field("outcome", &self.outcome.get())
            .field("done", &self.is_done())
            .finish()
    }
}

/// What happened to a task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEventKind {
    Started,
    Completed(f64),
    Failed(String),
}

/// Event emitted by workers to observers.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEvent {
    pub task_id: usize,
    pub label: String,
    pub kind: TaskEventKind,
}

impl TaskEvent {
    #[must_use]
    pub fn started(task: &Task) -> Self {
        Self::new(task, TaskEventKind::Started)
    }

    #[must_use]
    pub fn completed(task: &Task, value: f64) -> Self {
        Self::new(task, TaskEventKind::Completed(value))
    }

    #[must_use]
    pub fn failed(task: &Task, error: &TaskError) -> Self {
        Self::new(task, TaskEventKind::Failed(error.to_string()))
    }

    fn new(task: &Task, kind: TaskEventKind) -> Self {
        Self {
            task_id: task.id(),
            label: task.label().to_string(),
            kind,
        }
    }

    /// Whether this is the last event a task emits.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, TaskEventKind::Started)
    }
}
