//! Worker task wrapper.
//!
//! Runs one task's computation, stores the outcome and reports completion to
//! the coordinator. Completion is reported from a drop guard, so it happens
//! exactly once whether the computation succeeds, fails or panics.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use taskbatch_core::calculator::TaskError;
use taskbatch_core::cancel::CancellationToken;
use taskbatch_core::observer::TaskObserver;
use taskbatch_core::task::{Task, TaskEvent, TaskOutcome};

use crate::coordinator::Coordinator;
use crate::sink::OutputSink;

/// Everything a worker shares with the rest of the batch.
pub struct WorkerContext {
    pub coordinator: Arc<Coordinator>,
    pub sink: OutputSink,
    pub cancel: CancellationToken,
    pub observer: Arc<dyn TaskObserver>,
}

struct CompletionGuard<'a> {
    task: &'a Task,
    coordinator: &'a Coordinator,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.task.mark_done();
        // Over-reporting is logged by the coordinator itself.
        let _ = self.coordinator.report_done();
    }
}

/// Identifier of the current thread: its name if it has one, else its id.
#[must_use]
pub fn thread_label() -> String {
    let current = std::thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Deliver `event` to the observer. A panicking observer is logged and
/// otherwise ignored so the task's outcome is still recorded.
fn notify(observer: &dyn TaskObserver, event: &TaskEvent) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| observer.on_event(event))) {
        warn!(
            task = event.task_id,
            panic = %panic_message(payload.as_ref()),
            "Observer panicked"
        );
    }
}

/// Write a task fault to the sink as one uninterrupted block.
fn report_fault(task: &Task, error: &TaskError, sink: &OutputSink) {
    let thread = thread_label();
    warn!(task = task.id(), label = task.label(), %thread, %error, "Task faulted");

    let lines = [
        format!("[{thread}] task {} ({}) faulted", task.id(), task.label()),
        format!("    {error}"),
    ];
    if let Err(e) = sink.write_block(&lines) {
        warn!(task = task.id(), error = %e, "Could not write fault to output sink");
    }
}

/// Run `task` on the current thread.
pub fn run_task(task: &Task, ctx: &WorkerContext) {
    let _completion = CompletionGuard {
        task,
        coordinator: &ctx.coordinator,
    };

    notify(ctx.observer.as_ref(), &TaskEvent::started(task));
    let operands = task.operands();
    let start = Instant::now();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        task.computation()
            .compute(&ctx.cancel, operands.a, operands.b)
    }))
    .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload.as_ref()))));
    let duration = start.elapsed();

    match &result {
        Ok(value) => {
            debug!(task = task.id(), value, ?duration, "Task computed");
            notify(ctx.observer.as_ref(), &TaskEvent::completed(task, *value));
        }
        Err(error) => {
            report_fault(task, error, &ctx.sink);
            notify(ctx.observer.as_ref(), &TaskEvent::failed(task, error));
        }
    }

    task.record(TaskOutcome { result, duration });
}
