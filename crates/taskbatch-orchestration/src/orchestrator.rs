//! Core orchestration: dispatch, bounded wait with escalation, and result
//! collection.
//!
//! The driver creates one [`Task`] per spec, puts each on its own unit of
//! execution and blocks on the [`Coordinator`]. If the batch does not finish
//! within `join_timeout`, the batch token is cancelled and the driver waits
//! up to `cancel_grace` more. Tasks that are still running after that are
//! reported and left behind; the driver never kills a thread.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use taskbatch_core::calculator::TaskError;
use taskbatch_core::cancel::CancellationToken;
use taskbatch_core::observer::TaskObserver;
use taskbatch_core::observers::NoOpObserver;
use taskbatch_core::options::{Dispatch, Options};
use taskbatch_core::task::{Task, TaskOutcome, TaskSpec};

use crate::coordinator::Coordinator;
use crate::interfaces::{BatchReport, TaskReport, TaskStatus};
use crate::sink::OutputSink;
use crate::worker::{run_task, WorkerContext};

/// Running workers, kept so the driver can join or release them.
enum Workers {
    Threads(Vec<(usize, JoinHandle<()>)>),
    Pool(rayon::ThreadPool),
}

/// Execute a batch without observers.
pub fn execute_batch(
    specs: Vec<TaskSpec>,
    opts: &Options,
    cancel: &CancellationToken,
    sink: &OutputSink,
) -> BatchReport {
    execute_batch_with_observer(specs, opts, cancel, sink, Arc::new(NoOpObserver::new()))
}

/// Execute a batch, forwarding task events to `observer`.
pub fn execute_batch_with_observer(
    specs: Vec<TaskSpec>,
    opts: &Options,
    cancel: &CancellationToken,
    sink: &OutputSink,
    observer: Arc<dyn TaskObserver>,
) -> BatchReport {
    let start_time = Instant::now();

    let tasks: Vec<Arc<Task>> = specs
        .into_iter()
        .enumerate()
        .map(|(id, spec)| Arc::new(Task::new(id, spec)))
        .collect();
    let coordinator = Arc::new(Coordinator::new(tasks.len()));
    let batch_cancel = cancel.child();

    let ctx = Arc::new(WorkerContext {
        coordinator: Arc::clone(&coordinator),
        sink: sink.clone(),
        cancel: batch_cancel.clone(),
        observer,
    });

    info!(tasks = tasks.len(), dispatch = ?opts.dispatch, "Dispatching batch");
    let workers = dispatch(&tasks, &ctx, opts);

    let mut escalated = false;
    let mut late: HashSet<usize> = HashSet::new();

    if !coordinator.wait_for_all_timeout(opts.join_timeout) {
        escalated = true;
        late = tasks
            .iter()
            .filter(|t| !t.is_done())
            .map(|t| t.id())
            .collect();
        warn!(
            outstanding = coordinator.outstanding(),
            timeout = ?opts.join_timeout,
            "Bounded wait expired; requesting cancellation"
        );
        let _ = sink.line(&format!(
            "Timed out after {:?} waiting for {} task(s); requesting cancellation",
            opts.join_timeout,
            late.len()
        ));
        batch_cancel.cancel();

        if !coordinator.wait_for_all_timeout(opts.cancel_grace) {
            warn!(
                outstanding = coordinator.outstanding(),
                grace = ?opts.cancel_grace,
                "Tasks still running after cancellation; proceeding without them"
            );
        }
    }

    release_workers(workers, &tasks);

    let reports: Vec<TaskReport> = tasks
        .iter()
        .map(|task| task_report(task, late.contains(&task.id())))
        .collect();
    let still_running = tasks.iter().filter(|t| !t.is_done()).count();

    if still_running > 0 {
        let _ = sink.line(&format!(
            "{still_running} task(s) still running; continuing without them"
        ));
    }

    let report = BatchReport {
        tasks: reports,
        escalated,
        still_running,
        elapsed: start_time.elapsed(),
    };
    info!(
        completed = report.completed(),
        failed = report.failed(),
        timed_out = report.timed_out(),
        elapsed = ?report.elapsed,
        "Batch finished"
    );
    report
}

fn dispatch(tasks: &[Arc<Task>], ctx: &Arc<WorkerContext>, opts: &Options) -> Workers {
    if opts.dispatch == Dispatch::Pool {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(opts.pool_threads)
            .thread_name(|i| format!("pool-{i}"))
            .build();
        match pool {
            Ok(pool) => {
                for task in tasks {
                    let task = Arc::clone(task);
                    let ctx = Arc::clone(ctx);
                    pool.spawn(move || run_task(&task, &ctx));
                }
                return Workers::Pool(pool);
            }
            Err(e) => {
                warn!(error = %e, "Could not build thread pool; falling back to one thread per task");
            }
        }
    }

    let mut handles = Vec::with_capacity(tasks.len());
    for task in tasks {
        let worker_task = Arc::clone(task);
        let worker_ctx = Arc::clone(ctx);
        let spawned = std::thread::Builder::new()
            .name(format!("task-{}", task.id()))
            .spawn(move || run_task(&worker_task, &worker_ctx));
        match spawned {
            Ok(handle) => handles.push((task.id(), handle)),
            Err(e) => abandon(task, ctx, &e.to_string()),
        }
    }
    Workers::Threads(handles)
}

/// Settle a task that could not be started so the batch can still finish.
fn abandon(task: &Task, ctx: &WorkerContext, reason: &str) {
    error!(task = task.id(), reason, "Could not start worker");
    task.record(TaskOutcome {
        result: Err(TaskError::Computation(format!(
            "could not start worker: {reason}"
        ))),
        duration: std::time::Duration::ZERO,
    });
    task.mark_done();
    let _ = ctx.coordinator.report_done();
}

fn release_workers(workers: Workers, tasks: &[Arc<Task>]) {
    match workers {
        Workers::Threads(handles) => {
            for (id, handle) in handles {
                if tasks[id].is_done() {
                    if handle.join().is_err() {
                        warn!(task = id, "Worker thread panicked after reporting");
                    }
                } else {
                    warn!(task = id, "Detaching worker thread that is still running");
                }
            }
        }
        Workers::Pool(pool) => {
            debug!(threads = pool.current_num_threads(), "Releasing thread pool");
            drop(pool);
        }
    }
}

fn task_report(task: &Task, late: bool) -> TaskReport {
    let status = if late {
        TaskStatus::TimedOut {
            stopped: task.is_done(),
        }
    } else {
        match task.outcome() {
            Some(TaskOutcome { result: Ok(v), .. }) => TaskStatus::Completed { value: *v },
            Some(TaskOutcome { result: Err(e), .. }) => TaskStatus::Failed {
                error: e.to_string(),
            },
            None if task.is_done() => TaskStatus::Failed {
                error: "worker finished without recording an outcome".into(),
            },
            None => TaskStatus::TimedOut { stopped: false },
        }
    };

    TaskReport {
        id: task.id(),
        label: task.label().to_string(),
        computation: task.computation().name().to_string(),
        operands: task.operands(),
        status,
        duration: task.outcome().map(|o| o.duration),
    }
}
