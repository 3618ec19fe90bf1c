//! # taskbatch-orchestration
//!
//! Batch dispatch, completion coordination, and bounded waiting.

pub mod coordinator;
pub mod event;
pub mod interfaces;
pub mod orchestrator;
pub mod sink;
pub mod worker;

pub use coordinator::{Coordinator, OverReported};
pub use event::AutoResetEvent;
pub use interfaces::{BatchReport, ResultPresenter, TaskReport, TaskStatus};
pub use orchestrator::{execute_batch, execute_batch_with_observer};
pub use sink::{CaptureBuffer, OutputSink, SinkGuard};
pub use worker::{run_task, WorkerContext};
