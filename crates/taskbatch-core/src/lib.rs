//! # taskbatch-core
//!
//! Core library for taskbatch: the task data model, the computations workers
//! run, bank accounts with business-rule faults, cooperative cancellation
//! and ordered observer lists.

pub mod account;
pub mod calculator;
pub mod cancel;
pub mod constants;
pub mod observer;
pub mod observers;
pub mod options;
pub mod records;
pub mod task;

// Re-exports
pub use account::{Account, AccountError, AccountKind, SharedAccount, Withdrawal};
pub use calculator::{ComplicatedCalculator, Computation, FnComputation, Operation, TaskError};
pub use cancel::CancellationToken;
pub use constants::exit_codes;
pub use observer::{Multicast, ObserverSubject, TaskObserver};
pub use options::{Dispatch, Options};
pub use task::{Operands, Task, TaskEvent, TaskEventKind, TaskOutcome, TaskSpec};

/// Build the calculator multicast: one callback per [`Operation`], in
/// declaration order, each yielding its own result.
///
/// # Example
/// ```
/// let ops = taskbatch_core::calculator_multicast();
/// let results = ops.invoke(&(6.0, 3.0));
/// assert_eq!(results[0], Ok(9.0));
/// assert_eq!(results.len(), 5);
/// ```
#[must_use]
pub fn calculator_multicast() -> Multicast<(f64, f64), Result<f64, TaskError>> {
    let ops = Multicast::new();
    for op in Operation::ALL {
        ops.subscribe(op.name(), move |&(a, b): &(f64, f64)| op.apply(a, b));
    }
    ops
}
