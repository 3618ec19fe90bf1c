//! Computation traits and the calculator operations run by worker tasks.
//!
//! `Computation` is the public trait consumed by orchestration. Every worker
//! task holds one and calls it with its two operands.
//! `ComplicatedCalculator` simulates an expensive arithmetic operation with a
//! delay that polls the cancellation token, so a stalled task can be asked to
//! stop instead of being killed.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::account::AccountError;
use crate::cancel::{sleep_cancellable, CancellationToken};

/// Error type for task computations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaskError {
    /// The computation itself failed.
    #[error("computation error: {0}")]
    Computation(String),

    /// The operands are outside the operation's domain.
    #[error("domain error: {0}")]
    Domain(String),

    /// A business rule rejected the operation.
    #[error(transparent)]
    Rule(#[from] AccountError),

    /// The task observed a cancellation request.
    #[error("task cancelled")]
    Cancelled,

    /// The computation panicked.
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// A unit of numeric work taking two operands.
pub trait Computation: Send + Sync {
    /// Compute a result from the two operands.
    ///
    /// Long-running implementations should poll `cancel` at safe points.
    fn compute(&self, cancel: &CancellationToken, a: f64, b: f64) -> Result<f64, TaskError>;

    /// Name used in logs and reports.
    fn name(&self) -> &str;
}

/// Binary arithmetic operations offered by the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl Operation {
    /// All operations in declaration order.
    pub const ALL: [Operation; 5] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
        Operation::Power,
    ];

    /// Apply the operation.
    ///
    /// Division by zero and non-finite results are domain errors rather than
    /// silently producing `inf` or `NaN`.
    pub fn apply(self, a: f64, b: f64) -> Result<f64, TaskError> {
        let value = match self {
            Operation::Add => a + b,
            Operation::Subtract => a - b,
            Operation::Multiply => a * b,
            Operation::Divide => {
                if b == 0.0 {
                    return Err(TaskError::Domain(format!("{a} / 0")));
                }
                a / b
            }
            Operation::Power => a.powf(b),
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(TaskError::Domain(format!(
                "{a} {} {b} is not finite",
                self.symbol()
            )))
        }
    }

    /// Infix symbol for display.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Operation::Add => "+",
            Operation::Subtract => "-",
            Operation::Multiply => "*",
            Operation::Divide => "/",
            Operation::Power => "^",
        }
    }

    /// Lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
            Operation::Power => "power",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Calculator that spends `delay` "thinking" before applying its operation.
pub struct ComplicatedCalculator {
    operation: Operation,
    delay: Duration,
}

impl ComplicatedCalculator {
    #[must_use]
    pub fn new(operation: Operation, delay: Duration) -> Self {
        Self { operation, delay }
    }

    /// Calculator with no simulated delay.
    #[must_use]
    pub fn instant(operation: Operation) -> Self {
        Self::new(operation, Duration::ZERO)
    }

    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Computation for ComplicatedCalculator {
    fn compute(&self, cancel: &CancellationToken, a: f64, b: f64) -> Result<f64, TaskError> {
        cancel.check_cancelled()?;
        sleep_cancellable(cancel, self.delay)?;
        self.operation.apply(a, b)
    }

    fn name(&self) -> &str {
        self.operation.name()
    }
}

/// Adapter turning a closure into a [`Computation`].
pub struct FnComputation<F> {
    name: String,
    f: F,
}

impl<F> FnComputation<F>
where
    F: Fn(&CancellationToken, f64, f64) -> Result<f64, TaskError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Computation for FnComputation<F>
where
    F: Fn(&CancellationToken, f64, f64) -> Result<f64, TaskError> + Send + Sync,
{
    fn compute(&self, cancel: &CancellationToken, a: f64, b: f64) -> Result<f64, TaskError> {
        (self.f)(cancel, a, b)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
