//! Bank accounts with business-rule checks on every transaction.
//!
//! A rejected transaction leaves the account untouched and returns an
//! [`AccountError`] carrying the account and the offending amount.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calculator::{Computation, TaskError};
use crate::cancel::CancellationToken;
use crate::constants::MAX_TRANSACTION_AMOUNT;

/// Business-rule faults raised by account transactions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AccountError {
    /// The withdrawal would take the balance below what the account allows.
    #[error("account {account}: insufficient funds to withdraw {amount:.2} (balance {balance:.2})")]
    InsufficientFunds {
        account: u32,
        balance: f64,
        amount: f64,
    },

    /// The amount exceeds the per-transaction cap.
    #[error("account {account}: amount {amount:.2} exceeds transaction limit {limit:.2}")]
    LimitExceeded { account: u32, amount: f64, limit: f64 },

    /// Zero, negative or non-finite amount.
    #[error("account {account}: invalid amount {amount}")]
    InvalidAmount { account: u32, amount: f64 },
}

/// Account flavour and its type-specific field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AccountKind {
    /// May go negative down to `-overdraft_limit`.
    Checking { overdraft_limit: f64 },
    /// Never goes negative.
    Savings { interest_rate: f64 },
}

impl AccountKind {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            AccountKind::Checking { .. } => "checking",
            AccountKind::Savings { .. } => "savings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    id: u32,
    name: String,
    #[serde(flatten)]
    kind: AccountKind,
    balance: f64,
}

impl Account {
    #[must_use]
    pub fn new(id: u32, name: impl Into<String>, kind: AccountKind, balance: f64) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            balance,
        }
    }

    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    #[must_use]
    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Largest amount that can currently be withdrawn.
    #[must_use]
    pub fn available(&self) -> f64 {
        match self.kind {
            AccountKind::Checking { overdraft_limit } => self.balance + overdraft_limit,
            AccountKind::Savings { .. } => self.balance,
        }
    }

    fn validate_amount(&self, amount: f64) -> Result<(), AccountError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AccountError::InvalidAmount {
                account: self.id,
                amount,
            });
        }
        if amount > MAX_TRANSACTION_AMOUNT {
            return Err(AccountError::LimitExceeded {
                account: self.id,
                amount,
                limit: MAX_TRANSACTION_AMOUNT,
            });
        }
        Ok(())
    }

    /// Deposit `amount`, returning the new balance.
    pub fn deposit(&mut self, amount: f64) -> Result<f64, AccountError> {
        self.validate_amount(amount)?;
        self.balance += amount;
        debug!(account = self.id, amount, balance = self.balance, "Deposit");
        Ok(self.balance)
    }

    /// Withdraw `amount`, returning the new balance.
    pub fn withdraw(&mut self, amount: f64) -> Result<f64, AccountError> {
        self.validate_amount(amount)?;
        if amount > self.available() {
            return Err(AccountError::InsufficientFunds {
                account: self.id,
                balance: self.balance,
                amount,
            });
        }
        self.balance -= amount;
        debug!(account = self.id, amount, balance = self.balance, "Withdrawal");
        Ok(self.balance)
    }
}

/// Account shared between worker tasks.
pub type SharedAccount = Arc<Mutex<Account>>;

/// Computation that withdraws `a * b` (quantity times unit price) from an
/// account and yields the new balance.
pub struct Withdrawal {
    account: SharedAccount,
}

impl Withdrawal {
    #[must_use]
    pub fn new(account: SharedAccount) -> Self {
        Self { account }
    }
}

impl Computation for Withdrawal {
    fn compute(&self, cancel: &CancellationToken, a: f64, b: f64) -> Result<f64, TaskError> {
        cancel.check_cancelled()?;
        let amount = a * b;
        let mut account = self.account.lock();
        account.withdraw(amount).map_err(|e| {
            warn!(account = account.id(), amount, error = %e, "Withdrawal rejected");
            TaskError::from(e)
        })
    }

    fn name(&self) -> &str {
        "withdrawal"
    }
}
