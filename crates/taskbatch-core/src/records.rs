//! Tab-separated account records.
//!
//! Each line is `id<TAB>kind<TAB>name<TAB>balance<TAB>field`, where `field`
//! is the overdraft limit for `checking` accounts and the interest rate for
//! `savings` accounts. Blank lines and lines starting with `#` are ignored.
//! Malformed records are skipped and reported; parsing always continues.

use std::io::BufRead;

use tracing::warn;

use crate::account::{Account, AccountKind};

/// Number of fields in a record.
pub const FIELD_COUNT: usize = 5;

/// Built-in ledger used by the `ledger` command. Lines 4 and 6 are malformed.
pub const SAMPLE_LEDGER: &str = "\
# id\tkind\tname\tbalance\tfield
1001\tchecking\tAda Lovelace\t250.00\t100.00
1002\tsavings\tCharles Babbage\t1200.50\t0.035
1003\tsavings\tGrace Hopper\tlots\t0.02
1004\tchecking\tAlan Turing\t-20.00\t50.00
1005\tbrokerage\tJohn von Neumann\t10.00\t0
";

/// Input validation faults for a single record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("expected 5 tab-separated fields, found {0}")]
    FieldCount(usize),

    #[error("field `{field}` is not a valid number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("unknown account kind {0:?}")]
    UnknownKind(String),

    #[error("could not read line: {0}")]
    Io(String),
}

/// A record that was skipped, with its 1-based line number.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    pub line: usize,
    pub error: RecordError,
}

/// Outcome of parsing a ledger.
#[derive(Debug, Default)]
pub struct Ledger {
    pub accounts: Vec<Account>,
    pub skipped: Vec<SkippedRecord>,
}

fn number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, RecordError> {
    value.trim().parse().map_err(|_| RecordError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// Parse one record.
pub fn parse_record(line: &str) -> Result<Account, RecordError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != FIELD_COUNT {
        return Err(RecordError::FieldCount(fields.len()));
    }

    let id: u32 = number("id", fields[0])?;
    let name = fields[2].trim();
    let balance: f64 = number("balance", fields[3])?;
    let kind = match fields[1].trim().to_ascii_lowercase().as_str() {
        "checking" => AccountKind::Checking {
            overdraft_limit: number("overdraft_limit", fields[4])?,
        },
        "savings" => AccountKind::Savings {
            interest_rate: number("interest_rate", fields[4])?,
        },
        other => return Err(RecordError::UnknownKind(other.to_string())),
    };

    if !balance.is_finite() {
        return Err(RecordError::InvalidNumber {
            field: "balance",
            value: fields[3].to_string(),
        });
    }

    Ok(Account::new(id, name, kind, balance))
}

/// Parse every record from `reader`, skipping malformed ones.
pub fn parse_ledger<R: BufRead>(reader: R) -> Ledger {
    let mut ledger = Ledger::default();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping unreadable record");
                ledger.skipped.push(SkippedRecord {
                    line: line_no,
                    error: RecordError::Io(e.to_string()),
                });
                continue;
            }
        };

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.trim().is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match parse_record(trimmed) {
            Ok(account) => ledger.accounts.push(account),
            Err(error) => {
                warn!(line = line_no, %error, "Skipping malformed record");
                ledger.skipped.push(SkippedRecord {
                    line: line_no,
                    error,
                });
            }
        }
    }

    ledger
}
