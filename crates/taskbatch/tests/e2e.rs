//! End-to-end CLI integration tests.

use assert_cmd::Command;
use predicates::prelude::*;

fn taskbatch() -> Command {
    let mut cmd = Command::cargo_bin("taskbatch").expect("binary not found");
    cmd.env("NO_COLOR", "1")
        .env_remove("TASKBATCH_DELAY_MS")
        .env_remove("TASKBATCH_TIMEOUT")
        .env_remove("TASKBATCH_TASKS");
    cmd
}

#[test]
fn help_flag() {
    taskbatch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("overdraft"))
        .stdout(predicate::str::contains("multicast"));
}

#[test]
fn version_flag() {
    taskbatch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("taskbatch"));
}

#[test]
fn power_quiet_prints_two_values() {
    let output = taskbatch()
        .args(["power", "100", "-q"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    let values: Vec<f64> = text.lines().map(|l| l.parse().unwrap()).collect();
    assert_eq!(values.len(), 2);
    assert!((values[0] / 10.4_f64.powf(7.451) - 1.0).abs() < 1e-9);
    assert!((values[1] / 18.7_f64.powf(3.6) - 1.0).abs() < 1e-9);
}

#[test]
fn power_human_output() {
    taskbatch()
        .args(["power", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Power ==="))
        .stdout(predicate::str::contains("2 completed, 0 failed, 0 timed out"));
}

#[test]
fn overdraft_reports_fault_and_keeps_balance() {
    taskbatch()
        .args(["overdraft", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(withdraw) faulted"))
        .stdout(predicate::str::contains("insufficient funds"))
        .stdout(predicate::str::contains("Balance after withdrawal attempt: 100.00"));
}

#[test]
fn overdraft_within_limit_succeeds() {
    taskbatch()
        .args(["overdraft", "100", "--overdraft-limit", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Balance after withdrawal attempt: -50.00"));
}

#[test]
fn batch_with_stall_exits_with_timeout_code() {
    taskbatch()
        .args(["batch", "100", "--timeout", "800ms", "--grace", "5s"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("9 completed, 0 failed, 1 timed out"))
        .stdout(predicate::str::contains("requesting cancellation"));
}

#[test]
fn batch_without_stall_on_pool() {
    taskbatch()
        .args(["batch", "100", "--no-stall", "--dispatch", "pool", "--pool-threads", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10 completed"));
}

#[test]
fn batch_json_is_parseable() {
    let output = taskbatch()
        .args(["batch", "100", "--tasks", "4", "--no-stall", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["title"], "Batch");
    assert_eq!(value["report"]["tasks"].as_array().unwrap().len(), 4);
    assert_eq!(value["report"]["escalated"], false);
}

#[test]
fn multicast_lists_every_operation() {
    taskbatch()
        .args(["multicast", "6", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("add"))
        .stdout(predicate::str::contains("power"))
        .stdout(predicate::str::contains("5 callback(s) invoked"));
}

#[test]
fn multicast_unknown_unsubscribe_is_config_error() {
    taskbatch()
        .args(["multicast", "--unsubscribe", "modulo"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("no operation named"));
}

#[test]
fn ledger_skips_malformed_records() {
    taskbatch()
        .arg("ledger")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ada Lovelace"))
        .stdout(predicate::str::contains("line 4 skipped"))
        .stdout(predicate::str::contains("line 6 skipped"))
        .stdout(predicate::str::contains("3 account(s) loaded, 2 record(s) skipped"));
}

#[test]
fn invalid_timeout_is_config_error() {
    taskbatch()
        .args(["power", "--timeout", "whenever"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("invalid --timeout"));
}

#[test]
fn oversized_timeout_is_config_error() {
    taskbatch()
        .args(["power", "--timeout", "18446744073709551615"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("exceeds the maximum"));
}

#[test]
fn unknown_subcommand_is_config_error() {
    taskbatch().arg("frobnicate").assert().code(4);
}

#[test]
fn json_and_quiet_conflict() {
    taskbatch().args(["ledger", "--json", "--quiet"]).assert().code(4);
}
