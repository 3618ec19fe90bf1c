#![no_main]

use libfuzzer_sys::fuzz_target;

use taskbatch_core::records::{parse_ledger, parse_record};

fuzz_target!(|data: &[u8]| {
    // Whole input as a ledger; invalid UTF-8 lines must be skipped, not panic.
    let ledger = parse_ledger(data);
    for account in &ledger.accounts {
        assert!(account.balance().is_finite());
    }

    if let Ok(text) = std::str::from_utf8(data) {
        for line in text.lines() {
            let _ = parse_record(line);
        }
    }
});
