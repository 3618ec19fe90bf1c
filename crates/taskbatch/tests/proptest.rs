//! Property-based tests for configuration parsing and batch construction.

use std::time::Duration;

use proptest::prelude::*;

use taskbatch_lib::app::{batch_specs, STALL_DELAY};
use taskbatch_lib::config::parse_duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every millisecond count round-trips through the `ms` suffix.
    #[test]
    fn millis_parse(n in 0u64..10_000_000) {
        prop_assert_eq!(parse_duration(&format!("{n}ms")), Some(Duration::from_millis(n)));
    }

    /// Minutes are sixty seconds each.
    #[test]
    fn minutes_parse(n in 0u64..100_000) {
        prop_assert_eq!(parse_duration(&format!("{n}m")), Some(Duration::from_secs(n * 60)));
    }

    /// Parsing arbitrary text never panics.
    #[test]
    fn parse_never_panics(s in "\\PC{0,12}") {
        let _ = parse_duration(&s);
    }

    /// Batch specs keep dispatch order and stall exactly the chosen task.
    #[test]
    fn batch_specs_shape(tasks in 1usize..40, stall_pick in 0usize..40) {
        let stall = stall_pick % tasks;
        let specs = batch_specs(tasks, Some(stall), Duration::from_millis(100));
        prop_assert_eq!(specs.len(), tasks);
        for (i, spec) in specs.iter().enumerate() {
            let suffix = format!("-{i}");
            prop_assert!(spec.label.ends_with(&suffix));
            prop_assert_eq!(spec.operands.b, 2.0);
        }
        prop_assert!(STALL_DELAY > Duration::from_secs(60));
    }
}
