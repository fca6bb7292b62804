//! Property tests for the retry policy and the outer-join merge.
//!
//! Uses proptest to verify:
//! 1. Exhausted retries — an always-timing-out operation is attempted
//!    exactly n+1 times and the waits sum to initial * (2^n - 1)
//! 2. Early success — succeeding on attempt k performs exactly k-1 waits
//! 3. Merge losslessness — every ticker present in any input table appears
//!    exactly once in the merged output, with its cells intact

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::time::Duration;
use tickerlab_core::{CollectError, RetryPolicy, Table};

fn timeout() -> CollectError {
    CollectError::Timeout("read timed out".into())
}

// ── 1 & 2. Retry policy ──────────────────────────────────────────────

proptest! {
    /// An operation that always times out is attempted n+1 times, and the
    /// backoff waits sum to initial_delay * (2^n - 1).
    #[test]
    fn exhausted_retries_attempt_n_plus_one_times(n in 0u32..8) {
        let initial = Duration::from_secs(5);
        let policy = RetryPolicy::new(n, initial);
        let mut calls = 0u32;
        let mut total_wait = Duration::ZERO;

        let result: Result<(), _> = policy.run_with_sleep(
            || {
                calls += 1;
                Err(timeout())
            },
            |d| total_wait += d,
        );

        prop_assert!(matches!(result, Err(CollectError::Timeout(_))));
        prop_assert_eq!(calls, n + 1);
        prop_assert_eq!(total_wait, initial * (2u32.pow(n) - 1));
    }

    /// Succeeding on attempt k (1-indexed, k <= n+1) returns the result and
    /// performs exactly k-1 waits.
    #[test]
    fn success_on_attempt_k_waits_k_minus_one_times(n in 0u32..8, pick in 0u32..100) {
        let k = pick % (n + 1) + 1;
        let policy = RetryPolicy::new(n, Duration::from_secs(1));
        let mut calls = 0u32;
        let mut waits = 0u32;

        let result = policy.run_with_sleep(
            || {
                calls += 1;
                if calls < k {
                    Err(timeout())
                } else {
                    Ok(calls)
                }
            },
            |_| waits += 1,
        );

        prop_assert_eq!(result.unwrap(), k);
        prop_assert_eq!(waits, k - 1);
    }

    /// A non-timeout failure is never retried, no matter the policy.
    #[test]
    fn non_timeouts_never_retry(n in 0u32..8) {
        let policy = RetryPolicy::new(n, Duration::from_secs(1));
        let mut calls = 0u32;

        let result: Result<(), _> = policy.run_with_sleep(
            || {
                calls += 1;
                Err(CollectError::Network("connection refused".into()))
            },
            |_| panic!("non-timeout failures must not back off"),
        );

        prop_assert!(result.is_err());
        prop_assert_eq!(calls, 1);
    }
}

// ── 3. Merge losslessness ────────────────────────────────────────────

/// Build one category table holding the tickers whose membership bit is set.
fn membership_table(memberships: &[u8], bit: u8, column: &str) -> Table {
    let mut table = Table::new(vec!["Ticker".into(), column.into()]);
    for (i, mask) in memberships.iter().enumerate() {
        if mask & (1 << bit) != 0 {
            let ticker = format!("T{i}");
            table.push_row(vec![ticker.clone(), format!("{column}:{ticker}")]);
        }
    }
    table
}

proptest! {
    /// For four tables drawn from a shared ticker pool, the left-to-right
    /// outer join contains every ticker present in any table exactly once,
    /// with each table's cell filled where the ticker was a member and
    /// empty where it was not.
    #[test]
    fn merge_is_a_lossless_outer_union(memberships in proptest::collection::vec(0u8..16, 1..16)) {
        let columns = ["c0", "c1", "c2", "c3"];
        let tables: Vec<Table> = (0u8..4)
            .map(|bit| membership_table(&memberships, bit, columns[bit as usize]))
            .collect();

        let mut merged = tables[0].clone();
        for table in &tables[1..] {
            merged = merged.outer_join(table, "Ticker").unwrap();
        }

        let expected: BTreeSet<String> = memberships
            .iter()
            .enumerate()
            .filter(|(_, mask)| **mask != 0)
            .map(|(i, _)| format!("T{i}"))
            .collect();

        let seen: Vec<&str> = merged.rows().iter().map(|row| row[0].as_str()).collect();
        let unique: BTreeSet<String> = seen.iter().map(|s| s.to_string()).collect();

        prop_assert_eq!(seen.len(), unique.len(), "tickers must appear exactly once");
        prop_assert_eq!(unique, expected, "merged tickers must be the union");

        for (i, mask) in memberships.iter().enumerate() {
            if *mask == 0 {
                continue;
            }
            let ticker = format!("T{i}");
            let row = merged
                .rows()
                .iter()
                .position(|row| row[0] == ticker)
                .expect("ticker present");
            for (bit, column) in columns.iter().enumerate() {
                let cell = merged.cell(row, column).expect("column present");
                if mask & (1 << bit) != 0 {
                    prop_assert_eq!(cell, format!("{column}:{ticker}"));
                } else {
                    prop_assert_eq!(cell, "");
                }
            }
        }
    }
}
