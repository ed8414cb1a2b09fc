//! Property-based tests for statement reconstruction.
//!
//! - Forward replay always lands on the closed form
//! - Backward rewind and forward replay agree line by line
//! - Reconstruction is deterministic

use chrono::{Duration, TimeZone, Utc};
use ledgerbank_shared::types::AccountId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::reconstruct::{closed_form_balance, replay_from, rewind_from};
use crate::ledger::{EntryKind, FlowTotals, LedgerEntry};

/// Strategy to generate positive decimal amounts (0.01 to 1,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// (is_credit, amount) pairs turned into entries for one account.
fn entries(me: &AccountId, shape: &[(bool, Decimal)]) -> Vec<LedgerEntry> {
    let other = AccountId::generate();
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    shape.iter()
        .enumerate()
        .map(|(i, (is_credit, amount))| {
            let at = base + Duration::minutes(i64::try_from(i).unwrap());
            if *is_credit {
                LedgerEntry::record(EntryKind::Transfer, other.clone(), *amount, "in", at)
                    .to_account(me.clone())
            } else {
                LedgerEntry::record(EntryKind::Transfer, me.clone(), *amount, "out", at)
                    .to_account(other.clone())
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_replay_matches_closed_form(
        initial in positive_amount(),
        shape in prop::collection::vec((any::<bool>(), positive_amount()), 0..40),
    ) {
        let me = AccountId::generate();
        let entries = entries(&me, &shape);

        let mut flows = FlowTotals::default();
        for entry in &entries {
            flows.add(&me, entry);
        }

        let replay = replay_from(&me, initial, entries);
        prop_assert_eq!(replay.closing_balance, closed_form_balance(initial, flows));
    }

    #[test]
    fn prop_rewind_agrees_with_replay(
        initial in positive_amount(),
        shape in prop::collection::vec((any::<bool>(), positive_amount()), 1..40),
    ) {
        let me = AccountId::generate();
        let oldest_first = entries(&me, &shape);

        let replay = replay_from(&me, initial, oldest_first.clone());
        let mut newest_first = oldest_first;
        newest_first.reverse();
        let rewound = rewind_from(&me, replay.closing_balance, newest_first);

        let forward: Vec<Decimal> = replay.lines.iter().map(|l| l.balance).collect();
        let mut backward: Vec<Decimal> = rewound.iter().map(|l| l.balance).collect();
        backward.reverse();
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn prop_reconstruction_is_deterministic(
        initial in positive_amount(),
        shape in prop::collection::vec((any::<bool>(), positive_amount()), 0..20),
    ) {
        let me = AccountId::generate();
        let entries = entries(&me, &shape);

        let first = replay_from(&me, initial, entries.clone());
        let second = replay_from(&me, initial, entries);
        prop_assert_eq!(first, second);
    }
}
