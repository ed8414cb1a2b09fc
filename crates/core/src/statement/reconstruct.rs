//! Pure balance reconstruction over ordered entries.

use ledgerbank_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::{Direction, FlowTotals, LedgerEntry};

/// One entry of the activity feed with the balance right after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementLine {
    /// The entry.
    #[serde(flatten)]
    pub entry: LedgerEntry,
    /// Side of the entry the account is on.
    pub direction: Direction,
    /// Account balance after the entry.
    pub balance: Decimal,
}

/// One statement row with split debit and credit columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementLine {
    /// The entry.
    #[serde(flatten)]
    pub entry: LedgerEntry,
    /// Side of the entry the account is on.
    pub direction: Direction,
    /// Amount leaving the account, zero on credits.
    pub debit: Decimal,
    /// Amount arriving at the account, zero on debits.
    pub credit: Decimal,
    /// Account balance after the entry.
    pub balance: Decimal,
}

/// Result of replaying a window forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    /// One line per entry, oldest first.
    pub lines: Vec<StatementLine>,
    /// Balance after the last line, or the opening balance when empty.
    pub closing_balance: Decimal,
}

/// Annotates newest-first entries with balances derived backward from
/// `anchor`, the balance right after the newest entry.
///
/// Each older line undoes the line one position newer: a debit is added back
/// and a credit is taken away.
#[must_use]
pub fn rewind_from(
    account: &AccountId,
    anchor: Decimal,
    newest_first: Vec<LedgerEntry>,
) -> Vec<MovementLine> {
    let mut balance = anchor;
    let mut lines: Vec<MovementLine> = Vec::with_capacity(newest_first.len());

    for entry in newest_first {
        if let Some(newer) = lines.last() {
            balance -= newer.entry.signed_amount_for(account);
        }
        lines.push(MovementLine {
            direction: entry.direction_for(account),
            entry,
            balance,
        });
    }

    lines
}

/// Replays oldest-first entries forward from `opening`.
#[must_use]
pub fn replay_from(account: &AccountId, opening: Decimal, oldest_first: Vec<LedgerEntry>) -> Replay {
    let mut balance = opening;
    let lines = oldest_first
        .into_iter()
        .map(|entry| {
            let direction = entry.direction_for(account);
            let (debit, credit) = match direction {
                Direction::Debit => (entry.amount, Decimal::ZERO),
                Direction::Credit => (Decimal::ZERO, entry.amount),
            };
            balance += credit - debit;
            StatementLine {
                entry,
                direction,
                debit,
                credit,
                balance,
            }
        })
        .collect();

    Replay {
        lines,
        closing_balance: balance,
    }
}

/// `initial + credits - debits`.
#[must_use]
pub fn closed_form_balance(initial: Decimal, flows: FlowTotals) -> Decimal {
    initial + flows.net()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::EntryKind;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn entry(from: &AccountId, to: &AccountId, amount: Decimal) -> LedgerEntry {
        LedgerEntry::record(
            EntryKind::Transfer,
            from.clone(),
            amount,
            "t",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
        .to_account(to.clone())
    }

    #[test]
    fn test_rewind_matches_worked_example() {
        let me = AccountId::generate();
        let other = AccountId::generate();
        // Newest first: debit 30, credit 100, debit 20; current balance 150.
        let lines = rewind_from(
            &me,
            dec!(150),
            vec![
                entry(&me, &other, dec!(30)),
                entry(&other, &me, dec!(100)),
                entry(&me, &other, dec!(20)),
            ],
        );

        let balances: Vec<_> = lines.iter().map(|l| l.balance).collect();
        assert_eq!(balances, vec![dec!(150), dec!(180), dec!(80)]);
        assert_eq!(lines[0].direction, Direction::Debit);
        assert_eq!(lines[1].direction, Direction::Credit);
    }

    #[test]
    fn test_replay_splits_columns() {
        let me = AccountId::generate();
        let other = AccountId::generate();
        let replay = replay_from(
            &me,
            dec!(1200),
            vec![entry(&me, &other, dec!(50)), entry(&other, &me, dec!(5))],
        );

        assert_eq!(replay.closing_balance, dec!(1155));
        assert_eq!(replay.lines[0].debit, dec!(50));
        assert_eq!(replay.lines[0].credit, Decimal::ZERO);
        assert_eq!(replay.lines[0].balance, dec!(1150));
        assert_eq!(replay.lines[1].credit, dec!(5));
    }

    #[test]
    fn test_empty_inputs() {
        let me = AccountId::generate();
        assert!(rewind_from(&me, dec!(10), Vec::new()).is_empty());
        let replay = replay_from(&me, dec!(10), Vec::new());
        assert_eq!(replay.closing_balance, dec!(10));
        assert!(replay.lines.is_empty());
    }

    #[test]
    fn test_movement_line_serializes_flat() {
        let me = AccountId::generate();
        let other = AccountId::generate();
        let line = rewind_from(&me, dec!(5), vec![entry(&other, &me, dec!(5))]).remove(0);

        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["direction"], "Credito");
        assert_eq!(json["kind"], "transfer");
        assert!(json.get("entry").is_none());
    }
}
