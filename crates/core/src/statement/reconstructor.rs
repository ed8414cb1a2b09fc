//! Store-backed statement views.
//!
//! Each view reads several things from the store without a transaction, so it
//! checks its own consistency and re-reads when a commit slipped in between.

use std::sync::Arc;

use ledgerbank_shared::types::{AccountId, CardId};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::period::{ActivityRange, StatementPeriod};
use super::reconstruct::{MovementLine, StatementLine, closed_form_balance, replay_from, rewind_from};
use crate::ledger::{Account, EntryQuery, FlowBound, LedgerEntry, LedgerError, LedgerStore};

/// Default number of activity lines.
pub const DEFAULT_MOVEMENTS_LIMIT: u64 = 10;
/// Largest accepted activity limit.
pub const MAX_MOVEMENTS_LIMIT: u64 = 100;
/// Card movements returned per request.
pub const CARD_MOVEMENTS_LIMIT: u64 = 10;
/// Attempts at a consistent read before giving up with `Conflict`.
pub const DEFAULT_READ_ATTEMPTS: u32 = 3;

/// A month of activity replayed from the opening balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodStatement {
    /// Account the statement is for.
    pub account_id: AccountId,
    /// The month covered.
    pub period: StatementPeriod,
    /// Balance before the first instant of the month.
    pub opening_balance: Decimal,
    /// Balance after the last entry of the month.
    pub closing_balance: Decimal,
    /// Entries of the month, oldest first.
    pub lines: Vec<StatementLine>,
}

/// Reads activity feeds, monthly statements and card movements.
pub struct StatementReconstructor<S: ?Sized = dyn LedgerStore> {
    store: Arc<S>,
    default_limit: u64,
    max_limit: u64,
    read_attempts: u32,
}

impl<S: ?Sized> Clone for StatementReconstructor<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            default_limit: self.default_limit,
            max_limit: self.max_limit,
            read_attempts: self.read_attempts,
        }
    }
}

impl<S: LedgerStore + ?Sized> StatementReconstructor<S> {
    /// Creates a reconstructor with the default limits.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            default_limit: DEFAULT_MOVEMENTS_LIMIT,
            max_limit: MAX_MOVEMENTS_LIMIT,
            read_attempts: DEFAULT_READ_ATTEMPTS,
        }
    }

    /// Overrides the activity feed limits.
    #[must_use]
    pub fn with_limits(mut self, default_limit: u64, max_limit: u64) -> Self {
        self.max_limit = max_limit.max(1);
        self.default_limit = default_limit.clamp(1, self.max_limit);
        self
    }

    /// Overrides how often an inconsistent read is retried.
    #[must_use]
    pub fn with_read_attempts(mut self, attempts: u32) -> Self {
        self.read_attempts = attempts.max(1);
        self
    }

    /// Resolves a caller-supplied limit against the configured bounds.
    #[must_use]
    pub fn effective_limit(&self, requested: Option<u64>) -> u64 {
        requested.unwrap_or(self.default_limit).clamp(1, self.max_limit)
    }

    /// Most recent entries of an account, newest first, with running balances.
    ///
    /// # Errors
    ///
    /// `AccountNotFound`, `Conflict` if commits kept landing during the read,
    /// `PersistenceFailure`.
    pub async fn recent_activity(
        &self,
        account_id: &AccountId,
        range: ActivityRange,
        limit: Option<u64>,
    ) -> Result<Vec<MovementLine>, LedgerError> {
        let limit = self.effective_limit(limit);

        for attempt in 1..=self.read_attempts {
            let account = self.load_account(account_id).await?;
            let entries = self
                .store
                .find_entries(
                    &EntryQuery::for_account(account_id.clone())
                        .between(range.from, range.to)
                        .newest_first()
                        .limit(limit),
                )
                .await?;

            let anchor = match range.to {
                Some(to) => {
                    let later = self.store.account_flows(account_id, FlowBound::After(to)).await?;
                    account.balance - later.net()
                }
                None => account.balance,
            };

            let recheck = self.load_account(account_id).await?;
            if recheck.version == account.version {
                return Ok(rewind_from(account_id, anchor, entries));
            }
            debug!(account_id = %account_id, attempt, "account changed during activity read");
        }

        Err(LedgerError::Conflict(format!("account {account_id} activity")))
    }

    /// Statement for one month: opening balance, replayed lines, closing balance.
    ///
    /// The forward replay is checked against the closed form
    /// `initial + credits - debits` up to the end of the month.
    ///
    /// # Errors
    ///
    /// `AccountNotFound`, `Conflict` if the two never agreed within the read
    /// attempts, `PersistenceFailure`.
    pub async fn period_statement(
        &self,
        account_id: &AccountId,
        period: StatementPeriod,
    ) -> Result<PeriodStatement, LedgerError> {
        let (start, end) = (period.start(), period.end());

        for attempt in 1..=self.read_attempts {
            let account = self.load_account(account_id).await?;
            let before = self.store.account_flows(account_id, FlowBound::Before(start)).await?;
            let opening_balance = closed_form_balance(account.initial_balance, before);

            let entries = self
                .store
                .find_entries(&EntryQuery::for_account(account_id.clone()).between(Some(start), Some(end)))
                .await?;
            let replay = replay_from(account_id, opening_balance, entries);

            let through_end = self.store.account_flows(account_id, FlowBound::UpTo(end)).await?;
            if replay.closing_balance == closed_form_balance(account.initial_balance, through_end) {
                return Ok(PeriodStatement {
                    account_id: account_id.clone(),
                    period,
                    opening_balance,
                    closing_balance: replay.closing_balance,
                    lines: replay.lines,
                });
            }
            debug!(account_id = %account_id, attempt, "statement replay disagreed with closed form");
        }

        Err(LedgerError::Conflict(format!(
            "account {account_id} statement {}",
            period.label()
        )))
    }

    /// Latest top-ups of a card, newest first.
    ///
    /// # Errors
    ///
    /// `CardNotFound` if the card does not exist or belongs to another account.
    pub async fn card_movements(
        &self,
        account_id: &AccountId,
        card_id: &CardId,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let card = self
            .store
            .find_card(card_id)
            .await?
            .filter(|card| &card.account_id == account_id)
            .ok_or_else(|| LedgerError::CardNotFound(card_id.clone()))?;

        Ok(self
            .store
            .find_entries(
                &EntryQuery::for_card(card.id)
                    .newest_first()
                    .limit(CARD_MOVEMENTS_LIMIT),
            )
            .await?)
    }

    async fn load_account(&self, id: &AccountId) -> Result<Account, LedgerError> {
        self.store
            .find_account(id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{
        BankTransfer, Card, CardTopUp, CardType, ManualClock, InMemoryLedgerStore, TransferEngine,
    };
    use chrono::{Duration, TimeZone, Utc};
    use ledgerbank_shared::types::{BankId, OwnerId};
    use rust_decimal_macros::dec;

    struct Fixture {
        store: Arc<InMemoryLedgerStore>,
        clock: Arc<ManualClock>,
        engine: TransferEngine<InMemoryLedgerStore>,
        statements: StatementReconstructor<InMemoryLedgerStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(InMemoryLedgerStore::new());
            let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
            let engine = TransferEngine::new(Arc::clone(&store)).with_clock(clock.clone());
            let statements = StatementReconstructor::new(Arc::clone(&store));
            Self {
                store,
                clock,
                engine,
                statements,
            }
        }

        async fn account(&self, owner: &str, balance: Decimal) -> Account {
            let account = Account::open(OwnerId::new(owner).unwrap(), BankId(1), balance).unwrap();
            self.store.insert_account(&account).await.unwrap();
            account
        }

        async fn transfer_at(
            &self,
            at: chrono::DateTime<Utc>,
            from: &Account,
            to: &Account,
            amount: Decimal,
        ) {
            self.clock.set(at);
            self.engine
                .execute_bank_transfer(&BankTransfer {
                    sender: from.id.clone(),
                    recipient: to.id.clone(),
                    recipient_owner: to.owner_id.clone(),
                    bank_id: to.bank_id,
                    amount,
                    description: format!("{amount}"),
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_period_statement_opening_and_closing() {
        let fx = Fixture::new();
        let me = fx.account("1", dec!(1000)).await;
        let other = fx.account("2", dec!(5000)).await;

        fx.transfer_at(Utc.with_ymd_and_hms(2024, 2, 20, 10, 0, 0).unwrap(), &other, &me, dec!(200))
            .await;
        fx.transfer_at(Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap(), &me, &other, dec!(50))
            .await;

        let statement = fx
            .statements
            .period_statement(&me.id, StatementPeriod::new(2024, 3).unwrap())
            .await
            .unwrap();

        assert_eq!(statement.opening_balance, dec!(1200));
        assert_eq!(statement.closing_balance, dec!(1150));
        assert_eq!(statement.lines.len(), 1);
        assert_eq!(statement.lines[0].debit, dec!(50));
    }

    #[tokio::test]
    async fn test_month_boundaries_are_inclusive() {
        let fx = Fixture::new();
        let me = fx.account("1", dec!(100)).await;
        let other = fx.account("2", dec!(100)).await;
        let period = StatementPeriod::new(2024, 4).unwrap();

        fx.transfer_at(period.start() - Duration::microseconds(1), &me, &other, dec!(1)).await;
        fx.transfer_at(period.start(), &me, &other, dec!(2)).await;
        fx.transfer_at(period.end(), &me, &other, dec!(3)).await;
        fx.transfer_at(period.end() + Duration::microseconds(1), &me, &other, dec!(4)).await;

        let statement = fx.statements.period_statement(&me.id, period).await.unwrap();

        let amounts: Vec<_> = statement.lines.iter().map(|l| l.entry.amount).collect();
        assert_eq!(amounts, vec![dec!(2), dec!(3)]);
        assert_eq!(statement.opening_balance, dec!(99));
        assert_eq!(statement.closing_balance, dec!(94));
    }

    #[tokio::test]
    async fn test_empty_month_is_not_an_error() {
        let fx = Fixture::new();
        let me = fx.account("1", dec!(75)).await;

        let statement = fx
            .statements
            .period_statement(&me.id, StatementPeriod::new(2023, 7).unwrap())
            .await
            .unwrap();

        assert!(statement.lines.is_empty());
        assert_eq!(statement.opening_balance, dec!(75));
        assert_eq!(statement.closing_balance, dec!(75));
    }

    #[tokio::test]
    async fn test_recent_activity_anchors_on_current_balance() {
        let fx = Fixture::new();
        let me = fx.account("1", dec!(100)).await;
        let other = fx.account("2", dec!(500)).await;
        let day = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

        fx.transfer_at(day, &me, &other, dec!(20)).await;
        fx.transfer_at(day + Duration::hours(1), &other, &me, dec!(100)).await;
        fx.transfer_at(day + Duration::hours(2), &me, &other, dec!(30)).await;

        let lines = fx
            .statements
            .recent_activity(&me.id, ActivityRange::default(), None)
            .await
            .unwrap();

        let balances: Vec<_> = lines.iter().map(|l| l.balance).collect();
        assert_eq!(balances, vec![dec!(150), dec!(180), dec!(80)]);
    }

    #[tokio::test]
    async fn test_recent_activity_respects_limit_and_range() {
        let fx = Fixture::new();
        let me = fx.account("1", dec!(100)).await;
        let other = fx.account("2", dec!(0)).await;

        for day in 1..=5 {
            fx.transfer_at(Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap(), &me, &other, dec!(1))
                .await;
        }

        let limited = fx
            .statements
            .recent_activity(&me.id, ActivityRange::default(), Some(2))
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].balance, dec!(95));

        let range = ActivityRange::parse(Some("2024-06-02"), Some("2024-06-03")).unwrap();
        let windowed = fx.statements.recent_activity(&me.id, range, None).await.unwrap();
        assert_eq!(windowed.len(), 2);
        // Balance right after the June 3rd transfer, not the current one.
        assert_eq!(windowed[0].balance, dec!(97));
        assert_eq!(windowed[1].balance, dec!(98));
    }

    #[tokio::test]
    async fn test_limits_are_clamped() {
        let fx = Fixture::new();
        assert_eq!(fx.statements.effective_limit(None), 10);
        assert_eq!(fx.statements.effective_limit(Some(0)), 1);
        assert_eq!(fx.statements.effective_limit(Some(1000)), 100);
    }

    #[tokio::test]
    async fn test_card_movements_require_ownership() {
        let fx = Fixture::new();
        let me = fx.account("1", dec!(100)).await;
        let stranger = fx.account("2", dec!(100)).await;
        let card = Card::issue(me.id.clone(), CardType::Credit, Utc::now());
        fx.store.insert_card(&card).await.unwrap();

        fx.engine
            .execute_card_top_up(&CardTopUp {
                sender: me.id.clone(),
                card_id: card.id.clone(),
                amount: dec!(25),
            })
            .await
            .unwrap();

        let mine = fx.statements.card_movements(&me.id, &card.id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].amount, dec!(25));

        let err = fx.statements.card_movements(&stranger.id, &card.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::CardNotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let fx = Fixture::new();
        let err = fx
            .statements
            .recent_activity(&AccountId::generate(), ActivityRange::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(_)));
    }
}
