//! Persistence boundary of the ledger.
//!
//! The engine, the registry and the statement reconstructor only talk to
//! storage through [`LedgerStore`]. Implementations must make `commit`
//! all-or-nothing and must only ever expose committed state to readers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledgerbank_shared::types::{AccountId, CardId, OwnerId, ServiceId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{Account, Card, LedgerEntry, Service};

/// Errors reported by a ledger store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A versioned row changed since it was read.
    #[error("stale version: {0}")]
    Conflict(String),

    /// The primary key of an inserted row is already taken.
    #[error("identifier already in use: {0}")]
    DuplicateId(String),

    /// Some other uniqueness constraint was violated.
    #[error("duplicate value: {0}")]
    Duplicate(String),

    /// The backend failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// A compare-and-swap balance change on a versioned row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceUpdate<I> {
    /// Row to update.
    pub id: I,
    /// Version observed when the row was read.
    pub expected_version: i64,
    /// Balance to write.
    pub new_balance: Decimal,
}

impl BalanceUpdate<AccountId> {
    /// Debits `amount` from the account snapshot.
    #[must_use]
    pub fn debit_account(account: &Account, amount: Decimal) -> Self {
        Self {
            id: account.id.clone(),
            expected_version: account.version,
            new_balance: account.balance - amount,
        }
    }

    /// Credits `amount` to the account snapshot.
    #[must_use]
    pub fn credit_account(account: &Account, amount: Decimal) -> Self {
        Self {
            id: account.id.clone(),
            expected_version: account.version,
            new_balance: account.balance + amount,
        }
    }
}

impl BalanceUpdate<CardId> {
    /// Credits `amount` to the card snapshot.
    #[must_use]
    pub fn credit_card(card: &Card, amount: Decimal) -> Self {
        Self {
            id: card.id.clone(),
            expected_version: card.version,
            new_balance: card.balance + amount,
        }
    }
}

/// Everything one transfer writes, applied as a single unit.
#[derive(Debug, Clone)]
pub struct LedgerCommit {
    /// Account balance changes.
    pub accounts: Vec<BalanceUpdate<AccountId>>,
    /// Card balance change, for card top-ups.
    pub card: Option<BalanceUpdate<CardId>>,
    /// The entry witnessing the change.
    pub entry: LedgerEntry,
}

/// Whose entries to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySubject {
    /// Entries where the account is source or beneficiary.
    Account(AccountId),
    /// Entries topping up the card.
    Card(CardId),
}

/// Order of returned entries. Ties on timestamp are broken by entry id in
/// the same direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrder {
    /// Oldest first.
    Ascending,
    /// Newest first.
    Descending,
}

/// Filter for [`LedgerStore::find_entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryQuery {
    /// Whose entries.
    pub subject: EntrySubject,
    /// Inclusive lower bound on `recorded_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `recorded_at`.
    pub to: Option<DateTime<Utc>>,
    /// Result order.
    pub order: EntryOrder,
    /// Maximum number of entries.
    pub limit: Option<u64>,
}

impl EntryQuery {
    /// All entries touching `account`, oldest first.
    #[must_use]
    pub fn for_account(account: AccountId) -> Self {
        Self {
            subject: EntrySubject::Account(account),
            from: None,
            to: None,
            order: EntryOrder::Ascending,
            limit: None,
        }
    }

    /// All entries topping up `card`, oldest first.
    #[must_use]
    pub fn for_card(card: CardId) -> Self {
        Self {
            subject: EntrySubject::Card(card),
            from: None,
            to: None,
            order: EntryOrder::Ascending,
            limit: None,
        }
    }

    /// Restricts to `[from, to]`, either side optional.
    #[must_use]
    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Newest first.
    #[must_use]
    pub fn newest_first(mut self) -> Self {
        self.order = EntryOrder::Descending;
        self
    }

    /// Caps the result size.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if `entry` passes the subject and time filters.
    #[must_use]
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        let subject = match &self.subject {
            EntrySubject::Account(id) => {
                &entry.source_account_id == id || entry.beneficiary_account_id.as_ref() == Some(id)
            }
            EntrySubject::Card(id) => entry.card_id.as_ref() == Some(id),
        };

        subject
            && self.from.is_none_or(|from| entry.recorded_at >= from)
            && self.to.is_none_or(|to| entry.recorded_at <= to)
    }
}

/// Time bound for [`LedgerStore::account_flows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowBound {
    /// Entries recorded strictly before the instant.
    Before(DateTime<Utc>),
    /// Entries recorded at or before the instant.
    UpTo(DateTime<Utc>),
    /// Entries recorded strictly after the instant.
    After(DateTime<Utc>),
}

impl FlowBound {
    /// Returns true if `at` falls inside the bound.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        match *self {
            Self::Before(t) => at < t,
            Self::UpTo(t) => at <= t,
            Self::After(t) => at > t,
        }
    }
}

/// Sums of money in and out of an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowTotals {
    /// Sum of entries where the account is beneficiary.
    pub credits: Decimal,
    /// Sum of entries where the account is source.
    pub debits: Decimal,
}

impl FlowTotals {
    /// Credits minus debits.
    #[must_use]
    pub fn net(&self) -> Decimal {
        self.credits - self.debits
    }

    /// Folds one entry into the totals as seen from `account`.
    pub fn add(&mut self, account: &AccountId, entry: &LedgerEntry) {
        if &entry.source_account_id == account {
            self.debits += entry.amount;
        } else if entry.beneficiary_account_id.as_ref() == Some(account) {
            self.credits += entry.amount;
        }
    }
}

/// Storage for accounts, cards, services and ledger entries.
///
/// No method updates or deletes a `LedgerEntry`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Finds an account by id.
    async fn find_account(&self, id: &AccountId) -> Result<Option<Account>, StoreError>;

    /// Finds the account owned by a person.
    async fn find_account_by_owner(&self, owner: &OwnerId)
    -> Result<Option<Account>, StoreError>;

    /// Inserts a new account. A taken id yields `StoreError::DuplicateId`.
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Stores a special PIN hash. Returns false if the account does not exist.
    async fn set_special_pin_hash(
        &self,
        id: &AccountId,
        pin_hash: &str,
    ) -> Result<bool, StoreError>;

    /// Finds a card by id.
    async fn find_card(&self, id: &CardId) -> Result<Option<Card>, StoreError>;

    /// Lists the cards of an account, oldest first.
    async fn find_cards_by_account(&self, account: &AccountId) -> Result<Vec<Card>, StoreError>;

    /// Inserts a new card. A taken id yields `StoreError::DuplicateId`.
    async fn insert_card(&self, card: &Card) -> Result<(), StoreError>;

    /// Finds a service by id.
    async fn find_service(&self, id: ServiceId) -> Result<Option<Service>, StoreError>;

    /// Lists all services ordered by id.
    async fn list_services(&self) -> Result<Vec<Service>, StoreError>;

    /// Reads committed entries matching the query.
    async fn find_entries(&self, query: &EntryQuery) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Sums credits and debits of an account within a time bound.
    async fn account_flows(
        &self,
        account: &AccountId,
        bound: FlowBound,
    ) -> Result<FlowTotals, StoreError>;

    /// Applies every balance update and inserts the entry, or nothing.
    ///
    /// A stale `expected_version` yields `StoreError::Conflict`; a taken entry
    /// id yields `StoreError::DuplicateId`.
    async fn commit(&self, commit: &LedgerCommit) -> Result<(), StoreError>;
}
