//! Ledger domain types.
//!
//! Accounts and cards are the mutable records; every balance change is
//! witnessed by exactly one immutable `LedgerEntry`.

use chrono::{DateTime, Duration, Months, Utc};
use ledgerbank_shared::types::{AccountId, BankId, CardId, EntryId, OwnerId, ServiceId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::LedgerError;

/// How long an issued card stays valid.
pub const CARD_VALIDITY_MONTHS: u32 = 24;

/// Fixed description recorded on card top-up entries.
pub const CARD_TOP_UP_DESCRIPTION: &str = "Card top-up";

/// A customer's bank account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// 16-digit account number.
    pub id: AccountId,
    /// National id of the owning person.
    pub owner_id: OwnerId,
    /// Bank the account is held at.
    pub bank_id: BankId,
    /// Current balance.
    pub balance: Decimal,
    /// Balance at creation. Never changes afterwards.
    pub initial_balance: Decimal,
    /// Argon2 hash of the special PIN, if one was set.
    #[serde(skip_serializing)]
    pub special_pin_hash: Option<String>,
    /// Optimistic concurrency counter, bumped on every balance change.
    pub version: i64,
}

impl Account {
    /// Opens a fresh account with a newly drawn id.
    ///
    /// The balance starts equal to `initial_balance`, no special PIN is set
    /// and the version is 0.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidAmount` if `initial_balance` is negative.
    pub fn open(
        owner_id: OwnerId,
        bank_id: BankId,
        initial_balance: Decimal,
    ) -> Result<Self, LedgerError> {
        if initial_balance < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(initial_balance));
        }

        Ok(Self {
            id: AccountId::generate(),
            owner_id,
            bank_id,
            balance: initial_balance,
            initial_balance,
            special_pin_hash: None,
            version: 0,
        })
    }

    /// Draws a new account number, used after a primary key collision.
    pub fn regenerate_id(&mut self) {
        self.id = AccountId::generate();
    }

    /// Returns true if `amount` can be debited without going negative.
    #[must_use]
    pub fn can_cover(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}

/// Card product type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    /// Credit card.
    #[default]
    Credit,
    /// Debit card.
    Debit,
}

impl CardType {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            other => Err(LedgerError::InvalidRequest(format!(
                "unknown card type: {other}"
            ))),
        }
    }
}

/// A card attached to an account, carrying its own sub-balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    /// 16-digit card number.
    pub id: CardId,
    /// Account the card belongs to.
    pub account_id: AccountId,
    /// Credit or debit.
    pub card_type: CardType,
    /// Sub-balance, raised by top-ups.
    pub balance: Decimal,
    /// 3-digit verification code.
    pub cvc: String,
    /// Instant after which the card is no longer valid.
    pub expires_at: DateTime<Utc>,
    /// When the card was issued.
    pub issued_at: DateTime<Utc>,
    /// Optimistic concurrency counter.
    pub version: i64,
}

impl Card {
    /// Issues a new card with zero balance that expires two years after `now`.
    #[must_use]
    pub fn issue(account_id: AccountId, card_type: CardType, now: DateTime<Utc>) -> Self {
        let expires_at = now
            .checked_add_months(Months::new(CARD_VALIDITY_MONTHS))
            .unwrap_or_else(|| now + Duration::days(730));

        Self {
            id: CardId::generate(),
            account_id,
            card_type,
            balance: Decimal::ZERO,
            cvc: ledgerbank_shared::types::new_identifier(
                ledgerbank_shared::types::CARD_CVC_DIGITS,
            ),
            expires_at,
            issued_at: now,
            version: 0,
        }
    }

    /// Draws a new card number, used after a primary key collision.
    pub fn regenerate_id(&mut self) {
        self.id = CardId::generate();
    }

    /// Returns true if the card has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// What kind of movement an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Account-to-account transfer.
    #[serde(rename = "transfer")]
    Transfer,
    /// Payment of a registered service.
    #[serde(rename = "payment")]
    Payment,
    /// Top-up of a card sub-balance.
    #[serde(rename = "transfer-tdc")]
    CardTopUp,
}

impl EntryKind {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Payment => "payment",
            Self::CardTopUp => "transfer-tdc",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer" => Ok(Self::Transfer),
            "payment" => Ok(Self::Payment),
            "transfer-tdc" => Ok(Self::CardTopUp),
            other => Err(LedgerError::InvalidRequest(format!(
                "unknown entry kind: {other}"
            ))),
        }
    }
}

/// Which side of an entry an account sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Money left the account.
    #[serde(rename = "Debito")]
    Debit,
    /// Money arrived at the account.
    #[serde(rename = "Credito")]
    Credit,
}

/// An immutable record of one committed movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    /// 13-digit entry id.
    pub id: EntryId,
    /// Account the money left.
    pub source_account_id: AccountId,
    /// Account the money went to, if any.
    pub beneficiary_account_id: Option<AccountId>,
    /// Card topped up, for card top-ups.
    pub card_id: Option<CardId>,
    /// Strictly positive amount.
    pub amount: Decimal,
    /// Movement kind.
    pub kind: EntryKind,
    /// Free text supplied by the caller.
    pub description: String,
    /// Commit time, UTC.
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Records a new entry debiting `source` with a fresh 13-digit id.
    ///
    /// Attach the counterparty with [`Self::to_account`] or [`Self::for_card`].
    #[must_use]
    pub fn record(
        kind: EntryKind,
        source: AccountId,
        amount: Decimal,
        description: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            source_account_id: source,
            beneficiary_account_id: None,
            card_id: None,
            amount,
            kind,
            description: description.into(),
            recorded_at,
        }
    }

    /// Sets the beneficiary account.
    #[must_use]
    pub fn to_account(mut self, beneficiary: AccountId) -> Self {
        self.beneficiary_account_id = Some(beneficiary);
        self
    }

    /// Sets the topped-up card.
    #[must_use]
    pub fn for_card(mut self, card: CardId) -> Self {
        self.card_id = Some(card);
        self
    }

    /// Draws a new entry id, used after a primary key collision.
    pub fn regenerate_id(&mut self) {
        self.id = EntryId::generate();
    }

    /// Direction of this entry as seen from `account`.
    #[must_use]
    pub fn direction_for(&self, account: &AccountId) -> Direction {
        if &self.source_account_id == account {
            Direction::Debit
        } else {
            Direction::Credit
        }
    }

    /// Signed effect of this entry on `account`'s balance.
    #[must_use]
    pub fn signed_amount_for(&self, account: &AccountId) -> Decimal {
        match self.direction_for(account) {
            Direction::Debit => -self.amount,
            Direction::Credit => self.amount,
        }
    }
}

/// A payable service with a fixed beneficiary account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Service id.
    pub id: ServiceId,
    /// Human readable name.
    pub description: String,
    /// What the payer must supply, e.g. a contract number.
    pub field_label: String,
    /// Smallest accepted payment.
    pub minimum_amount: Decimal,
    /// Account the payments are recorded against.
    pub beneficiary_account_id: AccountId,
}
