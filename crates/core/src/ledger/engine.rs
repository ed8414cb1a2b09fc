//! Transfer engine.
//!
//! Each operation reads snapshots, validates, computes the new balances as
//! values and hands everything to [`LedgerStore::commit`] in one unit. No
//! write happens before that commit, so a rejected or failed operation has
//! no side effects.

use std::future::Future;
use std::sync::Arc;

use ledgerbank_shared::types::{AccountId, BankId, CardId, OwnerId, ServiceId};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::error::LedgerError;
use super::identifier::IdentifierPolicy;
use super::store::{BalanceUpdate, LedgerCommit, LedgerStore, StoreError};
use super::types::{Account, CARD_TOP_UP_DESCRIPTION, EntryKind, LedgerEntry};

/// Fractional digits an amount may carry; the store keeps four.
pub const AMOUNT_SCALE: u32 = 4;

/// Move money from one account to another.
#[derive(Debug, Clone)]
pub struct BankTransfer {
    /// Paying account.
    pub sender: AccountId,
    /// Receiving account.
    pub recipient: AccountId,
    /// Who the sender believes owns the receiving account.
    pub recipient_owner: OwnerId,
    /// Bank the sender believes holds the receiving account.
    pub bank_id: BankId,
    /// Amount to move.
    pub amount: Decimal,
    /// Free text for the entry.
    pub description: String,
}

/// Move money from an account onto a card sub-balance.
#[derive(Debug, Clone)]
pub struct CardTopUp {
    /// Paying account.
    pub sender: AccountId,
    /// Card to top up.
    pub card_id: CardId,
    /// Amount to move.
    pub amount: Decimal,
}

/// Pay a registered service.
#[derive(Debug, Clone)]
pub struct ServicePayment {
    /// Paying account.
    pub sender: AccountId,
    /// Service being paid.
    pub service_id: ServiceId,
    /// Amount to pay.
    pub amount: Decimal,
    /// Value of the service's field, e.g. a contract number.
    pub field_description: String,
}

/// Executes transfers against a [`LedgerStore`].
pub struct TransferEngine<S: ?Sized = dyn LedgerStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    identifiers: IdentifierPolicy,
    conflict_retries: u32,
}

impl<S: ?Sized> Clone for TransferEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            identifiers: self.identifiers,
            conflict_retries: self.conflict_retries,
        }
    }
}

impl<S: LedgerStore + ?Sized> TransferEngine<S> {
    /// Creates an engine on the wall clock that never re-runs on conflict.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            identifiers: IdentifierPolicy::default(),
            conflict_retries: 0,
        }
    }

    /// Uses `clock` to stamp entries.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bounds entry id regeneration.
    #[must_use]
    pub fn with_identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifiers = policy;
        self
    }

    /// Re-runs an operation that lost a version race up to `retries` times.
    #[must_use]
    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }

    /// Transfers money between two accounts.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `InvalidRequest` (sender is recipient),
    /// `AccountNotFound`, `BankMismatch`, `OwnerMismatch`, `InsufficientFunds`,
    /// `Conflict`, `IdentifierExhausted`, `PersistenceFailure`.
    pub async fn execute_bank_transfer(
        &self,
        request: &BankTransfer,
    ) -> Result<LedgerEntry, LedgerError> {
        self.retry_on_conflict("bank_transfer", || self.try_bank_transfer(request))
            .await
    }

    /// Moves money from an account onto a card.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `AccountNotFound`, `CardNotFound`, `InsufficientFunds`,
    /// `Conflict`, `IdentifierExhausted`, `PersistenceFailure`.
    pub async fn execute_card_top_up(
        &self,
        request: &CardTopUp,
    ) -> Result<LedgerEntry, LedgerError> {
        self.retry_on_conflict("card_top_up", || self.try_card_top_up(request))
            .await
    }

    /// Pays a service from an account.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `AccountNotFound`, `ServiceNotFound`,
    /// `MinimumAmountNotMet`, `InsufficientFunds`, `Conflict`,
    /// `IdentifierExhausted`, `PersistenceFailure`.
    pub async fn execute_service_payment(
        &self,
        request: &ServicePayment,
    ) -> Result<LedgerEntry, LedgerError> {
        self.retry_on_conflict("service_payment", || self.try_service_payment(request))
            .await
    }

    async fn try_bank_transfer(&self, request: &BankTransfer) -> Result<LedgerEntry, LedgerError> {
        validate_amount(request.amount)?;
        if request.sender == request.recipient {
            return Err(LedgerError::InvalidRequest(
                "sender and recipient must be different accounts".to_string(),
            ));
        }

        let sender = self.load_account(&request.sender).await?;
        let recipient = self.load_account(&request.recipient).await?;

        if recipient.bank_id != request.bank_id {
            return Err(LedgerError::BankMismatch {
                declared: request.bank_id,
                actual: recipient.bank_id,
            });
        }
        if recipient.owner_id != request.recipient_owner {
            return Err(LedgerError::OwnerMismatch);
        }
        ensure_funds(&sender, request.amount)?;

        let entry = LedgerEntry::record(
            EntryKind::Transfer,
            sender.id.clone(),
            request.amount,
            request.description.clone(),
            self.clock.now(),
        )
        .to_account(recipient.id.clone());

        self.commit(LedgerCommit {
            accounts: vec![
                BalanceUpdate::debit_account(&sender, request.amount),
                BalanceUpdate::credit_account(&recipient, request.amount),
            ],
            card: None,
            entry,
        })
        .await
    }

    async fn try_card_top_up(&self, request: &CardTopUp) -> Result<LedgerEntry, LedgerError> {
        validate_amount(request.amount)?;

        let sender = self.load_account(&request.sender).await?;
        let card = self
            .store
            .find_card(&request.card_id)
            .await?
            .ok_or_else(|| LedgerError::CardNotFound(request.card_id.clone()))?;

        ensure_funds(&sender, request.amount)?;

        let entry = LedgerEntry::record(
            EntryKind::CardTopUp,
            sender.id.clone(),
            request.amount,
            CARD_TOP_UP_DESCRIPTION,
            self.clock.now(),
        )
        .for_card(card.id.clone());

        self.commit(LedgerCommit {
            accounts: vec![BalanceUpdate::debit_account(&sender, request.amount)],
            card: Some(BalanceUpdate::credit_card(&card, request.amount)),
            entry,
        })
        .await
    }

    async fn try_service_payment(
        &self,
        request: &ServicePayment,
    ) -> Result<LedgerEntry, LedgerError> {
        validate_amount(request.amount)?;

        let sender = self.load_account(&request.sender).await?;
        let service = self
            .store
            .find_service(request.service_id)
            .await?
            .ok_or(LedgerError::ServiceNotFound(request.service_id))?;

        if request.amount < service.minimum_amount {
            return Err(LedgerError::MinimumAmountNotMet {
                minimum: service.minimum_amount,
                amount: request.amount,
            });
        }
        ensure_funds(&sender, request.amount)?;

        // Only the payer's balance moves; the entry names the service account.
        let entry = LedgerEntry::record(
            EntryKind::Payment,
            sender.id.clone(),
            request.amount,
            request.field_description.clone(),
            self.clock.now(),
        )
        .to_account(service.beneficiary_account_id);

        self.commit(LedgerCommit {
            accounts: vec![BalanceUpdate::debit_account(&sender, request.amount)],
            card: None,
            entry,
        })
        .await
    }

    async fn load_account(&self, id: &AccountId) -> Result<Account, LedgerError> {
        self.store
            .find_account(id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(id.clone()))
    }

    /// Commits, drawing a new entry id whenever the current one is taken.
    async fn commit(&self, mut commit: LedgerCommit) -> Result<LedgerEntry, LedgerError> {
        for attempt in 1..=self.identifiers.max_attempts {
            match self.store.commit(&commit).await {
                Ok(()) => return Ok(commit.entry),
                Err(StoreError::DuplicateId(id)) => {
                    debug!(attempt, entry_id = %id, "entry id collision, drawing a new one");
                    commit.entry.regenerate_id();
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(LedgerError::IdentifierExhausted {
            kind: "ledger entry",
            attempts: self.identifiers.max_attempts,
        })
    }

    async fn retry_on_conflict<F, Fut>(
        &self,
        operation: &'static str,
        run: F,
    ) -> Result<LedgerEntry, LedgerError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<LedgerEntry, LedgerError>>,
    {
        let mut attempt = 0;
        loop {
            match run().await {
                Err(LedgerError::Conflict(what)) if attempt < self.conflict_retries => {
                    attempt += 1;
                    warn!(operation, attempt, %what, "lost a concurrent update, re-running");
                }
                other => return other,
            }
        }
    }
}

fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount));
    }
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(LedgerError::InvalidRequest(format!(
            "amount {amount} has more than {AMOUNT_SCALE} decimal places"
        )));
    }
    Ok(())
}

fn ensure_funds(sender: &Account, amount: Decimal) -> Result<(), LedgerError> {
    if !sender.can_cover(amount) {
        return Err(LedgerError::InsufficientFunds {
            available: sender.balance,
            requested: amount,
        });
    }
    Ok(())
}
