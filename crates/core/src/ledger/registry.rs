//! Account and card lifecycle: opening, issuing, listing, PIN setup.

use std::sync::Arc;

use ledgerbank_shared::types::{AccountId, BankId, OwnerId};
use rust_decimal::Decimal;
use tracing::info;

use super::clock::{Clock, SystemClock};
use super::error::LedgerError;
use super::identifier::IdentifierPolicy;
use super::store::LedgerStore;
use super::types::{Account, Card, CardType};
use crate::auth::{PasswordError, hash_password};

/// Creates accounts and cards and manages special PINs.
pub struct LedgerRegistry<S: ?Sized = dyn LedgerStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    identifiers: IdentifierPolicy,
}

impl<S: ?Sized> Clone for LedgerRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            identifiers: self.identifiers,
        }
    }
}

impl<S: LedgerStore + ?Sized> LedgerRegistry<S> {
    /// Creates a registry on the wall clock.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            identifiers: IdentifierPolicy::default(),
        }
    }

    /// Uses `clock` for card issue dates.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bounds identifier regeneration on collisions.
    #[must_use]
    pub fn with_identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifiers = policy;
        self
    }

    /// Opens an account for `owner` at `bank`.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` for a negative initial balance, `InvalidRequest` if the
    /// owner already has an account, `IdentifierExhausted` or
    /// `PersistenceFailure` from the insert.
    pub async fn open_account(
        &self,
        owner: OwnerId,
        bank: BankId,
        initial_balance: Decimal,
    ) -> Result<Account, LedgerError> {
        let account = Account::open(owner, bank, initial_balance)?;

        let account = self
            .identifiers
            .insert_with_fresh_id("account", account, Account::regenerate_id, |candidate| async move {
                self.store.insert_account(&candidate).await
            })
            .await?;

        info!(account_id = %account.id, owner_id = %account.owner_id, "account opened");
        Ok(account)
    }

    /// Issues a new card on an existing account.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if the account does not exist, `IdentifierExhausted`
    /// or `PersistenceFailure` from the insert.
    pub async fn issue_card(
        &self,
        account_id: &AccountId,
        card_type: CardType,
    ) -> Result<Card, LedgerError> {
        self.store
            .find_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.clone()))?;

        let card = Card::issue(account_id.clone(), card_type, self.clock.now());
        let card = self
            .identifiers
            .insert_with_fresh_id("card", card, Card::regenerate_id, |candidate| async move {
                self.store.insert_card(&candidate).await
            })
            .await?;

        info!(card_id = %card.id, account_id = %account_id, card_type = %card.card_type, "card issued");
        Ok(card)
    }

    /// Lists the cards of an account, oldest first.
    ///
    /// # Errors
    ///
    /// `PersistenceFailure` if the store fails.
    pub async fn cards_for_account(&self, account_id: &AccountId) -> Result<Vec<Card>, LedgerError> {
        Ok(self.store.find_cards_by_account(account_id).await?)
    }

    /// Hashes and stores a new special PIN, replacing any previous one.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a blank PIN, `AccountNotFound` if the account
    /// does not exist.
    pub async fn set_special_pin(&self, account_id: &AccountId, pin: &str) -> Result<(), LedgerError> {
        let hash = hash_password(pin).map_err(|err| match err {
            PasswordError::Blank => {
                LedgerError::InvalidRequest("special PIN must not be blank".to_string())
            }
            other => LedgerError::Internal(other.to_string()),
        })?;

        if !self.store.set_special_pin_hash(account_id, &hash).await? {
            return Err(LedgerError::AccountNotFound(account_id.clone()));
        }

        info!(account_id = %account_id, "special PIN updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_special_pin;
    use crate::ledger::clock::ManualClock;
    use crate::ledger::memory::InMemoryLedgerStore;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn registry() -> (Arc<InMemoryLedgerStore>, LedgerRegistry<InMemoryLedgerStore>) {
        let store = Arc::new(InMemoryLedgerStore::new());
        (Arc::clone(&store), LedgerRegistry::new(store))
    }

    #[tokio::test]
    async fn test_open_account_persists() {
        let (store, registry) = registry();
        let owner = OwnerId::new("1717").unwrap();

        let account = registry.open_account(owner.clone(), BankId(1), Decimal::ZERO).await.unwrap();

        let stored = store.find_account_by_owner(&owner).await.unwrap().unwrap();
        assert_eq!(stored, account);
    }

    #[tokio::test]
    async fn test_second_account_for_owner_rejected() {
        let (_, registry) = registry();
        let owner = OwnerId::new("1717").unwrap();
        registry.open_account(owner.clone(), BankId(1), Decimal::ZERO).await.unwrap();

        let err = registry.open_account(owner, BankId(1), Decimal::ZERO).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_issue_card_uses_clock() {
        let (store, registry) = registry();
        let issued = Utc.with_ymd_and_hms(2025, 1, 10, 9, 30, 0).unwrap();
        let registry = registry.with_clock(Arc::new(ManualClock::new(issued)));
        let account = registry
            .open_account(OwnerId::new("5").unwrap(), BankId(1), dec!(10))
            .await
            .unwrap();

        let card = registry.issue_card(&account.id, CardType::Debit).await.unwrap();

        assert_eq!(card.issued_at, issued);
        assert_eq!(card.expires_at, Utc.with_ymd_and_hms(2027, 1, 10, 9, 30, 0).unwrap());
        let cards = registry.cards_for_account(&account.id).await.unwrap();
        assert_eq!(cards, vec![card.clone()]);
        assert!(store.find_card(&card.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_issue_card_for_unknown_account() {
        let (_, registry) = registry();
        let err = registry.issue_card(&AccountId::generate(), CardType::Credit).await.unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn test_set_special_pin_is_hashed() {
        let (store, registry) = registry();
        let account = registry
            .open_account(OwnerId::new("8").unwrap(), BankId(1), Decimal::ZERO)
            .await
            .unwrap();

        registry.set_special_pin(&account.id, "9090").await.unwrap();

        let stored = store.find_account(&account.id).await.unwrap().unwrap();
        let hash = stored.special_pin_hash.unwrap();
        assert_ne!(hash, "9090");
        assert!(verify_special_pin(Some(&hash), Some("9090")).is_ok());
    }

    #[tokio::test]
    async fn test_blank_pin_rejected() {
        let (_, registry) = registry();
        let account = registry
            .open_account(OwnerId::new("8").unwrap(), BankId(1), Decimal::ZERO)
            .await
            .unwrap();

        let err = registry.set_special_pin(&account.id, " ").await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_pin_is_stored_as_sent() {
        let (store, registry) = registry();
        let account = registry
            .open_account(OwnerId::new("8").unwrap(), BankId(1), Decimal::ZERO)
            .await
            .unwrap();

        registry.set_special_pin(&account.id, " 4321").await.unwrap();

        let hash = store.find_account(&account.id).await.unwrap().unwrap().special_pin_hash.unwrap();
        assert!(verify_special_pin(Some(&hash), Some(" 4321")).is_ok());
        assert!(verify_special_pin(Some(&hash), Some("4321")).is_err());
    }
}
