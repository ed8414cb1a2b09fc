//! In-memory `LedgerStore`.
//!
//! All state sits behind one `RwLock`; `commit` checks every version and the
//! entry id under the write lock before touching anything, so a failed commit
//! leaves no trace and readers only ever see whole commits.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use ledgerbank_shared::types::{AccountId, CardId, EntryId, OwnerId, ServiceId};
use tokio::sync::{Mutex, RwLock};

use super::store::{
    EntryOrder, EntryQuery, FlowBound, FlowTotals, LedgerCommit, LedgerStore, StoreError,
};
use super::types::{Account, Card, LedgerEntry, Service};

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    cards: HashMap<CardId, Card>,
    services: BTreeMap<ServiceId, Service>,
    entries: Vec<LedgerEntry>,
    entry_ids: HashSet<EntryId>,
}

/// Ledger store held entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<State>,
    injected_failure: Mutex<Option<StoreError>>,
}

impl InMemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service.
    pub async fn add_service(&self, service: Service) {
        self.state.write().await.services.insert(service.id, service);
    }

    /// Makes the next `commit` fail with `error` without applying anything.
    pub async fn fail_next_commit(&self, error: StoreError) {
        *self.injected_failure.lock().await = Some(error);
    }

    /// Number of committed entries.
    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }
}

fn sort_entries(entries: &mut [LedgerEntry], order: EntryOrder) {
    entries.sort_by(|a, b| {
        let ascending = a
            .recorded_at
            .cmp(&b.recorded_at)
            .then_with(|| a.id.cmp(&b.id));
        match order {
            EntryOrder::Ascending => ascending,
            EntryOrder::Descending => ascending.reverse(),
        }
    });
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find_account(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.state.read().await.accounts.get(id).cloned())
    }

    async fn find_account_by_owner(
        &self,
        owner: &OwnerId,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .accounts
            .values()
            .find(|a| &a.owner_id == owner)
            .cloned())
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.accounts.contains_key(&account.id) {
            return Err(StoreError::DuplicateId(account.id.to_string()));
        }
        if state.accounts.values().any(|a| a.owner_id == account.owner_id) {
            return Err(StoreError::Duplicate(format!("owner {}", account.owner_id)));
        }
        state.accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn set_special_pin_hash(
        &self,
        id: &AccountId,
        pin_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        match state.accounts.get_mut(id) {
            Some(account) => {
                account.special_pin_hash = Some(pin_hash.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_card(&self, id: &CardId) -> Result<Option<Card>, StoreError> {
        Ok(self.state.read().await.cards.get(id).cloned())
    }

    async fn find_cards_by_account(&self, account: &AccountId) -> Result<Vec<Card>, StoreError> {
        let state = self.state.read().await;
        let mut cards: Vec<Card> = state
            .cards
            .values()
            .filter(|c| &c.account_id == account)
            .cloned()
            .collect();
        cards.sort_by(|a, b| a.issued_at.cmp(&b.issued_at).then_with(|| a.id.cmp(&b.id)));
        Ok(cards)
    }

    async fn insert_card(&self, card: &Card) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.cards.contains_key(&card.id) {
            return Err(StoreError::DuplicateId(card.id.to_string()));
        }
        state.cards.insert(card.id.clone(), card.clone());
        Ok(())
    }

    async fn find_service(&self, id: ServiceId) -> Result<Option<Service>, StoreError> {
        Ok(self.state.read().await.services.get(&id).cloned())
    }

    async fn list_services(&self) -> Result<Vec<Service>, StoreError> {
        Ok(self.state.read().await.services.values().cloned().collect())
    }

    async fn find_entries(&self, query: &EntryQuery) -> Result<Vec<LedgerEntry>, StoreError> {
        let state = self.state.read().await;
        let mut entries: Vec<LedgerEntry> = state
            .entries
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        sort_entries(&mut entries, query.order);
        if let Some(limit) = query.limit {
            entries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(entries)
    }

    async fn account_flows(
        &self,
        account: &AccountId,
        bound: FlowBound,
    ) -> Result<FlowTotals, StoreError> {
        let state = self.state.read().await;
        let mut totals = FlowTotals::default();
        for entry in state.entries.iter().filter(|e| bound.contains(e.recorded_at)) {
            totals.add(account, entry);
        }
        Ok(totals)
    }

    async fn commit(&self, commit: &LedgerCommit) -> Result<(), StoreError> {
        if let Some(err) = self.injected_failure.lock().await.take() {
            return Err(err);
        }

        let mut state = self.state.write().await;

        // Validate everything first; nothing is written unless all checks pass.
        for update in &commit.accounts {
            let current = state
                .accounts
                .get(&update.id)
                .ok_or_else(|| StoreError::Conflict(format!("account {} vanished", update.id)))?;
            if current.version != update.expected_version {
                return Err(StoreError::Conflict(format!("account {}", update.id)));
            }
        }
        if let Some(update) = &commit.card {
            let current = state
                .cards
                .get(&update.id)
                .ok_or_else(|| StoreError::Conflict(format!("card {} vanished", update.id)))?;
            if current.version != update.expected_version {
                return Err(StoreError::Conflict(format!("card {}", update.id)));
            }
        }
        if state.entry_ids.contains(&commit.entry.id) {
            return Err(StoreError::DuplicateId(commit.entry.id.to_string()));
        }

        for update in &commit.accounts {
            if let Some(account) = state.accounts.get_mut(&update.id) {
                account.balance = update.new_balance;
                account.version += 1;
            }
        }
        if let Some(update) = &commit.card {
            if let Some(card) = state.cards.get_mut(&update.id) {
                card.balance = update.new_balance;
                card.version += 1;
            }
        }
        state.entry_ids.insert(commit.entry.id.clone());
        state.entries.push(commit.entry.clone());

        Ok(())
    }
}
