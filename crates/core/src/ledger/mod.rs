//! Accounts, cards and the immutable ledger.
//!
//! This module implements:
//! - Domain types and their factories
//! - The `LedgerStore` persistence boundary and an in-memory implementation
//! - The transfer engine (bank transfers, card top-ups, service payments)
//! - The registry for opening accounts and issuing cards
//! - Error types for ledger operations

pub mod clock;
pub mod engine;
pub mod error;
pub mod identifier;
pub mod memory;
pub mod registry;
pub mod store;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{BankTransfer, CardTopUp, ServicePayment, TransferEngine};
pub use error::LedgerError;
pub use identifier::IdentifierPolicy;
pub use memory::InMemoryLedgerStore;
pub use registry::LedgerRegistry;
pub use store::{
    BalanceUpdate, EntryOrder, EntryQuery, EntrySubject, FlowBound, FlowTotals, LedgerCommit,
    LedgerStore, StoreError,
};
pub use types::{
    Account, CARD_TOP_UP_DESCRIPTION, Card, CardType, Direction, EntryKind, LedgerEntry, Service,
};
