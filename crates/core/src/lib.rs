//! Core business logic for LedgerBank.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence is reached only through the `LedgerStore` trait.
//!
//! # Modules
//!
//! - `ledger` - Accounts, cards, ledger entries and the transfer engine
//! - `statement` - Balance reconstruction for activity feeds and monthly statements
//! - `auth` - Secret hashing and the special-PIN gate

pub mod auth;
pub mod ledger;
pub mod statement;
