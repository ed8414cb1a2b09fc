//! `SeaORM` entity definitions.
//!
//! Tables are created by the raw SQL migrations in `crate::migration`; these
//! entities mirror them column for column.

pub mod accounts;
pub mod banks;
pub mod beneficiaries;
pub mod cards;
pub mod ledger_entries;
pub mod services;
pub mod sessions;
pub mod users;
