//! Database migration runner for LedgerBank.
//!
//! Reads `DATABASE_URL` (or `.env`). Usage:
//!   migrator up      - Create the ledger schema and load reference data
//!   migrator down    - Roll back the last migration
//!   migrator status  - List applied and pending migrations
//!   migrator fresh   - Drop everything and migrate from scratch
//!
//! Rolling back reference data keeps service accounts that appear in the
//! ledger, since entries can never be deleted.

use ledgerbank_db::migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The CLI installs its own tracing subscriber
    cli::run_cli(Migrator).await;
}
