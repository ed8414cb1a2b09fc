//! Integration tests for database constraints and triggers.
//!
//! The schema enforces the ledger's invariants on its own, even if
//! application logic fails: entries are append-only, amounts are positive
//! and balances never go negative.

mod common;

use chrono::Utc;
use ledgerbank_core::ledger::{
    BalanceUpdate, EntryKind, EntryQuery, LedgerCommit, LedgerEntry, LedgerStore, StoreError,
};
use ledgerbank_db::entities::{accounts, ledger_entries};
use ledgerbank_db::SeaOrmLedgerStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use common::{funded_account, test_db};

async fn committed_entry(
    store: &SeaOrmLedgerStore,
    db: &sea_orm::DatabaseConnection,
) -> LedgerEntry {
    let a = funded_account(db, dec!(50)).await;
    let b = funded_account(db, dec!(0)).await;
    let entry = LedgerEntry::record(EntryKind::Transfer, a.id.clone(), dec!(20), "seed", Utc::now())
        .to_account(b.id.clone());
    store
        .commit(&LedgerCommit {
            accounts: vec![
                BalanceUpdate::debit_account(&a, dec!(20)),
                BalanceUpdate::credit_account(&b, dec!(20)),
            ],
            card: None,
            entry: entry.clone(),
        })
        .await
        .unwrap();
    entry
}

#[tokio::test]
async fn test_ledger_entries_cannot_be_updated() {
    let Some(db) = test_db().await else { return };
    let store = SeaOrmLedgerStore::new(db.clone());
    let entry = committed_entry(&store, &db).await;

    let result = ledger_entries::Entity::update_many()
        .col_expr(ledger_entries::Column::Amount, Expr::value(dec!(1)))
        .filter(ledger_entries::Column::Id.eq(entry.id.as_str()))
        .exec(&db)
        .await;
    assert!(result.is_err(), "update of a ledger entry must be rejected");

    let stored = store
        .find_entries(&EntryQuery::for_account(entry.source_account_id.clone()))
        .await
        .unwrap();
    assert_eq!(stored[0].amount, dec!(20));
}

#[tokio::test]
async fn test_ledger_entries_cannot_be_deleted() {
    let Some(db) = test_db().await else { return };
    let store = SeaOrmLedgerStore::new(db.clone());
    let entry = committed_entry(&store, &db).await;

    let result = ledger_entries::Entity::delete_by_id(entry.id.as_str().to_string())
        .exec(&db)
        .await;
    assert!(result.is_err(), "delete of a ledger entry must be rejected");

    assert!(ledger_entries::Entity::find_by_id(entry.id.as_str().to_string())
        .one(&db)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_negative_balance_is_rejected_by_the_schema() {
    let Some(db) = test_db().await else { return };
    let account = funded_account(&db, dec!(10)).await;

    let result = accounts::Entity::update_many()
        .col_expr(accounts::Column::Balance, Expr::value(dec!(-1)))
        .filter(accounts::Column::Id.eq(account.id.as_str()))
        .exec(&db)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_non_positive_amount_commit_fails_as_backend_error() {
    let Some(db) = test_db().await else { return };
    let store = SeaOrmLedgerStore::new(db.clone());
    let a = funded_account(&db, dec!(10)).await;

    let mut entry = LedgerEntry::record(EntryKind::Payment, a.id.clone(), dec!(1), "zero", Utc::now());
    entry.amount = Decimal::ZERO;
    let result = store
        .commit(&LedgerCommit {
            accounts: vec![BalanceUpdate::debit_account(&a, Decimal::ZERO)],
            card: None,
            entry,
        })
        .await;
    assert!(matches!(result, Err(StoreError::Backend(_))));

    // The balance update in the same transaction was rolled back.
    let after = store.find_account(&a.id).await.unwrap().unwrap();
    assert_eq!(after.version, 0);
}
