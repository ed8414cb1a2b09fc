//! Property-based and concurrency tests for the transfer engine.
//!
//! - Money is conserved by bank transfers and never created by other kinds
//! - No sequence of operations drives a balance negative
//! - Concurrent transfers from one account never overspend it

use std::sync::Arc;

use futures::future::join_all;
use ledgerbank_shared::types::{BankId, OwnerId, ServiceId};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::engine::{BankTransfer, ServicePayment, TransferEngine};
use super::error::LedgerError;
use super::memory::InMemoryLedgerStore;
use super::store::LedgerStore;
use super::types::{Account, Service};

/// Strategy to generate positive decimal amounts (0.01 to 500.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..50_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate starting balances (0.00 to 1,000.00).
fn balance() -> impl Strategy<Value = Decimal> {
    (0i64..100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

#[derive(Debug, Clone)]
enum Op {
    AToB(Decimal),
    BToA(Decimal),
    APaysService(Decimal),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        positive_amount().prop_map(Op::AToB),
        positive_amount().prop_map(Op::BToA),
        positive_amount().prop_map(Op::APaysService),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn open(store: &InMemoryLedgerStore, owner: &str, balance: Decimal) -> Account {
    let account = Account::open(OwnerId::new(owner).unwrap(), BankId(1), balance).unwrap();
    store.insert_account(&account).await.unwrap();
    account
}

fn transfer(from: &Account, to: &Account, amount: Decimal) -> BankTransfer {
    BankTransfer {
        sender: from.id.clone(),
        recipient: to.id.clone(),
        recipient_owner: to.owner_id.clone(),
        bank_id: to.bank_id,
        amount,
        description: "prop".to_string(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every successful operation moves exactly its amount; failures move nothing.
    #[test]
    fn prop_balances_follow_committed_entries(
        start_a in balance(),
        start_b in balance(),
        ops in prop::collection::vec(op(), 1..20),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let store = Arc::new(InMemoryLedgerStore::new());
            let engine = TransferEngine::new(Arc::clone(&store));
            let a = open(&store, "1", start_a).await;
            let b = open(&store, "2", start_b).await;
            let sink = open(&store, "3", Decimal::ZERO).await;
            store.add_service(Service {
                id: ServiceId(1),
                description: "Gas".into(),
                field_label: "Contract".into(),
                minimum_amount: Decimal::ZERO,
                beneficiary_account_id: sink.id.clone(),
            }).await;

            let (mut expect_a, mut expect_b) = (start_a, start_b);
            let mut committed = 0;

            for op in ops {
                let result = match &op {
                    Op::AToB(amount) => engine.execute_bank_transfer(&transfer(&a, &b, *amount)).await,
                    Op::BToA(amount) => engine.execute_bank_transfer(&transfer(&b, &a, *amount)).await,
                    Op::APaysService(amount) => engine.execute_service_payment(&ServicePayment {
                        sender: a.id.clone(),
                        service_id: ServiceId(1),
                        amount: *amount,
                        field_description: "C-1".into(),
                    }).await,
                };

                match (op, result) {
                    (Op::AToB(amount), Ok(entry)) => {
                        prop_assert_eq!(entry.amount, amount);
                        expect_a -= amount;
                        expect_b += amount;
                        committed += 1;
                    }
                    (Op::BToA(amount), Ok(_)) => {
                        expect_b -= amount;
                        expect_a += amount;
                        committed += 1;
                    }
                    (Op::APaysService(amount), Ok(_)) => {
                        expect_a -= amount;
                        committed += 1;
                    }
                    (_, Err(LedgerError::InsufficientFunds { .. })) => {}
                    (_, Err(other)) => prop_assert!(false, "unexpected error: {other}"),
                }

                let now_a = store.find_account(&a.id).await.unwrap().unwrap().balance;
                let now_b = store.find_account(&b.id).await.unwrap().unwrap().balance;
                prop_assert!(now_a >= Decimal::ZERO);
                prop_assert!(now_b >= Decimal::ZERO);
                prop_assert_eq!(now_a, expect_a);
                prop_assert_eq!(now_b, expect_b);
            }

            prop_assert_eq!(store.entry_count().await, committed);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Bank transfers alone conserve the total held by both accounts.
    #[test]
    fn prop_bank_transfers_conserve_money(
        start_a in balance(),
        start_b in balance(),
        amounts in prop::collection::vec(positive_amount(), 1..15),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let store = Arc::new(InMemoryLedgerStore::new());
            let engine = TransferEngine::new(Arc::clone(&store));
            let a = open(&store, "1", start_a).await;
            let b = open(&store, "2", start_b).await;

            for (i, amount) in amounts.into_iter().enumerate() {
                let request = if i % 2 == 0 { transfer(&a, &b, amount) } else { transfer(&b, &a, amount) };
                let _ = engine.execute_bank_transfer(&request).await;
            }

            let total = store.find_account(&a.id).await.unwrap().unwrap().balance
                + store.find_account(&b.id).await.unwrap().unwrap().balance;
            prop_assert_eq!(total, start_a + start_b);
            Ok::<(), TestCaseError>(())
        })?;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_never_overspend() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let engine: TransferEngine = TransferEngine::new(Arc::clone(&store) as Arc<dyn LedgerStore>);
    let sender = open(&store, "1", dec!(100)).await;
    let recipient = open(&store, "2", Decimal::ZERO).await;

    let tasks = (0..25).map(|i| {
        let engine = engine.clone();
        let amount = Decimal::from(5 + (i % 4) * 5);
        let request = transfer(&sender, &recipient, amount);
        tokio::spawn(async move { (amount, engine.execute_bank_transfer(&request).await) })
    });
    let outcomes = join_all(tasks).await;

    let mut spent = Decimal::ZERO;
    let mut successes = 0;
    for outcome in outcomes {
        let (amount, result) = outcome.unwrap();
        match result {
            Ok(entry) => {
                assert_eq!(entry.amount, amount);
                spent += amount;
                successes += 1;
            }
            Err(LedgerError::InsufficientFunds { .. } | LedgerError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    let sender_after = store.find_account(&sender.id).await.unwrap().unwrap();
    let recipient_after = store.find_account(&recipient.id).await.unwrap().unwrap();
    assert!(spent <= dec!(100));
    assert_eq!(sender_after.balance, dec!(100) - spent);
    assert_eq!(recipient_after.balance, spent);
    assert!(sender_after.balance >= Decimal::ZERO);
    assert_eq!(store.entry_count().await, successes);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_conflict_retries_let_contending_transfers_through() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let engine = TransferEngine::new(Arc::clone(&store)).with_conflict_retries(50);
    let sender = open(&store, "1", dec!(1000)).await;
    let recipient = open(&store, "2", Decimal::ZERO).await;

    let tasks = (0..10).map(|_| {
        let engine = engine.clone();
        let request = transfer(&sender, &recipient, dec!(10));
        tokio::spawn(async move { engine.execute_bank_transfer(&request).await })
    });

    for outcome in join_all(tasks).await {
        outcome.unwrap().unwrap();
    }

    let sender_after = store.find_account(&sender.id).await.unwrap().unwrap();
    assert_eq!(sender_after.balance, dec!(900));
    assert_eq!(sender_after.version, 10);
}
