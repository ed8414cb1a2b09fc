//! Integration tests for registration, sessions and bank reference data.

mod common;

use chrono::{Duration, Utc};
use ledgerbank_core::auth::UserRole;
use ledgerbank_core::ledger::{IdentifierPolicy, LedgerStore};
use ledgerbank_db::{
    BankRepository, BeneficiaryError, BeneficiaryRepository, NewUser, RegistrationError,
    SeaOrmLedgerStore, SessionRepository, UserRepository,
};
use ledgerbank_shared::types::BankId;
use rust_decimal::Decimal;
use uuid::Uuid;

use common::{funded_account, test_db, unique_owner};

fn new_user() -> NewUser {
    let tag = Uuid::new_v4().simple().to_string();
    NewUser {
        owner_id: unique_owner(),
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        username: format!("grace-{tag}"),
        email: format!("grace-{tag}@example.com"),
        phone: "555-0100".to_string(),
        address: "7 Compiler Way".to_string(),
        role: UserRole::User,
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
    }
}

#[tokio::test]
async fn test_register_creates_user_and_zero_balance_account() {
    let Some(db) = test_db().await else { return };
    let users = UserRepository::new(db.clone());
    let store = SeaOrmLedgerStore::new(db.clone());
    let user = new_user();

    let account = users
        .register(user.clone(), BankId(1), IdentifierPolicy::default())
        .await
        .unwrap();

    assert_eq!(account.balance, Decimal::ZERO);
    assert_eq!(account.initial_balance, Decimal::ZERO);
    assert_eq!(account.owner_id, user.owner_id);

    let stored = store.find_account_by_owner(&user.owner_id).await.unwrap().unwrap();
    assert_eq!(stored.id, account.id);

    let row = users.find_by_username(&user.username).await.unwrap().unwrap();
    assert_eq!(row.full_name(), "Grace Hopper");
    assert_eq!(row.role, "user");
}

#[tokio::test]
async fn test_register_rejects_taken_username_and_email() {
    let Some(db) = test_db().await else { return };
    let users = UserRepository::new(db.clone());
    let first = new_user();
    users
        .register(first.clone(), BankId(1), IdentifierPolicy::default())
        .await
        .unwrap();

    let mut same_username = new_user();
    same_username.username = first.username.clone();
    assert!(matches!(
        users.register(same_username, BankId(1), IdentifierPolicy::default()).await,
        Err(RegistrationError::AlreadyRegistered("username"))
    ));

    let mut same_email = new_user();
    same_email.email = first.email.clone();
    assert!(matches!(
        users.register(same_email, BankId(1), IdentifierPolicy::default()).await,
        Err(RegistrationError::AlreadyRegistered("email"))
    ));

    let mut same_owner = new_user();
    same_owner.owner_id = first.owner_id.clone();
    assert!(matches!(
        users.register(same_owner, BankId(1), IdentifierPolicy::default()).await,
        Err(RegistrationError::AlreadyRegistered("owner id"))
    ));
}

#[tokio::test]
async fn test_session_lifecycle() {
    let Some(db) = test_db().await else { return };
    let users = UserRepository::new(db.clone());
    let sessions = SessionRepository::new(db.clone());
    let user = new_user();
    users
        .register(user.clone(), BankId(1), IdentifierPolicy::default())
        .await
        .unwrap();

    let token = format!("token-{}", Uuid::new_v4());
    let created = sessions
        .create(&user.owner_id, &token, Utc::now() + Duration::minutes(15))
        .await
        .unwrap();
    assert_eq!(created.token_hash, SessionRepository::hash_token(&token));

    let found = sessions.find_active(&token).await.unwrap().unwrap();
    assert_eq!(found.owner_id, user.owner_id.as_str());
    assert!(sessions.find_active("some-other-token").await.unwrap().is_none());

    assert!(sessions.delete_by_token(&token).await.unwrap());
    assert!(sessions.find_active(&token).await.unwrap().is_none());
    assert!(!sessions.delete_by_token(&token).await.unwrap());
}

#[tokio::test]
async fn test_banks_are_seeded() {
    let Some(db) = test_db().await else { return };
    let banks = BankRepository::new(db);

    let all = banks.list().await.unwrap();
    assert!(all.len() >= 4);
    assert!(all.windows(2).all(|pair| pair[0].id < pair[1].id));

    let home = banks.find(BankId(1)).await.unwrap().unwrap();
    assert_eq!(home.name, "LedgerBank");
    assert!(banks.find(BankId(999)).await.unwrap().is_none());

    let others = banks.list_except(BankId(1)).await.unwrap();
    assert_eq!(others.len(), all.len() - 1);
    assert!(others.iter().all(|bank| bank.id != 1));
}

#[tokio::test]
async fn test_only_admins_hold_the_admin_role() {
    let Some(db) = test_db().await else { return };
    let users = UserRepository::new(db.clone());

    let customer = new_user();
    users.register(customer.clone(), BankId(1), IdentifierPolicy::default()).await.unwrap();
    let mut staff = new_user();
    staff.role = UserRole::Admin;
    users.register(staff.clone(), BankId(1), IdentifierPolicy::default()).await.unwrap();

    assert!(!users.has_role(&customer.owner_id, UserRole::Admin).await.unwrap());
    assert!(users.has_role(&staff.owner_id, UserRole::Admin).await.unwrap());
    assert!(!users.has_role(&unique_owner(), UserRole::Admin).await.unwrap());

    let listing = users.list_with_accounts().await.unwrap();
    let (_, account) = listing
        .iter()
        .find(|(user, _)| user.owner_id == customer.owner_id.as_str())
        .unwrap();
    assert_eq!(account.as_ref().unwrap().owner_id, customer.owner_id.as_str());
}

#[tokio::test]
async fn test_password_change_revokes_other_sessions() {
    let Some(db) = test_db().await else { return };
    let users = UserRepository::new(db.clone());
    let sessions = SessionRepository::new(db.clone());
    let user = new_user();
    users.register(user.clone(), BankId(1), IdentifierPolicy::default()).await.unwrap();

    let current = format!("token-{}", Uuid::new_v4());
    let other = format!("token-{}", Uuid::new_v4());
    for token in [&current, &other] {
        sessions
            .create(&user.owner_id, token, Utc::now() + Duration::minutes(15))
            .await
            .unwrap();
    }

    assert!(users.update_password_hash(&user.owner_id, "$argon2id$new").await.unwrap());
    let row = users.find_by_owner(&user.owner_id).await.unwrap().unwrap();
    assert_eq!(row.password_hash, "$argon2id$new");
    assert!(!users.update_password_hash(&unique_owner(), "$argon2id$new").await.unwrap());

    assert_eq!(sessions.delete_others(&user.owner_id, &current).await.unwrap(), 1);
    assert!(sessions.find_active(&current).await.unwrap().is_some());
    assert!(sessions.find_active(&other).await.unwrap().is_none());
}

#[tokio::test]
async fn test_beneficiaries() {
    let Some(db) = test_db().await else { return };
    let repo = BeneficiaryRepository::new(db.clone());
    let me = funded_account(&db, Decimal::ZERO).await;
    let friend = funded_account(&db, Decimal::ZERO).await;
    let landlord = funded_account(&db, Decimal::ZERO).await;

    let saved = repo.add(&me.owner_id, "  Friend ", &friend).await.unwrap();
    assert_eq!(saved.alias, "Friend");
    assert_eq!(saved.account_id, friend.id.as_str());
    assert_eq!(saved.beneficiary_owner_id, friend.owner_id.as_str());
    repo.add(&me.owner_id, "Rent", &landlord).await.unwrap();

    assert!(matches!(
        repo.add(&me.owner_id, "Again", &friend).await,
        Err(BeneficiaryError::AlreadySaved(_))
    ));
    assert!(matches!(
        repo.add(&me.owner_id, "Me", &me).await,
        Err(BeneficiaryError::OwnAccount)
    ));
    assert!(matches!(
        repo.add(&me.owner_id, "   ", &landlord).await,
        Err(BeneficiaryError::InvalidAlias)
    ));

    let listed = repo.list(&me.owner_id).await.unwrap();
    let aliases: Vec<&str> = listed.iter().map(|b| b.alias.as_str()).collect();
    assert_eq!(aliases, ["Friend", "Rent"]);
    assert!(repo.list(&friend.owner_id).await.unwrap().is_empty());
}
