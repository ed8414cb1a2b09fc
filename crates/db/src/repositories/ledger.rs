//! PostgreSQL-backed `LedgerStore`.
//!
//! `commit` runs in one database transaction: every balance update is a
//! compare-and-swap on the row's `version`, and the entry insert comes last.
//! A version mismatch rolls the transaction back and reports
//! `StoreError::Conflict`. Readers only see committed rows (read committed).

use async_trait::async_trait;
use chrono::Utc;
use ledgerbank_core::ledger::{
    Account, Card, CardType, EntryKind, EntryOrder, EntryQuery, EntrySubject, FlowBound,
    FlowTotals, LedgerCommit, LedgerEntry, LedgerStore, Service, StoreError,
};
use ledgerbank_shared::types::{AccountId, BankId, CardId, EntryId, OwnerId, ServiceId};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbBackend, DbErr, EntityTrait, FromQueryResult,
    Order, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, Statement, TransactionTrait,
};
use tracing::debug;

use crate::entities::{accounts, cards, ledger_entries, services};

/// Ledger store over a `SeaORM` connection pool.
#[derive(Debug, Clone)]
pub struct SeaOrmLedgerStore {
    db: DatabaseConnection,
}

impl SeaOrmLedgerStore {
    /// Creates a new ledger store.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Maps a database error onto the store taxonomy.
///
/// Primary key violations on generated identifiers become `DuplicateId` so
/// callers can draw a fresh one. Everything else unique, including a taken
/// owner id, becomes `Duplicate`.
pub(crate) fn store_error(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail))
            if detail.contains("_pkey") && !detail.contains("users_pkey") =>
        {
            StoreError::DuplicateId(detail)
        }
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            StoreError::Duplicate(duplicate_subject(&detail).to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

fn duplicate_subject(detail: &str) -> &'static str {
    if detail.contains("users_pkey") {
        "owner id"
    } else if detail.contains("uq_accounts_owner") {
        "account for this owner"
    } else if detail.contains("uq_users_username") {
        "username"
    } else if detail.contains("uq_users_email") {
        "email"
    } else {
        "record"
    }
}

fn account_from_model(model: accounts::Model) -> Account {
    Account {
        id: AccountId::from_stored(model.id),
        owner_id: OwnerId::from_stored(model.owner_id),
        bank_id: BankId(model.bank_id),
        balance: model.balance,
        initial_balance: model.initial_balance,
        special_pin_hash: model.special_pin_hash,
        version: model.version,
    }
}

fn card_from_model(model: cards::Model) -> Result<Card, StoreError> {
    let card_type: CardType = model
        .card_type
        .parse()
        .map_err(|_| StoreError::Backend(format!("unknown card type {}", model.card_type)))?;

    Ok(Card {
        id: CardId::from_stored(model.id),
        account_id: AccountId::from_stored(model.account_id),
        card_type,
        balance: model.balance,
        cvc: model.cvc,
        expires_at: model.expires_at.with_timezone(&Utc),
        issued_at: model.issued_at.with_timezone(&Utc),
        version: model.version,
    })
}

fn entry_from_model(model: ledger_entries::Model) -> Result<LedgerEntry, StoreError> {
    let kind: EntryKind = model
        .kind
        .parse()
        .map_err(|_| StoreError::Backend(format!("unknown entry kind {}", model.kind)))?;

    Ok(LedgerEntry {
        id: EntryId::from_stored(model.id),
        source_account_id: AccountId::from_stored(model.source_account_id),
        beneficiary_account_id: model.beneficiary_account_id.map(AccountId::from_stored),
        card_id: model.card_id.map(CardId::from_stored),
        amount: model.amount,
        kind,
        description: model.description,
        recorded_at: model.recorded_at.with_timezone(&Utc),
    })
}

fn service_from_model(model: services::Model) -> Service {
    Service {
        id: ServiceId(model.id),
        description: model.description,
        field_label: model.field_label,
        minimum_amount: model.minimum_amount,
        beneficiary_account_id: AccountId::from_stored(model.beneficiary_account_id),
    }
}

/// Builds the insert model for a new account.
pub(crate) fn account_active_model(account: &Account) -> accounts::ActiveModel {
    accounts::ActiveModel {
        id: Set(account.id.as_str().to_string()),
        owner_id: Set(account.owner_id.as_str().to_string()),
        bank_id: Set(account.bank_id.into_inner()),
        balance: Set(account.balance),
        initial_balance: Set(account.initial_balance),
        special_pin_hash: Set(account.special_pin_hash.clone()),
        version: Set(account.version),
        created_at: Set(Utc::now().into()),
    }
}

fn entry_active_model(entry: &LedgerEntry) -> ledger_entries::ActiveModel {
    ledger_entries::ActiveModel {
        id: Set(entry.id.as_str().to_string()),
        source_account_id: Set(entry.source_account_id.as_str().to_string()),
        beneficiary_account_id: Set(entry
            .beneficiary_account_id
            .as_ref()
            .map(|id| id.as_str().to_string())),
        card_id: Set(entry.card_id.as_ref().map(|id| id.as_str().to_string())),
        amount: Set(entry.amount),
        kind: Set(entry.kind.as_str().to_string()),
        description: Set(entry.description.clone()),
        recorded_at: Set(entry.recorded_at.into()),
    }
}

#[derive(Debug, FromQueryResult)]
struct FlowRow {
    credits: Decimal,
    debits: Decimal,
}

#[async_trait]
impl LedgerStore for SeaOrmLedgerStore {
    async fn find_account(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        let model = accounts::Entity::find_by_id(id.as_str())
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(account_from_model))
    }

    async fn find_account_by_owner(
        &self,
        owner: &OwnerId,
    ) -> Result<Option<Account>, StoreError> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::OwnerId.eq(owner.as_str()))
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(account_from_model))
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        accounts::Entity::insert(account_active_model(account))
            .exec_without_returning(&self.db)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn set_special_pin_hash(
        &self,
        id: &AccountId,
        pin_hash: &str,
    ) -> Result<bool, StoreError> {
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::SpecialPinHash,
                Expr::value(pin_hash.to_string()),
            )
            .filter(accounts::Column::Id.eq(id.as_str()))
            .exec(&self.db)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected > 0)
    }

    async fn find_card(&self, id: &CardId) -> Result<Option<Card>, StoreError> {
        cards::Entity::find_by_id(id.as_str())
            .one(&self.db)
            .await
            .map_err(store_error)?
            .map(card_from_model)
            .transpose()
    }

    async fn find_cards_by_account(&self, account: &AccountId) -> Result<Vec<Card>, StoreError> {
        cards::Entity::find()
            .filter(cards::Column::AccountId.eq(account.as_str()))
            .order_by_asc(cards::Column::IssuedAt)
            .order_by_asc(cards::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(card_from_model)
            .collect()
    }

    async fn insert_card(&self, card: &Card) -> Result<(), StoreError> {
        let model = cards::ActiveModel {
            id: Set(card.id.as_str().to_string()),
            account_id: Set(card.account_id.as_str().to_string()),
            card_type: Set(card.card_type.as_str().to_string()),
            balance: Set(card.balance),
            cvc: Set(card.cvc.clone()),
            expires_at: Set(card.expires_at.into()),
            issued_at: Set(card.issued_at.into()),
            version: Set(card.version),
        };

        cards::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn find_service(&self, id: ServiceId) -> Result<Option<Service>, StoreError> {
        let model = services::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(service_from_model))
    }

    async fn list_services(&self) -> Result<Vec<Service>, StoreError> {
        let models = services::Entity::find()
            .order_by_asc(services::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_error)?;
        Ok(models.into_iter().map(service_from_model).collect())
    }

    async fn find_entries(&self, query: &EntryQuery) -> Result<Vec<LedgerEntry>, StoreError> {
        let mut select = match &query.subject {
            EntrySubject::Account(id) => ledger_entries::Entity::find().filter(
                Condition::any()
                    .add(ledger_entries::Column::SourceAccountId.eq(id.as_str()))
                    .add(ledger_entries::Column::BeneficiaryAccountId.eq(id.as_str())),
            ),
            EntrySubject::Card(id) => ledger_entries::Entity::find()
                .filter(ledger_entries::Column::CardId.eq(id.as_str())),
        };

        if let Some(from) = query.from {
            select = select.filter(ledger_entries::Column::RecordedAt.gte(from));
        }
        if let Some(to) = query.to {
            select = select.filter(ledger_entries::Column::RecordedAt.lte(to));
        }

        let order = match query.order {
            EntryOrder::Ascending => Order::Asc,
            EntryOrder::Descending => Order::Desc,
        };
        select = select
            .order_by(ledger_entries::Column::RecordedAt, order.clone())
            .order_by(ledger_entries::Column::Id, order);

        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }

        select
            .all(&self.db)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(entry_from_model)
            .collect()
    }

    async fn account_flows(
        &self,
        account: &AccountId,
        bound: FlowBound,
    ) -> Result<FlowTotals, StoreError> {
        let (op, at) = match bound {
            FlowBound::Before(at) => ("<", at),
            FlowBound::UpTo(at) => ("<=", at),
            FlowBound::After(at) => (">", at),
        };

        let sql = format!(
            r"
SELECT
    COALESCE(SUM(amount) FILTER (WHERE source_account_id <> $1), 0) AS credits,
    COALESCE(SUM(amount) FILTER (WHERE source_account_id = $1), 0) AS debits
FROM ledger_entries
WHERE (source_account_id = $1 OR beneficiary_account_id = $1)
  AND recorded_at {op} $2
"
        );

        let row = FlowRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [account.as_str().into(), at.into()],
        ))
        .one(&self.db)
        .await
        .map_err(store_error)?;

        Ok(row.map_or_else(FlowTotals::default, |row| FlowTotals {
            credits: row.credits,
            debits: row.debits,
        }))
    }

    async fn commit(&self, commit: &LedgerCommit) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(store_error)?;

        for update in &commit.accounts {
            let result = accounts::Entity::update_many()
                .col_expr(accounts::Column::Balance, Expr::value(update.new_balance))
                .col_expr(
                    accounts::Column::Version,
                    Expr::col(accounts::Column::Version).add(1),
                )
                .filter(accounts::Column::Id.eq(update.id.as_str()))
                .filter(accounts::Column::Version.eq(update.expected_version))
                .exec(&txn)
                .await
                .map_err(store_error)?;

            if result.rows_affected == 0 {
                txn.rollback().await.map_err(store_error)?;
                debug!(account_id = %update.id, expected_version = update.expected_version, "stale account version");
                return Err(StoreError::Conflict(format!("account {}", update.id)));
            }
        }

        if let Some(update) = &commit.card {
            let result = cards::Entity::update_many()
                .col_expr(cards::Column::Balance, Expr::value(update.new_balance))
                .col_expr(
                    cards::Column::Version,
                    Expr::col(cards::Column::Version).add(1),
                )
                .filter(cards::Column::Id.eq(update.id.as_str()))
                .filter(cards::Column::Version.eq(update.expected_version))
                .exec(&txn)
                .await
                .map_err(store_error)?;

            if result.rows_affected == 0 {
                txn.rollback().await.map_err(store_error)?;
                debug!(card_id = %update.id, expected_version = update.expected_version, "stale card version");
                return Err(StoreError::Conflict(format!("card {}", update.id)));
            }
        }

        ledger_entries::Entity::insert(entry_active_model(&commit.entry))
            .exec_without_returning(&txn)
            .await
            .map_err(store_error)?;

        txn.commit().await.map_err(store_error)?;

        debug!(entry_id = %commit.entry.id, kind = %commit.entry.kind, "ledger commit applied");
        Ok(())
    }
}
