//! Frequent beneficiaries repository.

use chrono::Utc;
use ledgerbank_core::ledger::Account;
use ledgerbank_shared::types::OwnerId;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::entities::beneficiaries;

/// Longest alias accepted, in characters.
pub const MAX_ALIAS_LEN: usize = 60;

/// Errors raised while saving a beneficiary.
#[derive(Debug, Error)]
pub enum BeneficiaryError {
    /// Alias is blank or too long.
    #[error("alias must be 1 to {MAX_ALIAS_LEN} characters")]
    InvalidAlias,

    /// The account belongs to the caller.
    #[error("an account cannot be its owner's beneficiary")]
    OwnAccount,

    /// The account is already saved for this owner.
    #[error("account {0} is already a beneficiary")]
    AlreadySaved(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Beneficiaries saved by each customer for quick transfers.
#[derive(Debug, Clone)]
pub struct BeneficiaryRepository {
    db: DatabaseConnection,
}

impl BeneficiaryRepository {
    /// Creates a new beneficiary repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Saves `account` under `alias` in `owner`'s list.
    ///
    /// # Errors
    ///
    /// - `InvalidAlias` for a blank or overlong alias
    /// - `OwnAccount` if `account` belongs to `owner`
    /// - `AlreadySaved` if the account is already in the list
    /// - `Database` if the insert fails
    pub async fn add(
        &self,
        owner: &OwnerId,
        alias: &str,
        account: &Account,
    ) -> Result<beneficiaries::Model, BeneficiaryError> {
        let alias = alias.trim();
        if alias.is_empty() || alias.chars().count() > MAX_ALIAS_LEN {
            return Err(BeneficiaryError::InvalidAlias);
        }
        if &account.owner_id == owner {
            return Err(BeneficiaryError::OwnAccount);
        }

        let row = beneficiaries::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner.as_str().to_string()),
            alias: Set(alias.to_string()),
            account_id: Set(account.id.as_str().to_string()),
            beneficiary_owner_id: Set(account.owner_id.as_str().to_string()),
            created_at: Set(Utc::now().into()),
        };

        let saved = row.insert(&self.db).await.map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                BeneficiaryError::AlreadySaved(account.id.to_string())
            }
            _ => BeneficiaryError::Database(err),
        })?;

        info!(owner_id = %owner, account_id = %account.id, "beneficiary saved");
        Ok(saved)
    }

    /// Lists `owner`'s beneficiaries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, owner: &OwnerId) -> Result<Vec<beneficiaries::Model>, DbErr> {
        beneficiaries::Entity::find()
            .filter(beneficiaries::Column::OwnerId.eq(owner.as_str()))
            .order_by_asc(beneficiaries::Column::CreatedAt)
            .order_by_asc(beneficiaries::Column::Id)
            .all(&self.db)
            .await
    }
}
