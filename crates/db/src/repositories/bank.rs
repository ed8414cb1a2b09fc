//! Bank reference data.

use ledgerbank_shared::types::BankId;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::banks;

/// Read-only access to the banks table.
#[derive(Debug, Clone)]
pub struct BankRepository {
    db: DatabaseConnection,
}

impl BankRepository {
    /// Creates a new bank repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists all banks ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<banks::Model>, DbErr> {
        banks::Entity::find()
            .order_by_asc(banks::Column::Id)
            .all(&self.db)
            .await
    }

    /// Lists every bank other than `own`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_except(&self, own: BankId) -> Result<Vec<banks::Model>, DbErr> {
        banks::Entity::find()
            .filter(banks::Column::Id.ne(own.into_inner()))
            .order_by_asc(banks::Column::Id)
            .all(&self.db)
            .await
    }

    /// Finds a bank by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, id: BankId) -> Result<Option<banks::Model>, DbErr> {
        banks::Entity::find_by_id(id.into_inner()).one(&self.db).await
    }
}
