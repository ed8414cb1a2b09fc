//! Session repository for database operations.
//!
//! Only the SHA-256 hash of a bearer token is stored.

use chrono::{DateTime, Utc};
use ledgerbank_shared::types::OwnerId;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::entities::sessions;

/// Session repository for bearer token bookkeeping.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    db: DatabaseConnection,
}

impl SessionRepository {
    /// Creates a new session repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Hashes a bearer token for storage.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Records a newly issued token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(
        &self,
        owner_id: &OwnerId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<sessions::Model, DbErr> {
        let session = sessions::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id.as_str().to_string()),
            token_hash: Set(Self::hash_token(token)),
            expires_at: Set(expires_at.into()),
            created_at: Set(Utc::now().into()),
        };

        session.insert(&self.db).await
    }

    /// Finds the unexpired session for a token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_active(&self, token: &str) -> Result<Option<sessions::Model>, DbErr> {
        sessions::Entity::find()
            .filter(sessions::Column::TokenHash.eq(Self::hash_token(token)))
            .filter(sessions::Column::ExpiresAt.gt(Utc::now()))
            .one(&self.db)
            .await
    }

    /// Deletes the session for a token. Returns false if there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn delete_by_token(&self, token: &str) -> Result<bool, DbErr> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::TokenHash.eq(Self::hash_token(token)))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Deletes every session of `owner_id` except the one for `keep_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn delete_others(&self, owner_id: &OwnerId, keep_token: &str) -> Result<u64, DbErr> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::OwnerId.eq(owner_id.as_str()))
            .filter(sessions::Column::TokenHash.ne(Self::hash_token(keep_token)))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    /// Cleans up expired sessions (for maintenance).
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn cleanup_expired(&self) -> Result<u64, DbErr> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::ExpiresAt.lt(Utc::now()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let a = SessionRepository::hash_token("token-a");
        assert_eq!(a, SessionRepository::hash_token("token-a"));
        assert_ne!(a, SessionRepository::hash_token("token-b"));
        assert_eq!(a.len(), 64);
        assert!(a.bytes().all(|b| b.is_ascii_hexdigit()));
    }
}
