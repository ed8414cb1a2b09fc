//! User repository for database operations.
//!
//! Registration writes the user and their account in one transaction, so a
//! customer never exists without an account or the other way round.

use ledgerbank_core::auth::UserRole;
use ledgerbank_core::ledger::{Account, IdentifierPolicy, LedgerError, StoreError};
use ledgerbank_shared::types::{BankId, OwnerId};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait, sea_query::Expr,
};
use thiserror::Error;
use tracing::info;

use super::ledger::{account_active_model, store_error};
use crate::entities::{accounts, users};

/// Errors raised while registering a customer.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Owner id, username or email is taken.
    #[error("{0} is already registered")]
    AlreadyRegistered(&'static str),

    /// Opening the account failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Everything needed to create a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// National identifier.
    pub owner_id: OwnerId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    pub phone: String,
    /// Postal address, printed on statements.
    pub address: String,
    /// Role.
    pub role: UserRole,
    /// Argon2 PHC string of the password.
    pub password_hash: String,
}

fn user_active_model(user: &NewUser) -> users::ActiveModel {
    users::ActiveModel {
        owner_id: Set(user.owner_id.as_str().to_string()),
        first_name: Set(user.first_name.clone()),
        last_name: Set(user.last_name.clone()),
        username: Set(user.username.clone()),
        email: Set(user.email.clone()),
        phone: Set(user.phone.clone()),
        address: Set(user.address.clone()),
        role: Set(user.role.as_str().to_string()),
        password_hash: Set(user.password_hash.clone()),
        created_at: Set(chrono::Utc::now().into()),
    }
}

/// User repository for registration and lookups.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by login name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.db)
            .await
    }

    /// Finds a user by owner id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_owner(&self, owner_id: &OwnerId) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(owner_id.as_str())
            .one(&self.db)
            .await
    }

    /// Checks if a username is taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn username_exists(&self, username: &str) -> Result<bool, DbErr> {
        let count = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Checks if an email is taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn email_exists(&self, email: &str) -> Result<bool, DbErr> {
        let count = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Checks whether a user holds `required_role`. Unknown users hold none.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn has_role(&self, owner_id: &OwnerId, required_role: UserRole) -> Result<bool, DbErr> {
        let user = self.find_by_owner(owner_id).await?;
        Ok(user.is_some_and(|u| u.role.parse::<UserRole>().is_ok_and(|role| role == required_role)))
    }

    /// Lists every user with their account, ordered by owner id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_with_accounts(
        &self,
    ) -> Result<Vec<(users::Model, Option<accounts::Model>)>, DbErr> {
        users::Entity::find()
            .find_also_related(accounts::Entity)
            .order_by_asc(users::Column::OwnerId)
            .all(&self.db)
            .await
    }

    /// Replaces a user's password hash. Returns false if the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn update_password_hash(
        &self,
        owner_id: &OwnerId,
        password_hash: &str,
    ) -> Result<bool, DbErr> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(password_hash.to_string()))
            .filter(users::Column::OwnerId.eq(owner_id.as_str()))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            info!(owner_id = %owner_id, "password changed");
        }
        Ok(result.rows_affected > 0)
    }

    /// Registers a customer and opens their account at `bank_id` with a zero
    /// balance.
    ///
    /// The account id is drawn at random and redrawn on collision, up to
    /// `identifiers.max_attempts` times. Each attempt is its own transaction.
    ///
    /// # Errors
    ///
    /// - `AlreadyRegistered` if the owner id, username or email is taken
    /// - `Ledger` if the account cannot be stored (including a registration
    ///   racing this one past the checks above)
    /// - `Database` if a lookup fails
    pub async fn register(
        &self,
        user: NewUser,
        bank_id: BankId,
        identifiers: IdentifierPolicy,
    ) -> Result<Account, RegistrationError> {
        if self.find_by_owner(&user.owner_id).await?.is_some() {
            return Err(RegistrationError::AlreadyRegistered("owner id"));
        }
        if self.username_exists(&user.username).await? {
            return Err(RegistrationError::AlreadyRegistered("username"));
        }
        if self.email_exists(&user.email).await? {
            return Err(RegistrationError::AlreadyRegistered("email"));
        }

        let account = Account::open(user.owner_id.clone(), bank_id, Decimal::ZERO)?;
        let user = &user;
        let account = identifiers
            .insert_with_fresh_id("account", account, Account::regenerate_id, |candidate| async move {
                self.insert_user_with_account(user, &candidate).await
            })
            .await?;

        info!(owner_id = %user.owner_id, account_id = %account.id, bank_id = %bank_id, "customer registered");
        Ok(account)
    }

    async fn insert_user_with_account(
        &self,
        user: &NewUser,
        account: &Account,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(store_error)?;

        users::Entity::insert(user_active_model(user))
            .exec_without_returning(&txn)
            .await
            .map_err(store_error)?;
        accounts::Entity::insert(account_active_model(account))
            .exec_without_returning(&txn)
            .await
            .map_err(store_error)?;

        txn.commit().await.map_err(store_error)
    }
}
