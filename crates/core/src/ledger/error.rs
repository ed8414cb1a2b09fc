//! Ledger error types.
//!
//! Every failure of a ledger operation maps onto one `LedgerError` variant.
//! Validation and business-rule failures are always raised before anything
//! is written; `Conflict` and `PersistenceFailure` come from the commit.

use ledgerbank_shared::types::{AccountId, BankId, CardId, ServiceId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Amount must be strictly positive.
    #[error("Amount must be greater than zero, got {0}")]
    InvalidAmount(Decimal),

    /// Request is malformed or missing a required field.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ========== Lookup Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Card not found.
    #[error("Card not found: {0}")]
    CardNotFound(CardId),

    /// Service not found.
    #[error("Service not found: {0}")]
    ServiceNotFound(ServiceId),

    // ========== Business Rule Errors ==========
    /// Recipient account is held at a different bank than declared.
    #[error("Recipient account is held at bank {actual}, not {declared}")]
    BankMismatch {
        /// Bank named in the request.
        declared: BankId,
        /// Bank the recipient account actually belongs to.
        actual: BankId,
    },

    /// Recipient account is not owned by the declared person.
    #[error("Recipient account does not belong to the declared owner")]
    OwnerMismatch,

    /// Amount is below the service's minimum.
    #[error("Amount {amount} is below the minimum of {minimum}")]
    MinimumAmountNotMet {
        /// Minimum accepted by the service.
        minimum: Decimal,
        /// Amount requested.
        amount: Decimal,
    },

    /// Sender cannot cover the amount.
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Balance at the time of the read.
        available: Decimal,
        /// Amount requested.
        requested: Decimal,
    },

    // ========== Auth Errors ==========
    /// Credentials or special PIN rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No valid session.
    #[error("Authentication required")]
    Unauthenticated,

    // ========== Concurrency Errors ==========
    /// A touched record changed between read and commit.
    #[error("Concurrent modification of {0}, please retry")]
    Conflict(String),

    /// No free identifier found within the retry bound.
    #[error("No free {kind} identifier after {attempts} attempts")]
    IdentifierExhausted {
        /// What was being identified.
        kind: &'static str,
        /// Attempts made.
        attempts: u32,
    },

    // ========== Storage Errors ==========
    /// The store failed; the unit was rolled back.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Unexpected failure outside the store.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::CardNotFound(_) => "CARD_NOT_FOUND",
            Self::ServiceNotFound(_) => "SERVICE_NOT_FOUND",
            Self::BankMismatch { .. } => "BANK_MISMATCH",
            Self::OwnerMismatch => "OWNER_MISMATCH",
            Self::MinimumAmountNotMet { .. } => "MINIMUM_AMOUNT_NOT_MET",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Conflict(_) => "CONFLICT",
            Self::IdentifierExhausted { .. } => "IDENTIFIER_EXHAUSTED",
            Self::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation and business rules
            Self::InvalidAmount(_)
            | Self::InvalidRequest(_)
            | Self::BankMismatch { .. }
            | Self::OwnerMismatch
            | Self::MinimumAmountNotMet { .. }
            | Self::InsufficientFunds { .. } => 400,

            // 401 Unauthorized
            Self::Unauthorized(_) | Self::Unauthenticated => 401,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::CardNotFound(_) | Self::ServiceNotFound(_) => 404,

            // 409 Conflict
            Self::Conflict(_) => 409,

            // 500 Internal Server Error
            Self::IdentifierExhausted { .. } | Self::PersistenceFailure(_) | Self::Internal(_) => {
                500
            }
        }
    }

    /// Returns true if resubmitting the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns true for declines caused by the request itself rather than
    /// by the system.
    #[must_use]
    pub fn is_decline(&self) -> bool {
        matches!(self.http_status_code(), 400 | 401 | 404)
    }

    /// Returns the message safe to show to API clients.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::PersistenceFailure(_) => {
                "The operation could not be stored and was rolled back".to_string()
            }
            Self::Internal(_) => "An error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(what) => Self::Conflict(what),
            StoreError::DuplicateId(what) => {
                Self::PersistenceFailure(format!("identifier already in use: {what}"))
            }
            StoreError::Duplicate(what) => Self::InvalidRequest(format!("{what} already exists")),
            StoreError::Backend(msg) => Self::PersistenceFailure(msg),
        }
    }
}
