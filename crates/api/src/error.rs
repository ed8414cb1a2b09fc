//! The JSON error envelope.
//!
//! Every failure leaves the API as `{"error": <code>, "message": <text>}`
//! with the status and code of the underlying error. Server-side failures
//! are logged with their detail and answered with a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ledgerbank_core::auth::PasswordError;
use ledgerbank_core::ledger::LedgerError;
use ledgerbank_db::{BeneficiaryError, RegistrationError};
use ledgerbank_shared::types::IdError;
use ledgerbank_shared::{AppError, JwtError};
use sea_orm::DbErr;
use serde_json::json;
use tracing::{error, warn};

/// Any error a handler can return.
#[derive(Debug)]
pub enum ApiError {
    /// A ledger operation failed.
    Ledger(LedgerError),
    /// Anything around the ledger failed.
    App(AppError),
}

impl ApiError {
    /// Returns the HTTP status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        let code = match self {
            Self::Ledger(e) => e.http_status_code(),
            Self::App(e) => e.status_code(),
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns the stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ledger(e) => e.error_code(),
            Self::App(e) => e.error_code(),
        }
    }

    /// Returns the message shown to the client.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Ledger(e) => e.public_message(),
            Self::App(e) => e.public_message(),
        }
    }

    /// Shorthand for a 400.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::App(AppError::Validation(message.into()))
    }

    /// Shorthand for a 401 on missing or invalid sessions.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::App(AppError::Unauthenticated(message.into()))
    }

    /// Shorthand for a 404.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::App(AppError::NotFound(message.into()))
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self::App(AppError::Database(err.to_string()))
    }
}

impl From<IdError> for ApiError {
    fn from(err: IdError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => Self::unauthenticated("Session has expired"),
            JwtError::DecodingError(_) => Self::unauthenticated("Invalid session token"),
            JwtError::EncodingError(msg) => Self::App(AppError::Internal(msg)),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Blank => Self::validation("password must not be blank"),
            other => Self::App(AppError::Internal(other.to_string())),
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::AlreadyRegistered(what) => {
                Self::App(AppError::Conflict(format!("{what} is already registered")))
            }
            RegistrationError::Ledger(e) => Self::Ledger(e),
            RegistrationError::Database(e) => e.into(),
        }
    }
}

impl From<BeneficiaryError> for ApiError {
    fn from(err: BeneficiaryError) -> Self {
        match err {
            BeneficiaryError::InvalidAlias | BeneficiaryError::OwnAccount => {
                Self::validation(err.to_string())
            }
            BeneficiaryError::AlreadySaved(_) => Self::App(AppError::Conflict(err.to_string())),
            BeneficiaryError::Database(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        if status.is_server_error() {
            let detail = match &self {
                Self::Ledger(e) => e.to_string(),
                Self::App(e) => e.to_string(),
            };
            error!(code, error = %detail, "request failed");
        } else {
            warn!(code, status = status.as_u16(), message = %self.message(), "request declined");
        }

        (
            status,
            Json(json!({
                "error": code,
                "message": self.message(),
            })),
        )
            .into_response()
    }
}
