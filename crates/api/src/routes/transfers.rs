//! Money-moving routes gated by the special PIN.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use ledgerbank_core::auth::verify_special_pin;
use ledgerbank_core::ledger::{Account, BankTransfer, CardTopUp};
use ledgerbank_shared::types::{AccountId, BankId, CardId, OwnerId};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use crate::{AppState, error::ApiError, extract::ApiJson, middleware::AuthUser};

// ===== Request Types =====

/// Body of `POST /transfers/bank`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankTransferRequest {
    /// Account receiving the money.
    pub recipient_account_id: String,
    /// Declared owner of the recipient account.
    pub recipient_owner_id: String,
    /// Declared bank of the recipient account.
    pub bank_id: i32,
    /// Amount to move.
    pub amount: Decimal,
    /// Free text recorded on the entry.
    #[serde(default)]
    pub description: String,
    /// Caller's special PIN.
    pub special_pin: Option<String>,
}

/// Body of `POST /transfers/card`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTopUpRequest {
    /// Card to credit.
    pub card_id: String,
    /// Amount to move.
    pub amount: Decimal,
    /// Caller's special PIN.
    pub special_pin: Option<String>,
}

/// Creates the transfers router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transfers/bank", post(bank_transfer))
        .route("/transfers/card", post(card_top_up))
}

// ===== Handlers =====

/// POST /transfers/bank - Move money to another account.
async fn bank_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<BankTransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sender = authorized_sender(&state, &auth, payload.special_pin.as_deref()).await?;

    let request = BankTransfer {
        sender: sender.id,
        recipient: payload.recipient_account_id.trim().parse::<AccountId>()?,
        recipient_owner: OwnerId::new(payload.recipient_owner_id.trim())?,
        bank_id: BankId(payload.bank_id),
        amount: payload.amount,
        description: payload.description,
    };
    let entry = state.engine.execute_bank_transfer(&request).await?;

    info!(
        entry_id = %entry.id,
        sender = %request.sender,
        recipient = %request.recipient,
        amount = %entry.amount,
        "bank transfer committed"
    );
    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /transfers/card - Top up one of the caller's cards.
async fn card_top_up(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<CardTopUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sender = authorized_sender(&state, &auth, payload.special_pin.as_deref()).await?;

    let request = CardTopUp {
        sender: sender.id,
        card_id: payload.card_id.trim().parse::<CardId>()?,
        amount: payload.amount,
    };
    let entry = state.engine.execute_card_top_up(&request).await?;

    info!(entry_id = %entry.id, card_id = %request.card_id, amount = %entry.amount, "card topped up");
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Loads the caller's account and checks the special PIN against it.
async fn authorized_sender(
    state: &AppState,
    auth: &AuthUser,
    special_pin: Option<&str>,
) -> Result<Account, ApiError> {
    let account = auth.account(state).await?;
    verify_special_pin(account.special_pin_hash.as_deref(), special_pin)?;
    Ok(account)
}
