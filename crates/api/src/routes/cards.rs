//! Card issuance and card movements.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use ledgerbank_core::ledger::{Card, CardType};
use ledgerbank_shared::types::{AccountId, CardId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppState, error::ApiError, extract::ApiJson, middleware::AuthUser};

/// Body of `POST /cards`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCardRequest {
    /// `credit` or `debit`.
    pub card_type: String,
}

/// A card as listed, without its verification code.
#[derive(Debug, Serialize)]
pub struct CardResponse {
    /// 16-digit card number.
    pub id: CardId,
    /// Owning account.
    pub account_id: AccountId,
    /// Credit or debit.
    pub card_type: CardType,
    /// Sub-balance.
    pub balance: Decimal,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
    /// Issue instant.
    pub issued_at: DateTime<Utc>,
}

impl From<Card> for CardResponse {
    fn from(card: Card) -> Self {
        Self {
            id: card.id,
            account_id: card.account_id,
            card_type: card.card_type,
            balance: card.balance,
            expires_at: card.expires_at,
            issued_at: card.issued_at,
        }
    }
}

/// Creates the cards router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cards", get(list_cards).post(issue_card))
        .route("/cards/{card_id}/movements", get(card_movements))
}

/// POST /cards - Issue a card; the only response that carries the CVC.
async fn issue_card(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<IssueCardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let card_type: CardType = payload.card_type.parse()?;
    let account = auth.account(&state).await?;

    let card = state.registry.issue_card(&account.id, card_type).await?;

    info!(card_id = %card.id, account_id = %account.id, "card issued over api");
    Ok((StatusCode::CREATED, Json(card)))
}

/// GET /cards - Cards of the caller's account.
async fn list_cards(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let account = auth.account(&state).await?;
    let cards: Vec<CardResponse> = state
        .registry
        .cards_for_account(&account.id)
        .await?
        .into_iter()
        .map(CardResponse::from)
        .collect();
    Ok(Json(cards))
}

/// GET /cards/{card_id}/movements - Latest top-ups of one card.
async fn card_movements(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(card_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let card_id: CardId = card_id.parse()?;
    let account = auth.account(&state).await?;

    let entries = state.statements.card_movements(&account.id, &card_id).await?;
    Ok(Json(entries))
}
