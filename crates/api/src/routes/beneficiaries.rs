//! Frequent beneficiaries.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use ledgerbank_core::ledger::LedgerError;
use ledgerbank_db::{BeneficiaryRepository, entities::beneficiaries};
use ledgerbank_shared::types::AccountId;
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError, extract::ApiJson, middleware::AuthUser};

/// Body of `POST /beneficiaries`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBeneficiaryRequest {
    /// Name shown in the caller's list.
    pub alias: String,
    /// 16-digit account to save.
    pub account_id: String,
}

/// The caller's saved beneficiaries.
#[derive(Debug, Serialize)]
pub struct BeneficiariesResponse {
    /// Oldest first.
    pub beneficiaries: Vec<beneficiaries::Model>,
}

/// Creates the beneficiaries router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/beneficiaries", get(list_beneficiaries).post(add_beneficiary))
}

/// GET /beneficiaries
async fn list_beneficiaries(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let beneficiaries = BeneficiaryRepository::new((*state.db).clone())
        .list(&auth.owner_id())
        .await?;
    Ok(Json(BeneficiariesResponse { beneficiaries }))
}

/// POST /beneficiaries - Save an existing account under an alias.
async fn add_beneficiary(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<AddBeneficiaryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = payload.account_id.trim().parse::<AccountId>()?;
    let account = state
        .ledger
        .find_account(&account_id)
        .await
        .map_err(LedgerError::from)?
        .ok_or(LedgerError::AccountNotFound(account_id))?;

    let saved = BeneficiaryRepository::new((*state.db).clone())
        .add(&auth.owner_id(), &payload.alias, &account)
        .await?;

    Ok((StatusCode::CREATED, Json(saved)))
}
