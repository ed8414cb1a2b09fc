//! Bank reference data.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use ledgerbank_db::BankRepository;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the banks router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/banks", get(list_banks))
}

/// GET /banks - Banks other than the caller's own, ordered by id.
async fn list_banks(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let account = auth.account(&state).await?;
    let banks = BankRepository::new((*state.db).clone())
        .list_except(account.bank_id)
        .await?;
    Ok(Json(banks))
}
