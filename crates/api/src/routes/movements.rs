//! Recent account activity.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use ledgerbank_core::statement::ActivityRange;
use serde::Deserialize;

use crate::{AppState, error::ApiError, extract::ApiQuery, middleware::AuthUser};

/// Query of `GET /movements`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementsQuery {
    /// First day included, `YYYY-MM-DD`.
    pub from_date: Option<String>,
    /// Last day included, `YYYY-MM-DD`.
    pub to_date: Option<String>,
    /// Entries to return.
    pub limit: Option<u64>,
}

/// Creates the movements router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/movements", get(list_movements))
}

/// GET /movements - Newest entries first, each with the balance after it.
async fn list_movements(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<MovementsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let range = ActivityRange::parse(query.from_date.as_deref(), query.to_date.as_deref())?;
    let account = auth.account(&state).await?;

    let lines = state
        .statements
        .recent_activity(&account.id, range, query.limit)
        .await?;
    Ok(Json(lines))
}
