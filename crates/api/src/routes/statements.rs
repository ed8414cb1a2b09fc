//! Monthly statements, as JSON or as a rendered document.

use axum::{
    Json, Router,
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
    routing::get,
};
use ledgerbank_core::statement::{PeriodStatement, StatementDocument, StatementPeriod};
use ledgerbank_db::UserRepository;
use ledgerbank_shared::AppError;
use serde::Deserialize;
use tracing::info;

use crate::{AppState, error::ApiError, extract::ApiQuery, middleware::AuthUser};

/// Query of the statement routes.
#[derive(Debug, Default, Deserialize)]
pub struct StatementQuery {
    /// Calendar year.
    pub year: Option<i32>,
    /// Month, 1 to 12.
    pub month: Option<u32>,
}

/// Creates the statements router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/statements", get(statement))
        .route("/statements/document", get(statement_document))
}

async fn reconstruct(
    state: &AppState,
    auth: &AuthUser,
    query: &StatementQuery,
) -> Result<PeriodStatement, ApiError> {
    let period = StatementPeriod::from_parts(query.year, query.month)?;
    let account = auth.account(state).await?;
    Ok(state.statements.period_statement(&account.id, period).await?)
}

/// GET /statements - One month replayed from its opening balance.
async fn statement(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<StatementQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(reconstruct(&state, &auth, &query).await?))
}

/// GET /statements/document - The same month as a downloadable document.
async fn statement_document(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<StatementQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let statement = reconstruct(&state, &auth, &query).await?;

    let owner = auth.owner_id();
    let user = UserRepository::new((*state.db).clone())
        .find_by_owner(&owner)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("user {owner}")))?;

    let document = StatementDocument::from_statement(&statement, user.full_name(), user.address);
    let body = state
        .renderer
        .render(&document)
        .map_err(|e| ApiError::App(AppError::Internal(e.to_string())))?;

    let filename = format!(
        "statement-{}.{}",
        statement.period.slug(),
        state.renderer.file_extension()
    );
    info!(account_id = %statement.account_id, period = %statement.period.slug(), rows = document.rows.len(), "statement rendered");

    Ok((
        [
            (CONTENT_TYPE, state.renderer.content_type().to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    ))
}
