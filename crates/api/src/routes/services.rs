//! Payable services.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use ledgerbank_core::ledger::{LedgerError, ServicePayment};
use ledgerbank_shared::types::ServiceId;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use crate::{AppState, error::ApiError, extract::ApiJson, middleware::AuthUser};

/// Body of `POST /services/pay`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePaymentRequest {
    /// Service to pay.
    pub service_id: i32,
    /// Amount to pay.
    pub amount: Decimal,
    /// Value of the service's field, e.g. the contract number.
    #[serde(default)]
    pub field_description: String,
}

/// Creates the services router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services))
        .route("/services/pay", post(pay_service))
}

/// GET /services - All payable services.
async fn list_services(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let services = state
        .ledger
        .list_services()
        .await
        .map_err(LedgerError::from)?;
    Ok(Json(services))
}

/// POST /services/pay - Pay a service from the caller's account.
async fn pay_service(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<ServicePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = auth.account(&state).await?;

    let entry = state
        .engine
        .execute_service_payment(&ServicePayment {
            sender: account.id,
            service_id: ServiceId(payload.service_id),
            amount: payload.amount,
            field_description: payload.field_description,
        })
        .await?;

    info!(entry_id = %entry.id, amount = %entry.amount, "service paid");
    Ok((StatusCode::CREATED, Json(entry)))
}
