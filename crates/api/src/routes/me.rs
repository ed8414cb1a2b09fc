//! The authenticated owner's profile and special PIN.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use ledgerbank_core::auth::{hash_password, verify_password};
use ledgerbank_core::ledger::Account;
use ledgerbank_db::{SessionRepository, UserRepository, entities::users};
use ledgerbank_shared::AppError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    AppState,
    error::ApiError,
    extract::ApiJson,
    middleware::{AuthUser, auth::bearer_token},
};

/// Profile plus account.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// Registered user.
    pub user: users::Model,
    /// The user's account.
    pub account: Account,
}

/// Body of `POST /me/special-pin`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialPinRequest {
    /// New special PIN.
    pub special_pin: String,
}

/// Body of `POST /me/password`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// Password in use now.
    pub current_password: String,
    /// Replacement password.
    pub new_password: String,
}

/// Creates the profile router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/me/special-pin", post(set_special_pin))
        .route("/me/password", post(change_password))
}

/// GET /me - Current user and account.
async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<impl IntoResponse, ApiError> {
    let owner = auth.owner_id();
    let user = UserRepository::new((*state.db).clone())
        .find_by_owner(&owner)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("user {owner}")))?;
    let account = auth.account(&state).await?;

    Ok(Json(MeResponse { user, account }))
}

/// POST /me/special-pin - Set or replace the special PIN.
async fn set_special_pin(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<SpecialPinRequest>,
) -> Result<StatusCode, ApiError> {
    let account = auth.account(&state).await?;
    state
        .registry
        .set_special_pin(&account.id, &payload.special_pin)
        .await?;

    info!(account_id = %account.id, "special PIN set");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /me/password - Replace the login password.
///
/// Every other session of the user is revoked; the one making the request
/// stays open.
async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let owner = auth.owner_id();
    let users = UserRepository::new((*state.db).clone());
    let user = users
        .find_by_owner(&owner)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("user {owner}")))?;

    let current_ok = verify_password(&payload.current_password, &user.password_hash)
        .inspect_err(|e| warn!(owner_id = %owner, error = %e, "stored password hash is unusable"))
        .unwrap_or(false);
    if !current_ok {
        return Err(ApiError::App(AppError::Unauthorized(
            "current password is incorrect".into(),
        )));
    }

    let password_hash = hash_password(&payload.new_password)?;
    if !users.update_password_hash(&owner, &password_hash).await? {
        return Err(ApiError::not_found(format!("user {owner}")));
    }

    if let Some(token) = bearer_token(&headers) {
        let revoked = SessionRepository::new((*state.db).clone())
            .delete_others(&owner, token)
            .await?;
        info!(owner_id = %owner, revoked, "other sessions revoked after password change");
    }

    Ok(StatusCode::NO_CONTENT)
}
