//! Authentication routes for register, login, and logout.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use chrono::{DateTime, Utc};
use ledgerbank_core::auth::{UserRole, hash_password, verify_password};
use ledgerbank_core::ledger::Account;
use ledgerbank_db::{NewUser, SessionRepository, UserRepository};
use ledgerbank_shared::types::{BankId, OwnerId};
use ledgerbank_shared::{AppError, IssuedToken};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{AppState, error::ApiError, extract::ApiJson, middleware::auth::bearer_token};

// ===== Request/Response Types =====

/// Body of `POST /auth/register`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// National id, 1 to 10 alphanumeric characters.
    pub owner_id: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    #[serde(default)]
    pub phone: String,
    /// Postal address, printed on statements.
    #[serde(default)]
    pub address: String,
    /// Login password.
    pub password: String,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: String,
}

/// A freshly issued session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Bearer token.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// The account opened at registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,
}

/// Creates the auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

// ===== Handlers =====

/// POST /auth/register - Register a user and open their account.
async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let owner_id = OwnerId::new(payload.owner_id.trim())?;
    for (field, value) in [
        ("firstName", &payload.first_name),
        ("lastName", &payload.last_name),
        ("username", &payload.username),
        ("email", &payload.email),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::validation(format!("{field} is required")));
        }
    }

    let password_hash = hash_password(&payload.password)?;
    let user = NewUser {
        owner_id: owner_id.clone(),
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        username: payload.username.trim().to_string(),
        email: payload.email.trim().to_lowercase(),
        phone: payload.phone.trim().to_string(),
        address: payload.address.trim().to_string(),
        role: UserRole::User,
        password_hash,
    };

    let users = UserRepository::new((*state.db).clone());
    let account = users
        .register(
            user,
            BankId(state.ledger_config.home_bank_id),
            state.identifier_policy(),
        )
        .await?;

    let session = open_session(&state, &owner_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token: session.token,
            expires_at: session.expires_at,
            account: Some(account),
        }),
    ))
}

/// POST /auth/login - Exchange credentials for a session token.
async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invalid = || ApiError::App(AppError::Unauthorized("invalid username or password".into()));

    let users = UserRepository::new((*state.db).clone());
    let Some(user) = users.find_by_username(payload.username.trim()).await? else {
        info!(username = %payload.username, "login attempt for unknown user");
        return Err(invalid());
    };

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            info!(owner_id = %user.owner_id, "failed login attempt");
            return Err(invalid());
        }
        Err(e) => {
            warn!(owner_id = %user.owner_id, error = %e, "stored password hash is unusable");
            return Err(invalid());
        }
    }

    let session = open_session(&state, &OwnerId::from_stored(&user.owner_id)).await?;

    Ok(Json(SessionResponse {
        token: session.token,
        expires_at: session.expires_at,
        account: None,
    }))
}

/// POST /auth/logout - Revoke the presented session token.
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthenticated("Authorization header with Bearer token is required"))?;

    let sessions = SessionRepository::new((*state.db).clone());
    if sessions.delete_by_token(token).await? {
        info!("session revoked");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Issues a token and records its session row.
async fn open_session(state: &AppState, owner_id: &OwnerId) -> Result<IssuedToken, ApiError> {
    let issued = state.jwt_service.issue_session_token(owner_id)?;

    SessionRepository::new((*state.db).clone())
        .create(owner_id, &issued.token, issued.expires_at)
        .await?;

    info!(owner_id = %owner_id, expires_at = %issued.expires_at, "session opened");
    Ok(issued)
}
