//! Staff-only user directory.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use ledgerbank_core::auth::UserRole;
use ledgerbank_db::{
    UserRepository,
    entities::{accounts, users},
};
use ledgerbank_shared::AppError;
use serde::Serialize;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// A user with their account, as listed for staff.
#[derive(Debug, Serialize)]
pub struct UserListing {
    /// Registered user, without the password hash.
    #[serde(flatten)]
    pub user: users::Model,
    /// The user's account, if one is open.
    pub account: Option<accounts::Model>,
}

/// Creates the users router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/users", get(list_users))
}

/// GET /users - Every user and account. Admins only.
async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let users = UserRepository::new((*state.db).clone());
    if !users.has_role(&auth.owner_id(), UserRole::Admin).await? {
        return Err(ApiError::App(AppError::Forbidden(
            "only administrators can list users".into(),
        )));
    }

    let listing: Vec<UserListing> = users
        .list_with_accounts()
        .await?
        .into_iter()
        .map(|(user, account)| UserListing { user, account })
        .collect();

    Ok(Json(listing))
}
