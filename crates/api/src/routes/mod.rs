//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::auth_middleware};

pub mod auth;
pub mod banks;
pub mod beneficiaries;
pub mod cards;
pub mod health;
pub mod me;
pub mod movements;
pub mod services;
pub mod statements;
pub mod transfers;
pub mod users;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Protected routes that require an active session
    let protected_routes = Router::new()
        .merge(me::routes())
        .merge(banks::routes())
        .merge(services::routes())
        .merge(transfers::routes())
        .merge(movements::routes())
        .merge(statements::routes())
        .merge(cards::routes())
        .merge(beneficiaries::routes())
        .merge(users::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Combine public and protected routes
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(protected_routes)
}
