//! Authentication middleware for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use ledgerbank_core::ledger::Account;
use ledgerbank_db::SessionRepository;
use ledgerbank_shared::Claims;
use ledgerbank_shared::types::OwnerId;
use tracing::debug;

use crate::{AppState, error::ApiError};

/// Extracts the bearer token from the Authorization header.
pub(crate) fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Reads the bearer token of a request, if any.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
}

/// Authentication middleware that validates session tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates the token signature and expiry
/// 3. Requires an unrevoked, unexpired session row for the token
/// 4. Stores the claims in request extensions for handlers to access
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()).map(str::to_owned) else {
        return ApiError::unauthenticated("Authorization header with Bearer token is required")
            .into_response();
    };

    let claims = match state.jwt_service.validate_token(&token) {
        Ok(claims) => claims,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let sessions = SessionRepository::new((*state.db).clone());
    match sessions.find_active(&token).await {
        Ok(Some(session)) if session.owner_id == claims.sub => {}
        Ok(_) => {
            debug!(owner_id = %claims.sub, "token has no active session");
            return ApiError::unauthenticated("Session has ended").into_response();
        }
        Err(e) => return ApiError::from(e).into_response(),
    }

    request.extensions_mut().insert(claims);
    next.run(request).await
}

/// Extractor for the authenticated owner.
///
/// ```ignore
/// async fn handler(user: AuthUser) -> impl IntoResponse {
///     let owner = user.owner_id();
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the owner id from the claims.
    #[must_use]
    pub fn owner_id(&self) -> OwnerId {
        self.0.owner_id()
    }

    /// Returns the inner claims.
    #[must_use]
    pub fn claims(&self) -> &Claims {
        &self.0
    }

    /// Loads the caller's account.
    ///
    /// # Errors
    ///
    /// `NotFound` if the owner has no account, or a persistence error.
    pub async fn account(&self, state: &AppState) -> Result<Account, ApiError> {
        let owner = self.owner_id();
        state
            .ledger
            .find_account_by_owner(&owner)
            .await
            .map_err(|e| ApiError::Ledger(e.into()))?
            .ok_or_else(|| ApiError::not_found(format!("no account for owner {owner}")))
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError::unauthenticated("Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Bearer abc.def.ghi", Some("abc.def.ghi"))]
    #[case("bearer abc", Some("abc"))]
    #[case("Bearer   ", None)]
    #[case("Basic dXNlcjpwYXNz", None)]
    #[case("abc", None)]
    fn test_extract_bearer_token(#[case] header: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_bearer_token(header), expected);
    }
}
