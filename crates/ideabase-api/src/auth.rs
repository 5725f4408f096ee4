//! Session guard for protected routes.
//!
//! Handlers that take [`RequireSession`] never run without a resolved
//! identity: the extractor rejects with 401 first, so nothing is written.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use tracing::{debug, warn};

use ideabase_core::Identity;

use crate::{ApiError, AppState};

/// Message shown to a caller without a usable session.
pub const SIGN_IN_REQUIRED: &str = "Please sign in";

/// Extract the bearer token from an `Authorization` header value.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Extractor that requires an active session.
pub struct RequireSession {
    pub identity: Identity,
    pub token: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::Unauthorized(SIGN_IN_REQUIRED.to_string()))?
            .to_string();

        match state.accounts.resolve(&token).await? {
            Some(identity) => {
                debug!(
                    subsystem = "api",
                    component = "session_guard",
                    owner_id = %identity.user_id,
                    "Session resolved"
                );
                Ok(RequireSession { identity, token })
            }
            None => {
                warn!(
                    subsystem = "api",
                    component = "session_guard",
                    path = %parts.uri.path(),
                    "Rejected request with unknown or expired session"
                );
                Err(ApiError::Unauthorized(SIGN_IN_REQUIRED.to_string()))
            }
        }
    }
}
