//! Account and session handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use ideabase_core::{Credentials, Identity, Session};

use crate::{ApiError, AppState, RequireSession};

/// Create an account and sign straight in.
pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let Json(credentials) = payload?;
    let identity = state.accounts.sign_up(&credentials).await?;
    let session = state.accounts.sign_in(&credentials).await?;

    info!(
        subsystem = "api",
        component = "auth",
        op = "sign_up",
        owner_id = %identity.user_id,
        "Account created and signed in"
    );
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<Session>, ApiError> {
    let Json(credentials) = payload?;
    let session = state.accounts.sign_in(&credentials).await?;
    info!(
        subsystem = "api",
        component = "auth",
        op = "sign_in",
        owner_id = %session.user_id,
        "Signed in"
    );
    Ok(Json(session))
}

pub async fn sign_out(
    State(state): State<AppState>,
    session: RequireSession,
) -> Result<StatusCode, ApiError> {
    state.accounts.sign_out(&session.token).await?;
    info!(
        subsystem = "api",
        component = "auth",
        op = "sign_out",
        owner_id = %session.identity.user_id,
        "Signed out"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// The identity behind the presented session.
pub async fn current_session(session: RequireSession) -> Json<Identity> {
    Json(session.identity)
}
