use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use ideabase_core::{CreateTagRequest, Tag};

use crate::{ApiError, AppState, RequireSession};

pub async fn create_tag(
    State(state): State<AppState>,
    session: RequireSession,
    payload: Result<Json<CreateTagRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let Json(req) = payload?;
    let tag = state.tags.create(session.identity.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn list_tags(
    State(state): State<AppState>,
    session: RequireSession,
) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.tags.list(session.identity.user_id).await?))
}

pub async fn list_note_tags(
    State(state): State<AppState>,
    session: RequireSession,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    let Path(note_id) = path?;
    let tags = state
        .tags
        .list_for_note(session.identity.user_id, note_id)
        .await?;
    Ok(Json(tags))
}

pub async fn tag_note(
    State(state): State<AppState>,
    session: RequireSession,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path((note_id, tag_id)) = path?;
    state
        .tags
        .add_to_note(session.identity.user_id, note_id, tag_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn untag_note(
    State(state): State<AppState>,
    session: RequireSession,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path((note_id, tag_id)) = path?;
    let removed = state
        .tags
        .remove_from_note(session.identity.user_id, note_id, tag_id)
        .await?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(
            "Tag is not attached to this note".to_string(),
        ))
    }
}
