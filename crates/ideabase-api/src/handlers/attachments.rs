//! Attachment metadata, content and deletion.

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use ideabase_core::{defaults, Attachment};

use crate::{ApiError, AppState, RequireSession};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    fn bounds(&self) -> (i64, i64) {
        (
            self.limit
                .unwrap_or(defaults::PAGE_LIMIT)
                .clamp(1, defaults::PAGE_LIMIT_MAX),
            self.offset.unwrap_or(0).max(0),
        )
    }
}

pub async fn list_attachments(
    State(state): State<AppState>,
    session: RequireSession,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Vec<Attachment>>, ApiError> {
    let Query(query) = query?;
    let (limit, offset) = query.bounds();
    let rows = state
        .attachments
        .list(session.identity.user_id, limit, offset)
        .await?;
    Ok(Json(rows))
}

pub async fn list_note_attachments(
    State(state): State<AppState>,
    session: RequireSession,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<Attachment>>, ApiError> {
    let Path(note_id) = path?;
    let owner_id = session.identity.user_id;
    if !state.notes.exists(owner_id, note_id).await? {
        return Err(ApiError::NotFound("Note not found".to_string()));
    }
    let rows = state.attachments.list_by_note(owner_id, note_id).await?;
    Ok(Json(rows))
}

pub async fn get_attachment(
    State(state): State<AppState>,
    session: RequireSession,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Attachment>, ApiError> {
    let Path(id) = path?;
    Ok(Json(
        state.attachments.get(session.identity.user_id, id).await?,
    ))
}

/// Stream back the stored bytes with the attachment's content type.
pub async fn download_attachment(
    State(state): State<AppState>,
    session: RequireSession,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = path?;
    let attachment = state.attachments.get(session.identity.user_id, id).await?;
    let bytes = state.storage.get(&attachment.file_path).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(attachment.file_type.mime_type()),
    );
    let disposition = HeaderValue::from_str(&format!(
        "inline; filename=\"{}\"",
        attachment.metadata.original_name
    ))
    .or_else(|_| {
        HeaderValue::from_str(&format!("inline; filename=\"{}\"", attachment.file_name))
    });
    if let Ok(value) = disposition {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((headers, bytes).into_response())
}

/// Explicit user deletion: the row goes first, then the object.
pub async fn delete_attachment(
    State(state): State<AppState>,
    session: RequireSession,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    let removed = state.attachments.delete(session.identity.user_id, id).await?;

    if let Err(e) = state.storage.delete(&removed.file_path).await {
        error!(
            subsystem = "api",
            component = "attachments",
            op = "delete_object",
            attachment_id = %removed.id,
            file_path = %removed.file_path,
            error = %e,
            "Attachment row deleted but object removal failed"
        );
    }

    info!(
        subsystem = "api",
        component = "attachments",
        op = "delete_attachment",
        owner_id = %removed.owner_id,
        attachment_id = %removed.id,
        "Attachment deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
