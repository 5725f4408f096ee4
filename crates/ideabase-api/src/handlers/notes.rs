//! Note Persistence handlers.
//!
//! Titles are checked here, before the repository is called, so an empty
//! title never reaches the database.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use ideabase_core::{
    validate_note_title, CreateNoteRequest, Error, ListNotesRequest, Note, UpdateNoteRequest,
};

use crate::{ApiError, AppState, RequireSession};

#[derive(Debug, Default, Deserialize)]
pub struct ListNotesQuery {
    pub archived: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn create_note(
    State(state): State<AppState>,
    session: RequireSession,
    payload: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let Json(req) = payload?;
    validate_note_title(&req.title).map_err(Error::from)?;

    let owner_id = session.identity.user_id;
    let note = state.notes.insert(owner_id, req).await?;
    info!(
        subsystem = "api",
        component = "notes",
        op = "insert_note",
        owner_id = %owner_id,
        note_id = %note.id,
        "Note created"
    );
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": note.id })),
    ))
}

pub async fn list_notes(
    State(state): State<AppState>,
    session: RequireSession,
    query: Result<Query<ListNotesQuery>, QueryRejection>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let Query(query) = query?;
    let notes = state
        .notes
        .list(
            session.identity.user_id,
            ListNotesRequest {
                archived: query.archived,
                limit: query.limit,
                offset: query.offset,
            },
        )
        .await?;
    Ok(Json(notes))
}

pub async fn get_note(
    State(state): State<AppState>,
    session: RequireSession,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Note>, ApiError> {
    let Path(id) = path?;
    let note = state.notes.fetch(session.identity.user_id, id).await?;
    Ok(Json(note))
}

pub async fn update_note(
    State(state): State<AppState>,
    session: RequireSession,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateNoteRequest>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    if let Some(title) = &req.title {
        validate_note_title(title).map_err(Error::from)?;
    }

    let note = state.notes.update(session.identity.user_id, id, req).await?;
    info!(
        subsystem = "api",
        component = "notes",
        op = "update_note",
        owner_id = %note.owner_id,
        note_id = %note.id,
        "Note updated"
    );
    Ok(Json(note))
}
