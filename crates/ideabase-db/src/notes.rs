//! Note repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use ideabase_core::{
    defaults, validate_note_title, CreateNoteRequest, Error, ListNotesRequest, Note,
    NoteRepository, Result, UpdateNoteRequest,
};

const NOTE_COLUMNS: &str = "id, owner_id, title, content, archived, created_at, updated_at";

/// Clamp caller-supplied paging to the configured bounds.
pub(crate) fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit
        .unwrap_or(defaults::PAGE_LIMIT)
        .clamp(1, defaults::PAGE_LIMIT_MAX);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

/// PostgreSQL implementation of NoteRepository.
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(&self, owner_id: Uuid, req: CreateNoteRequest) -> Result<Note> {
        validate_note_title(&req.title)?;

        let id = Uuid::now_v7();
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO note (id, owner_id, title, content, archived, created_at, updated_at)
             VALUES ($1, $2, $3, $4, false, $5, $5)
             RETURNING {NOTE_COLUMNS}"
        ))
        .bind(id)
        .bind(owner_id)
        .bind(req.title.trim())
        .bind(&req.content)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "notes",
            op = "insert_note",
            owner_id = %owner_id,
            note_id = %id,
            "Note inserted"
        );
        Ok(note_from_row(&row))
    }

    async fn fetch(&self, owner_id: Uuid, id: Uuid) -> Result<Note> {
        let row = sqlx::query(&format!(
            "SELECT {NOTE_COLUMNS} FROM note WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::NoteNotFound(id))?;

        Ok(note_from_row(&row))
    }

    async fn list(&self, owner_id: Uuid, req: ListNotesRequest) -> Result<Vec<Note>> {
        let (limit, offset) = page_bounds(req.limit, req.offset);
        let rows = sqlx::query(&format!(
            "SELECT {NOTE_COLUMNS} FROM note
             WHERE owner_id = $1 AND ($2::boolean IS NULL OR archived = $2)
             ORDER BY updated_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(owner_id)
        .bind(req.archived)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(note_from_row).collect())
    }

    async fn update(&self, owner_id: Uuid, id: Uuid, req: UpdateNoteRequest) -> Result<Note> {
        if let Some(title) = &req.title {
            validate_note_title(title)?;
        }
        if req.is_empty() {
            return self.fetch(owner_id, id).await;
        }

        let row = sqlx::query(&format!(
            "UPDATE note SET
                title = COALESCE($3, title),
                content = COALESCE($4, content),
                archived = COALESCE($5, archived),
                updated_at = $6
             WHERE id = $1 AND owner_id = $2
             RETURNING {NOTE_COLUMNS}"
        ))
        .bind(id)
        .bind(owner_id)
        .bind(req.title.as_deref().map(str::trim))
        .bind(req.content.as_deref())
        .bind(req.archived)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::NoteNotFound(id))?;

        Ok(note_from_row(&row))
    }

    async fn exists(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM note WHERE id = $1 AND owner_id = $2) AS present",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.get("present"))
    }
}

fn note_from_row(row: &sqlx::postgres::PgRow) -> Note {
    Note {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        content: row.get("content"),
        archived: row.get("archived"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
