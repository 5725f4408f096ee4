//! Attachment metadata repository.
//!
//! Rows reference an object in a [`StorageBackend`](crate::StorageBackend)
//! by `file_path`. Reads only ever return `committed` rows to callers; pending
//! rows are visible solely to the reconciler through `list_stale_pending`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use ideabase_core::{
    Attachment, AttachmentMetadata, AttachmentRepository, AttachmentStatus, Error, FileType,
    NewAttachment, Result,
};

use crate::notes::page_bounds;

const ATTACHMENT_COLUMNS: &str = "id, owner_id, note_id, file_name, file_path, file_size, \
     file_type::text AS file_type, metadata, status::text AS status, created_at";

/// PostgreSQL implementation of AttachmentRepository.
pub struct PgAttachmentRepository {
    pool: Pool<Postgres>,
}

impl PgAttachmentRepository {
    /// Create a new PgAttachmentRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttachmentRepository for PgAttachmentRepository {
    async fn insert(&self, attachment: NewAttachment) -> Result<Attachment> {
        let row = sqlx::query(&format!(
            "INSERT INTO attachment
                (id, owner_id, note_id, file_name, file_path, file_size, file_type, metadata, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7::file_type, $8, $9::attachment_status, $10)
             RETURNING {ATTACHMENT_COLUMNS}"
        ))
        .bind(attachment.id)
        .bind(attachment.owner_id)
        .bind(attachment.note_id)
        .bind(&attachment.file_name)
        .bind(&attachment.file_path)
        .bind(attachment.file_size)
        .bind(attachment.file_type.as_str())
        .bind(Json(&attachment.metadata))
        .bind(attachment.status.to_string())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "attachments",
            op = "insert_attachment",
            attachment_id = %attachment.id,
            file_path = %attachment.file_path,
            status = %attachment.status,
            "Attachment row inserted"
        );
        attachment_from_row(&row)
    }

    async fn mark_committed(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE attachment SET status = 'committed'::attachment_status
             WHERE id = $1 AND status = 'pending'::attachment_status",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::AttachmentNotFound(id));
        }
        Ok(())
    }

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Attachment> {
        let row = sqlx::query(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachment
             WHERE id = $1 AND owner_id = $2 AND status = 'committed'::attachment_status"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::AttachmentNotFound(id))?;

        attachment_from_row(&row)
    }

    async fn list(&self, owner_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Attachment>> {
        let (limit, offset) = page_bounds(Some(limit), Some(offset));
        let rows = sqlx::query(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachment
             WHERE owner_id = $1 AND status = 'committed'::attachment_status
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(attachment_from_row).collect()
    }

    async fn list_by_note(&self, owner_id: Uuid, note_id: Uuid) -> Result<Vec<Attachment>> {
        let rows = sqlx::query(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachment
             WHERE owner_id = $1 AND note_id = $2 AND status = 'committed'::attachment_status
             ORDER BY created_at ASC"
        ))
        .bind(owner_id)
        .bind(note_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(attachment_from_row).collect()
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<Attachment> {
        let row = sqlx::query(&format!(
            "DELETE FROM attachment
             WHERE id = $1 AND owner_id = $2 AND status = 'committed'::attachment_status
             RETURNING {ATTACHMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::AttachmentNotFound(id))?;

        attachment_from_row(&row)
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM attachment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn list_stale_pending(&self, older_than: DateTime<Utc>) -> Result<Vec<Attachment>> {
        let rows = sqlx::query(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachment
             WHERE status = 'pending'::attachment_status AND created_at < $1
             ORDER BY created_at ASC"
        ))
        .bind(older_than)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(attachment_from_row).collect()
    }
}

/// Convert a database row to an Attachment.
fn attachment_from_row(row: &sqlx::postgres::PgRow) -> Result<Attachment> {
    let file_type: FileType = row
        .get::<String, _>("file_type")
        .parse()
        .map_err(Error::Internal)?;
    let status: AttachmentStatus = row
        .get::<String, _>("status")
        .parse()
        .map_err(Error::Internal)?;
    let Json(metadata): Json<AttachmentMetadata> = row.get("metadata");

    Ok(Attachment {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        note_id: row.get("note_id"),
        file_name: row.get("file_name"),
        file_path: row.get("file_path"),
        file_size: row.get("file_size"),
        file_type,
        metadata,
        status,
        created_at: row.get("created_at"),
    })
}
