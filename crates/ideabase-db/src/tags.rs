//! Tag repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use ideabase_core::{defaults, CreateTagRequest, Error, Result, Tag, TagRepository};

/// Validate a tag name.
///
/// Rules:
/// - Between 1 and `TAG_NAME_MAX_LEN` characters after trimming
/// - No control characters
pub fn validate_tag_name(name: &str) -> std::result::Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Tag name cannot be empty".to_string());
    }
    if name.chars().count() > defaults::TAG_NAME_MAX_LEN {
        return Err(format!(
            "Tag name must be {} characters or less",
            defaults::TAG_NAME_MAX_LEN
        ));
    }
    if name.chars().any(char::is_control) {
        return Err("Tag name cannot contain control characters".to_string());
    }
    Ok(())
}

/// Validate a tag color: `#rgb` or `#rrggbb` hex.
pub fn validate_tag_color(color: &str) -> std::result::Result<(), String> {
    let hex = color
        .strip_prefix('#')
        .ok_or_else(|| format!("Invalid tag color '{}': expected #rrggbb", color))?;
    if !matches!(hex.len(), 3 | 6) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("Invalid tag color '{}': expected #rrggbb", color));
    }
    Ok(())
}

/// Validate a full create request.
pub fn validate_tag_request(req: &CreateTagRequest) -> Result<()> {
    validate_tag_name(&req.name).map_err(Error::InvalidInput)?;
    if let Some(color) = &req.color {
        validate_tag_color(color).map_err(Error::InvalidInput)?;
    }
    Ok(())
}

/// PostgreSQL implementation of TagRepository.
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn require_note(&self, owner_id: Uuid, note_id: Uuid) -> Result<()> {
        let found = sqlx::query("SELECT 1 FROM note WHERE id = $1 AND owner_id = $2")
            .bind(note_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        found.map(|_| ()).ok_or(Error::NoteNotFound(note_id))
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn create(&self, owner_id: Uuid, req: CreateTagRequest) -> Result<Tag> {
        validate_tag_request(&req)?;

        let id = Uuid::now_v7();
        let name = req.name.trim().to_string();
        let result = sqlx::query(
            "INSERT INTO tag (id, owner_id, name, color, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(owner_id)
        .bind(&name)
        .bind(&req.color)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Tag {
                id,
                owner_id,
                name,
                color: req.color,
            }),
            Err(e) => {
                let err = Error::Database(e);
                if err.is_unique_violation() {
                    Err(Error::Conflict(format!("Tag '{}' already exists", name)))
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn list(&self, owner_id: Uuid) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            "SELECT id, owner_id, name, color FROM tag WHERE owner_id = $1 ORDER BY LOWER(name)",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(tag_from_row).collect())
    }

    async fn add_to_note(&self, owner_id: Uuid, note_id: Uuid, tag_id: Uuid) -> Result<()> {
        self.require_note(owner_id, note_id).await?;

        // Only link a tag the caller owns.
        let result = sqlx::query(
            "INSERT INTO note_tag (note_id, tag_id)
             SELECT $1, t.id FROM tag t WHERE t.id = $2 AND t.owner_id = $3
             ON CONFLICT (note_id, tag_id) DO NOTHING",
        )
        .bind(note_id)
        .bind(tag_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            let owned = sqlx::query("SELECT 1 FROM tag WHERE id = $1 AND owner_id = $2")
                .bind(tag_id)
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;
            if owned.is_none() {
                return Err(Error::NotFound(format!("Tag {} not found", tag_id)));
            }
        }
        Ok(())
    }

    async fn remove_from_note(
        &self,
        owner_id: Uuid,
        note_id: Uuid,
        tag_id: Uuid,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM note_tag nt USING note n
             WHERE nt.note_id = n.id AND n.owner_id = $1 AND nt.note_id = $2 AND nt.tag_id = $3",
        )
        .bind(owner_id)
        .bind(note_id)
        .bind(tag_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_for_note(&self, owner_id: Uuid, note_id: Uuid) -> Result<Vec<Tag>> {
        self.require_note(owner_id, note_id).await?;

        let rows = sqlx::query(
            "SELECT t.id, t.owner_id, t.name, t.color
             FROM note_tag nt
             JOIN tag t ON t.id = nt.tag_id
             WHERE nt.note_id = $1 AND t.owner_id = $2
             ORDER BY LOWER(t.name)",
        )
        .bind(note_id)
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(tag_from_row).collect())
    }
}

fn tag_from_row(row: &sqlx::postgres::PgRow) -> Tag {
    Tag {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        color: row.get("color"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tag_name_valid() {
        assert!(validate_tag_name("work").is_ok());
        assert!(validate_tag_name("Project Ideas").is_ok());
        assert!(validate_tag_name("  padded  ").is_ok());
    }

    #[test]
    fn test_validate_tag_name_empty() {
        assert!(validate_tag_name("").is_err());
        assert!(validate_tag_name("   ").is_err());
    }

    #[test]
    fn test_validate_tag_name_too_long() {
        let long = "x".repeat(defaults::TAG_NAME_MAX_LEN + 1);
        let err = validate_tag_name(&long).unwrap_err();
        assert!(err.contains("characters or less"));
        assert!(validate_tag_name(&"x".repeat(defaults::TAG_NAME_MAX_LEN)).is_ok());
    }

    #[test]
    fn test_validate_tag_name_control_chars() {
        assert!(validate_tag_name("bad\u{0007}tag").is_err());
    }

    #[test]
    fn test_validate_tag_color() {
        assert!(validate_tag_color("#fff").is_ok());
        assert!(validate_tag_color("#3B82F6").is_ok());
        assert!(validate_tag_color("3B82F6").is_err());
        assert!(validate_tag_color("#12345").is_err());
        assert!(validate_tag_color("#gggggg").is_err());
    }

    #[test]
    fn test_validate_tag_request_maps_to_invalid_input() {
        let req = CreateTagRequest {
            name: "ok".into(),
            color: Some("blue".into()),
        };
        assert!(matches!(
            validate_tag_request(&req),
            Err(Error::InvalidInput(_))
        ));
    }
}
