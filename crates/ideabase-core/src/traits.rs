//! Core traits for IdeaBase abstractions.
//!
//! These traits define the interfaces that the PostgreSQL repositories and
//! the in-memory mocks both satisfy. Every method is owner-scoped: a row that
//! belongs to another user behaves exactly like a missing row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// NOTES
// =============================================================================

/// Repository for note persistence.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a new note for `owner_id`. Rejects an empty title.
    async fn insert(&self, owner_id: Uuid, req: CreateNoteRequest) -> Result<Note>;

    /// Fetch one of the owner's notes (`NoteNotFound` otherwise).
    async fn fetch(&self, owner_id: Uuid, id: Uuid) -> Result<Note>;

    /// List the owner's notes, most recently updated first.
    async fn list(&self, owner_id: Uuid, req: ListNotesRequest) -> Result<Vec<Note>>;

    /// Apply a partial update. Only the owner can update.
    async fn update(&self, owner_id: Uuid, id: Uuid, req: UpdateNoteRequest) -> Result<Note>;

    /// Whether the owner has a note with this id.
    async fn exists(&self, owner_id: Uuid, id: Uuid) -> Result<bool>;
}

// =============================================================================
// ATTACHMENTS
// =============================================================================

/// Repository for attachment metadata rows.
#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    /// Insert one metadata row.
    async fn insert(&self, attachment: NewAttachment) -> Result<Attachment>;

    /// Flip a pending row to committed.
    async fn mark_committed(&self, id: Uuid) -> Result<()>;

    /// Fetch one of the owner's committed attachments.
    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Attachment>;

    /// List the owner's committed attachments, newest first.
    async fn list(&self, owner_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Attachment>>;

    /// Committed attachments back-referencing a note.
    async fn list_by_note(&self, owner_id: Uuid, note_id: Uuid) -> Result<Vec<Attachment>>;

    /// Delete one of the owner's attachments, returning the removed row.
    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<Attachment>;

    /// Remove a row by id regardless of status. Used to compensate a failed
    /// two-phase upload and to reap abandoned pending rows.
    async fn remove(&self, id: Uuid) -> Result<()>;

    /// Pending rows created before `older_than`.
    async fn list_stale_pending(&self, older_than: DateTime<Utc>) -> Result<Vec<Attachment>>;
}

// =============================================================================
// TAGS
// =============================================================================

/// Repository for tags and note-tag associations.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a tag. Names are unique per owner (case-insensitive).
    async fn create(&self, owner_id: Uuid, req: CreateTagRequest) -> Result<Tag>;

    /// All of the owner's tags ordered by name.
    async fn list(&self, owner_id: Uuid) -> Result<Vec<Tag>>;

    /// Associate a tag with a note. Idempotent.
    async fn add_to_note(&self, owner_id: Uuid, note_id: Uuid, tag_id: Uuid) -> Result<()>;

    /// Remove an association. Returns whether one existed.
    async fn remove_from_note(&self, owner_id: Uuid, note_id: Uuid, tag_id: Uuid)
        -> Result<bool>;

    /// Tags attached to a note.
    async fn list_for_note(&self, owner_id: Uuid, note_id: Uuid) -> Result<Vec<Tag>>;
}

// =============================================================================
// ACCOUNTS
// =============================================================================

/// Accounts and sessions.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Register a new account.
    async fn sign_up(&self, credentials: &Credentials) -> Result<Identity>;

    /// Verify credentials and issue a session.
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session>;

    /// Revoke a session token. Returns whether it was active.
    async fn sign_out(&self, token: &str) -> Result<bool>;

    /// Resolve a token to the identity of an unexpired session.
    async fn resolve(&self, token: &str) -> Result<Option<Identity>>;
}
