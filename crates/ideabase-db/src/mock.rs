//! In-memory repositories and object storage for deterministic testing.
//!
//! Every type here is cheaply cloneable; clones share state, so a test can
//! hand one clone to the code under test and inspect another afterwards.
//! Failure switches let tests drive the error paths of the upload pathway.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ideabase_db::mock::MemoryBackend;
//!
//! let storage = MemoryBackend::new();
//! storage.fail_puts(true);
//! // ... run an upload, expect a storage-write error ...
//! assert_eq!(storage.object_count(), 0);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use ideabase_core::{
    defaults, validate_note_title, AccountRepository, Attachment, AttachmentRepository,
    AttachmentStatus, CreateNoteRequest, CreateTagRequest, Credentials, Error, Identity,
    ListNotesRequest, NewAttachment, Note, NoteRepository, Result, Session, Tag, TagRepository,
    UpdateNoteRequest,
};

use crate::accounts::{
    generate_session_token, hash_password, hash_token, validate_credentials, verify_password,
};
use crate::file_storage::{validate_key, StorageBackend};
use crate::notes::page_bounds;
use crate::tags::validate_tag_request;

/// One recorded call against a mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub operation: String,
    pub input: String,
}

#[derive(Clone, Default)]
struct CallLog(Arc<Mutex<Vec<MockCall>>>);

impl CallLog {
    fn record(&self, operation: &str, input: impl Into<String>) {
        self.0.lock().unwrap().push(MockCall {
            operation: operation.to_string(),
            input: input.into(),
        });
    }

    fn all(&self) -> Vec<MockCall> {
        self.0.lock().unwrap().clone()
    }

    fn count(&self, operation: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }
}

fn injected(what: &str) -> Error {
    Error::Internal(format!("injected {} failure", what))
}

// =============================================================================
// OBJECT STORAGE
// =============================================================================

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

/// In-memory object store.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
    fail_puts: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
    calls: CallLog,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` fail with a storage error.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `delete` fail with a storage error.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).map(|o| o.data.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|o| o.content_type.clone())
    }

    /// Number of `put` attempts, successful or not.
    pub fn put_count(&self) -> usize {
        self.calls.count("put")
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.all()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn put(&self, key: &str, data: &[u8], content_type: &str, upsert: bool) -> Result<()> {
        self.calls.record("put", key);
        validate_key(key)?;
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Error::Storage(format!("{}: injected put failure", key)));
        }
        let mut objects = self.objects.lock().unwrap();
        if !upsert && objects.contains_key(key) {
            return Err(Error::ObjectExists(key.to_string()));
        }
        objects.insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.calls.record("get", key);
        self.object(key)
            .ok_or_else(|| Error::NotFound(format!("Object {}", key)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.calls.record("delete", key);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::Storage(format!("{}: injected delete failure", key)));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.calls.record("exists", key);
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// =============================================================================
// NOTES
// =============================================================================

/// In-memory note repository.
#[derive(Clone, Default)]
pub struct MemoryNoteRepository {
    notes: Arc<Mutex<Vec<Note>>>,
    calls: CallLog,
}

impl MemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Note> {
        self.notes.lock().unwrap().clone()
    }

    pub fn insert_count(&self) -> usize {
        self.calls.count("insert")
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.all()
    }

    fn owned(&self, owner_id: Uuid, id: Uuid) -> bool {
        self.notes
            .lock()
            .unwrap()
            .iter()
            .any(|n| n.id == id && n.owner_id == owner_id)
    }
}

#[async_trait]
impl NoteRepository for MemoryNoteRepository {
    async fn insert(&self, owner_id: Uuid, req: CreateNoteRequest) -> Result<Note> {
        self.calls.record("insert", req.title.clone());
        validate_note_title(&req.title)?;
        let now = Utc::now();
        let note = Note {
            id: Uuid::now_v7(),
            owner_id,
            title: req.title.trim().to_string(),
            content: req.content,
            archived: false,
            created_at: now,
            updated_at: now,
        };
        self.notes.lock().unwrap().push(note.clone());
        Ok(note)
    }

    async fn fetch(&self, owner_id: Uuid, id: Uuid) -> Result<Note> {
        self.calls.record("fetch", id.to_string());
        self.notes
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.id == id && n.owner_id == owner_id)
            .cloned()
            .ok_or(Error::NoteNotFound(id))
    }

    async fn list(&self, owner_id: Uuid, req: ListNotesRequest) -> Result<Vec<Note>> {
        self.calls.record("list", owner_id.to_string());
        let (limit, offset) = page_bounds(req.limit, req.offset);
        let mut notes: Vec<Note> = self
            .notes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.owner_id == owner_id)
            .filter(|n| req.archived.map_or(true, |a| n.archived == a))
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(notes
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn update(&self, owner_id: Uuid, id: Uuid, req: UpdateNoteRequest) -> Result<Note> {
        self.calls.record("update", id.to_string());
        if let Some(title) = &req.title {
            validate_note_title(title)?;
        }
        let mut notes = self.notes.lock().unwrap();
        let note = notes
            .iter_mut()
            .find(|n| n.id == id && n.owner_id == owner_id)
            .ok_or(Error::NoteNotFound(id))?;
        if req.is_empty() {
            return Ok(note.clone());
        }
        if let Some(title) = req.title {
            note.title = title.trim().to_string();
        }
        if let Some(content) = req.content {
            note.content = content;
        }
        if let Some(archived) = req.archived {
            note.archived = archived;
        }
        note.updated_at = Utc::now();
        Ok(note.clone())
    }

    async fn exists(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        Ok(self.owned(owner_id, id))
    }
}

// =============================================================================
// ATTACHMENTS
// =============================================================================

/// In-memory attachment repository.
#[derive(Clone, Default)]
pub struct MemoryAttachmentRepository {
    rows: Arc<Mutex<Vec<Attachment>>>,
    fail_inserts: Arc<AtomicBool>,
    fail_commits: Arc<AtomicBool>,
    calls: CallLog,
}

impl MemoryAttachmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `insert` fail.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `mark_committed` fail.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// All rows, pending included.
    pub fn all(&self) -> Vec<Attachment> {
        self.rows.lock().unwrap().clone()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Shift a row's creation time, for reconciliation tests.
    pub fn backdate(&self, id: Uuid, by: Duration) {
        if let Some(row) = self.rows.lock().unwrap().iter_mut().find(|r| r.id == id) {
            row.created_at -= by;
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.all()
    }

    fn committed_where(&self, pred: impl Fn(&Attachment) -> bool) -> Vec<Attachment> {
        let mut rows: Vec<Attachment> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.status == AttachmentStatus::Committed && pred(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows
    }
}

#[async_trait]
impl AttachmentRepository for MemoryAttachmentRepository {
    async fn insert(&self, attachment: NewAttachment) -> Result<Attachment> {
        self.calls.record("insert", attachment.file_path.clone());
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(injected("insert"));
        }
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.file_path == attachment.file_path) {
            return Err(Error::Conflict(format!(
                "Attachment path {} already recorded",
                attachment.file_path
            )));
        }
        let row = attachment.into_attachment(Utc::now());
        rows.push(row.clone());
        Ok(row)
    }

    async fn mark_committed(&self, id: Uuid) -> Result<()> {
        self.calls.record("mark_committed", id.to_string());
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(injected("commit"));
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == id && r.status == AttachmentStatus::Pending)
            .ok_or(Error::AttachmentNotFound(id))?;
        row.status = AttachmentStatus::Committed;
        Ok(())
    }

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Attachment> {
        self.committed_where(|r| r.id == id && r.owner_id == owner_id)
            .into_iter()
            .next()
            .ok_or(Error::AttachmentNotFound(id))
    }

    async fn list(&self, owner_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Attachment>> {
        let (limit, offset) = page_bounds(Some(limit), Some(offset));
        Ok(self
            .committed_where(|r| r.owner_id == owner_id)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn list_by_note(&self, owner_id: Uuid, note_id: Uuid) -> Result<Vec<Attachment>> {
        let mut rows =
            self.committed_where(|r| r.owner_id == owner_id && r.note_id == Some(note_id));
        rows.reverse();
        Ok(rows)
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<Attachment> {
        self.calls.record("delete", id.to_string());
        let mut rows = self.rows.lock().unwrap();
        let index = rows
            .iter()
            .position(|r| {
                r.id == id && r.owner_id == owner_id && r.status == AttachmentStatus::Committed
            })
            .ok_or(Error::AttachmentNotFound(id))?;
        Ok(rows.remove(index))
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        self.calls.record("remove", id.to_string());
        self.rows.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }

    async fn list_stale_pending(&self, older_than: DateTime<Utc>) -> Result<Vec<Attachment>> {
        let mut rows: Vec<Attachment> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.status == AttachmentStatus::Pending && r.created_at < older_than)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.created_at);
        Ok(rows)
    }
}

// =============================================================================
// TAGS
// =============================================================================

/// In-memory tag repository. Note ownership is checked against `notes`.
#[derive(Clone)]
pub struct MemoryTagRepository {
    notes: MemoryNoteRepository,
    tags: Arc<Mutex<Vec<Tag>>>,
    links: Arc<Mutex<Vec<(Uuid, Uuid)>>>,
}

impl MemoryTagRepository {
    pub fn new(notes: MemoryNoteRepository) -> Self {
        Self {
            notes,
            tags: Arc::default(),
            links: Arc::default(),
        }
    }

    fn require_note(&self, owner_id: Uuid, note_id: Uuid) -> Result<()> {
        if self.notes.owned(owner_id, note_id) {
            Ok(())
        } else {
            Err(Error::NoteNotFound(note_id))
        }
    }
}

#[async_trait]
impl TagRepository for MemoryTagRepository {
    async fn create(&self, owner_id: Uuid, req: CreateTagRequest) -> Result<Tag> {
        validate_tag_request(&req)?;
        let name = req.name.trim().to_string();
        let mut tags = self.tags.lock().unwrap();
        if tags
            .iter()
            .any(|t| t.owner_id == owner_id && t.name.eq_ignore_ascii_case(&name))
        {
            return Err(Error::Conflict(format!("Tag '{}' already exists", name)));
        }
        let tag = Tag {
            id: Uuid::now_v7(),
            owner_id,
            name,
            color: req.color,
        };
        tags.push(tag.clone());
        Ok(tag)
    }

    async fn list(&self, owner_id: Uuid) -> Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = self
            .tags
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect();
        tags.sort_by_key(|t| t.name.to_lowercase());
        Ok(tags)
    }

    async fn add_to_note(&self, owner_id: Uuid, note_id: Uuid, tag_id: Uuid) -> Result<()> {
        self.require_note(owner_id, note_id)?;
        let owns_tag = self
            .tags
            .lock()
            .unwrap()
            .iter()
            .any(|t| t.id == tag_id && t.owner_id == owner_id);
        if !owns_tag {
            return Err(Error::NotFound(format!("Tag {} not found", tag_id)));
        }
        let mut links = self.links.lock().unwrap();
        if !links.contains(&(note_id, tag_id)) {
            links.push((note_id, tag_id));
        }
        Ok(())
    }

    async fn remove_from_note(
        &self,
        owner_id: Uuid,
        note_id: Uuid,
        tag_id: Uuid,
    ) -> Result<bool> {
        if !self.notes.owned(owner_id, note_id) {
            return Ok(false);
        }
        let mut links = self.links.lock().unwrap();
        let before = links.len();
        links.retain(|link| *link != (note_id, tag_id));
        Ok(links.len() != before)
    }

    async fn list_for_note(&self, owner_id: Uuid, note_id: Uuid) -> Result<Vec<Tag>> {
        self.require_note(owner_id, note_id)?;
        let linked: Vec<Uuid> = self
            .links
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| *n == note_id)
            .map(|(_, t)| *t)
            .collect();
        let mut tags: Vec<Tag> = self
            .tags
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.owner_id == owner_id && linked.contains(&t.id))
            .cloned()
            .collect();
        tags.sort_by_key(|t| t.name.to_lowercase());
        Ok(tags)
    }
}

// =============================================================================
// ACCOUNTS
// =============================================================================

#[derive(Clone)]
struct MemoryUser {
    id: Uuid,
    email: String,
    password_hash: String,
}

#[derive(Clone)]
struct MemorySession {
    user_id: Uuid,
    email: String,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

/// In-memory accounts and sessions, keyed like the database (token hashes).
#[derive(Clone)]
pub struct MemoryAccountRepository {
    users: Arc<Mutex<Vec<MemoryUser>>>,
    sessions: Arc<Mutex<HashMap<String, MemorySession>>>,
    session_ttl: Duration,
    calls: CallLog,
}

impl Default for MemoryAccountRepository {
    fn default() -> Self {
        Self {
            users: Arc::default(),
            sessions: Arc::default(),
            session_ttl: Duration::hours(defaults::SESSION_TTL_HOURS),
            calls: CallLog::default(),
        }
    }
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Issue a session for an identity without going through password checks.
    pub fn issue_session(&self, identity: &Identity) -> String {
        let token = generate_session_token();
        self.sessions.lock().unwrap().insert(
            hash_token(&token),
            MemorySession {
                user_id: identity.user_id,
                email: identity.email.clone(),
                expires_at: Utc::now() + self.session_ttl,
                revoked: false,
            },
        );
        token
    }

    /// Number of `resolve` calls made.
    pub fn resolve_count(&self) -> usize {
        self.calls.count("resolve")
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn sign_up(&self, credentials: &Credentials) -> Result<Identity> {
        self.calls.record("sign_up", credentials.email.clone());
        let email = validate_credentials(credentials)?;
        if self.users.lock().unwrap().iter().any(|u| u.email == email) {
            return Err(Error::Conflict(
                "An account with this email already exists".into(),
            ));
        }
        let password_hash = hash_password(&credentials.password)?;
        let user = MemoryUser {
            id: Uuid::now_v7(),
            email: email.clone(),
            password_hash,
        };
        let id = user.id;
        self.users.lock().unwrap().push(user);
        Ok(Identity { user_id: id, email })
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        self.calls.record("sign_in", credentials.email.clone());
        let email = credentials.email.trim().to_lowercase();
        let user = self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| Error::Unauthorized("Invalid email or password".into()))?;
        if !verify_password(&credentials.password, &user.password_hash) {
            return Err(Error::Unauthorized("Invalid email or password".into()));
        }
        let identity = Identity {
            user_id: user.id,
            email: user.email,
        };
        let token = self.issue_session(&identity);
        let expires_at = self.sessions.lock().unwrap()[&hash_token(&token)].expires_at;
        Ok(Session {
            token,
            user_id: identity.user_id,
            email: identity.email,
            expires_at,
        })
    }

    async fn sign_out(&self, token: &str) -> Result<bool> {
        self.calls.record("sign_out", "");
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get_mut(&hash_token(token)) {
            Some(session) if !session.revoked => {
                session.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn resolve(&self, token: &str) -> Result<Option<Identity>> {
        self.calls.record("resolve", "");
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .get(&hash_token(token))
            .filter(|s| !s.revoked && s.expires_at > Utc::now())
            .map(|s| Identity {
                user_id: s.user_id,
                email: s.email.clone(),
            }))
    }
}
