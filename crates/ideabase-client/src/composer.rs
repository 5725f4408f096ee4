//! Note-creation screen state.
//!
//! Saving and uploading are two independent linear flows:
//!
//! ```text
//! SaveState:   Idle -> Saving    -> Saved(id)          | Failed(msg)
//! UploadState: Idle -> Uploading -> Uploaded(receipt)  | Failed(msg)
//! ```
//!
//! Every action ends in a [`Notice`] for the user. Nothing is retried.

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use ideabase_core::{
    validate_note_title, CreateNoteRequest, Transport, UploadReceipt,
};

use crate::{ApiClient, ClientError, FileCandidate, SessionGuard};

/// The remote calls the composer makes. [`ApiClient`] is the real one.
#[async_trait]
pub trait NoteService: Send + Sync {
    async fn create_note(&self, req: &CreateNoteRequest) -> Result<Uuid, ClientError>;

    async fn upload(
        &self,
        file: &FileCandidate,
        transport: Transport,
        note_id: Option<Uuid>,
    ) -> Result<UploadReceipt, ClientError>;

    /// Size ceiling checked before anything is read or sent.
    fn max_file_size(&self) -> u64;
}

#[async_trait]
impl NoteService for ApiClient {
    async fn create_note(&self, req: &CreateNoteRequest) -> Result<Uuid, ClientError> {
        ApiClient::create_note(self, req).await
    }

    async fn upload(
        &self,
        file: &FileCandidate,
        transport: Transport,
        note_id: Option<Uuid>,
    ) -> Result<UploadReceipt, ClientError> {
        ApiClient::upload(self, file, transport, note_id).await
    }

    fn max_file_size(&self) -> u64 {
        ApiClient::max_file_size(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveState {
    #[default]
    Idle,
    Saving,
    Saved(Uuid),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Uploading,
    Uploaded(UploadReceipt),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

pub const NOTE_SAVED: &str = "Note saved successfully!";

pub struct NoteComposer<S> {
    service: S,
    guard: SessionGuard,
    transport: Transport,
    pub title: String,
    pub content: String,
    save_state: SaveState,
    upload_state: UploadState,
}

impl<S: NoteService> NoteComposer<S> {
    pub fn new(service: S, guard: SessionGuard) -> Self {
        Self {
            service,
            guard,
            transport: Transport::default(),
            title: String::new(),
            content: String::new(),
            save_state: SaveState::Idle,
            upload_state: UploadState::Idle,
        }
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn save_state(&self) -> &SaveState {
        &self.save_state
    }

    pub fn upload_state(&self) -> &UploadState {
        &self.upload_state
    }

    /// Id of the saved note, once there is one.
    pub fn note_id(&self) -> Option<Uuid> {
        match self.save_state {
            SaveState::Saved(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.save_state, SaveState::Saving)
            || matches!(self.upload_state, UploadState::Uploading)
    }

    /// Save the note. Requires a session and a non-blank title before any
    /// call is made.
    pub async fn save(&mut self) -> Notice {
        if let Err(e) = self.guard.require() {
            return self.save_failed(e);
        }
        if let Err(e) = validate_note_title(&self.title) {
            return self.save_failed(e.into());
        }

        self.save_state = SaveState::Saving;
        let req = CreateNoteRequest {
            title: self.title.trim().to_string(),
            content: self.content.clone(),
        };
        match self.service.create_note(&req).await {
            Ok(id) => {
                self.save_state = SaveState::Saved(id);
                Notice::success(NOTE_SAVED)
            }
            Err(e) => self.save_failed(e),
        }
    }

    /// Upload a file, linked to the note when it has been saved.
    pub async fn attach(&mut self, file: &FileCandidate) -> Notice {
        if let Err(e) = self.guard.require() {
            return self.upload_failed(e);
        }
        if let Err(e) = file.validate(self.service.max_file_size()) {
            return self.upload_failed(e.into());
        }

        self.upload_state = UploadState::Uploading;
        match self
            .service
            .upload(file, self.transport, self.note_id())
            .await
        {
            Ok(receipt) => {
                let notice = Notice::success(receipt.message.clone());
                self.upload_state = UploadState::Uploaded(receipt);
                notice
            }
            Err(e) => self.upload_failed(e),
        }
    }

    fn save_failed(&mut self, error: ClientError) -> Notice {
        log_failure("save", &error);
        let message = error.to_string();
        self.save_state = SaveState::Failed(message.clone());
        Notice::error(message)
    }

    fn upload_failed(&mut self, error: ClientError) -> Notice {
        log_failure("upload", &error);
        let message = error.to_string();
        self.upload_state = UploadState::Failed(message.clone());
        Notice::error(message)
    }
}

fn log_failure(op: &str, error: &ClientError) {
    warn!(
        subsystem = "client",
        component = "note_composer",
        op,
        local = error.is_local(),
        status = ?error.status(),
        error = %error,
        "Action failed"
    );
}
