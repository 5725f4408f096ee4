//! Upload gateway: the server side of the attachment pathway.
//!
//! Every transport is converted into one [`UploadRequest`] before it reaches
//! [`UploadGateway::upload`], which then:
//! 1. Binds the owner to the session identity
//! 2. Re-checks the size ceiling and the type allow-list
//! 3. Decodes the payload and optionally sniffs its magic bytes
//! 4. Derives a fresh `{ownerId}/{uuid}.{ext}` storage key
//! 5. Writes the object and the metadata row according to [`CommitProtocol`]

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use ideabase_core::validation::{check_size, normalize_mime};
use ideabase_core::{
    decode_payload, defaults, sanitize_filename, sniff_content, storage_key, stored_file_name,
    validate_file_with_limit, Attachment, AttachmentMetadata, AttachmentRepository,
    AttachmentStatus, FileDescriptor, Identity, NewAttachment, UploadBody, UploadReceipt,
    UploadRequest, ValidationError,
};
use ideabase_db::StorageBackend;

/// How the object write and the metadata insert are sequenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitProtocol {
    /// Object first, then a committed row. A failed insert orphans the object.
    #[default]
    BestEffort,
    /// Pending row, then object, then commit. A failed object write removes
    /// the pending row; a failed commit leaves it for [`UploadGateway::reconcile_pending`].
    TwoPhase,
}

impl CommitProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitProtocol::BestEffort => "best_effort",
            CommitProtocol::TwoPhase => "two_phase",
        }
    }
}

impl FromStr for CommitProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "best_effort" => Ok(CommitProtocol::BestEffort),
            "two_phase" => Ok(CommitProtocol::TwoPhase),
            other => Err(format!(
                "Unknown commit protocol '{}' (expected best_effort or two_phase)",
                other
            )),
        }
    }
}

/// Explicit gateway configuration. Built from the environment only in `main`.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub max_file_size: u64,
    /// Sniff magic bytes and reject payloads that are not what they claim.
    pub verify_content: bool,
    pub commit_protocol: CommitProtocol,
    pub bucket: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_file_size: defaults::MAX_FILE_SIZE,
            verify_content: false,
            commit_protocol: CommitProtocol::default(),
            bucket: defaults::STORAGE_BUCKET.to_string(),
        }
    }
}

/// Why an upload failed. Display strings are the user-facing `error` field.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Forbidden(String),

    #[error("Failed to upload file to storage")]
    StorageWrite { details: String },

    #[error("Failed to save file metadata")]
    MetadataWrite { file_path: String, details: String },

    #[error("An unexpected error occurred")]
    Unexpected { details: String },
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::Validation(_) => StatusCode::BAD_REQUEST,
            UploadError::Forbidden(_) => StatusCode::FORBIDDEN,
            UploadError::StorageWrite { .. }
            | UploadError::MetadataWrite { .. }
            | UploadError::Unexpected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            UploadError::StorageWrite { details }
            | UploadError::MetadataWrite { details, .. }
            | UploadError::Unexpected { details } => Some(details),
            UploadError::Validation(_) | UploadError::Forbidden(_) => None,
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self.details() {
            Some(details) => serde_json::json!({
                "error": self.to_string(),
                "details": details,
            }),
            None => serde_json::json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Outcome of a reconciliation pass over abandoned pending uploads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Stale pending rows found.
    pub examined: usize,
    /// Rows (and their objects) removed.
    pub removed: usize,
}

pub struct UploadGateway {
    config: GatewayConfig,
    storage: Arc<dyn StorageBackend>,
    attachments: Arc<dyn AttachmentRepository>,
}

impl UploadGateway {
    pub fn new(
        config: GatewayConfig,
        storage: Arc<dyn StorageBackend>,
        attachments: Arc<dyn AttachmentRepository>,
    ) -> Self {
        Self {
            config,
            storage,
            attachments,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Validate, store and record one upload for the session identity.
    pub async fn upload(
        &self,
        identity: &Identity,
        req: UploadRequest,
    ) -> Result<UploadReceipt, UploadError> {
        let start = Instant::now();
        let owner_id = identity.user_id;

        if let Some(claimed) = req.owner_id {
            if claimed != owner_id {
                warn!(
                    subsystem = "api",
                    component = "upload_gateway",
                    op = "upload",
                    owner_id = %owner_id,
                    claimed_owner = %claimed,
                    "Upload owner does not match session"
                );
                return Err(UploadError::Forbidden(
                    "userId does not match the signed-in user".to_string(),
                ));
            }
        }

        if req.file_name.trim().is_empty() {
            return Err(ValidationError::MissingFile.into());
        }

        let max = self.config.max_file_size;
        check_size(req.declared_size, max)?;
        let kind = validate_file_with_limit(
            &FileDescriptor::new(&req.file_name, &req.declared_type, req.declared_size),
            max,
        )?;

        let bytes = match req.body {
            UploadBody::Raw(bytes) => bytes,
            UploadBody::Base64(text) => tokio::task::spawn_blocking(move || decode_payload(&text))
                .await
                .map_err(|e| UploadError::Unexpected {
                    details: e.to_string(),
                })??,
        };

        let actual = bytes.len() as u64;
        check_size(actual, max)?;
        if actual != req.declared_size {
            return Err(ValidationError::SizeMismatch {
                declared: req.declared_size,
                actual,
            }
            .into());
        }

        if self.config.verify_content {
            sniff_content(kind, &req.declared_type, &bytes)?;
        }

        let file_path = storage_key(owner_id, &req.file_name);
        let new = NewAttachment {
            id: Uuid::now_v7(),
            owner_id,
            note_id: req.note_id,
            file_name: stored_file_name(&file_path).to_string(),
            file_path: file_path.clone(),
            file_size: actual as i64,
            file_type: kind,
            metadata: AttachmentMetadata {
                original_name: sanitize_filename(&req.file_name),
                uploaded_by: owner_id,
                uploaded_at: Utc::now(),
            },
            status: AttachmentStatus::Committed,
        };
        let content_type = normalize_mime(&req.declared_type);

        debug!(
            subsystem = "api",
            component = "upload_gateway",
            op = "upload",
            owner_id = %owner_id,
            file_path = %file_path,
            file_type = kind.as_str(),
            size_bytes = actual,
            protocol = self.config.commit_protocol.as_str(),
            "Upload validated"
        );

        let attachment = match self.config.commit_protocol {
            CommitProtocol::BestEffort => {
                self.commit_best_effort(new, &bytes, &content_type).await?
            }
            CommitProtocol::TwoPhase => self.commit_two_phase(new, &bytes, &content_type).await?,
        };

        info!(
            subsystem = "api",
            component = "upload_gateway",
            op = "upload",
            owner_id = %owner_id,
            attachment_id = %attachment.id,
            file_path = %attachment.file_path,
            size_bytes = actual,
            duration_ms = start.elapsed().as_millis() as u64,
            "Upload complete"
        );

        Ok(UploadReceipt {
            message: defaults::UPLOAD_SUCCESS_MESSAGE.to_string(),
            file_path: attachment.file_path,
            file_name: attachment.file_name,
            attachment_id: attachment.id,
        })
    }

    async fn put_object(
        &self,
        file_path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), UploadError> {
        self.storage
            .put(file_path, bytes, content_type, false)
            .await
            .map_err(|e| {
                warn!(
                    subsystem = "api",
                    component = "upload_gateway",
                    op = "put_object",
                    backend = self.storage.name(),
                    bucket = %self.config.bucket,
                    file_path = %file_path,
                    error = %e,
                    "Storage write failed"
                );
                UploadError::StorageWrite {
                    details: e.to_string(),
                }
            })
    }

    async fn commit_best_effort(
        &self,
        new: NewAttachment,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<Attachment, UploadError> {
        let file_path = new.file_path.clone();
        self.put_object(&file_path, bytes, content_type).await?;

        self.attachments.insert(new).await.map_err(|e| {
            error!(
                subsystem = "api",
                component = "upload_gateway",
                op = "insert_metadata",
                file_path = %file_path,
                error = %e,
                "Metadata insert failed; storage object is orphaned"
            );
            UploadError::MetadataWrite {
                file_path: file_path.clone(),
                details: e.to_string(),
            }
        })
    }

    async fn commit_two_phase(
        &self,
        new: NewAttachment,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<Attachment, UploadError> {
        let file_path = new.file_path.clone();
        let pending = NewAttachment {
            status: AttachmentStatus::Pending,
            ..new
        };

        let row = self.attachments.insert(pending).await.map_err(|e| {
            warn!(
                subsystem = "api",
                component = "upload_gateway",
                op = "insert_pending",
                file_path = %file_path,
                error = %e,
                "Pending metadata insert failed"
            );
            UploadError::MetadataWrite {
                file_path: file_path.clone(),
                details: e.to_string(),
            }
        })?;

        if let Err(err) = self.put_object(&file_path, bytes, content_type).await {
            if let Err(e) = self.attachments.remove(row.id).await {
                error!(
                    subsystem = "api",
                    component = "upload_gateway",
                    op = "remove_pending",
                    attachment_id = %row.id,
                    error = %e,
                    "Could not remove pending row after storage failure"
                );
            }
            return Err(err);
        }

        if let Err(e) = self.attachments.mark_committed(row.id).await {
            error!(
                subsystem = "api",
                component = "upload_gateway",
                op = "mark_committed",
                attachment_id = %row.id,
                file_path = %file_path,
                error = %e,
                "Commit failed; pending row left for reconciliation"
            );
            return Err(UploadError::MetadataWrite {
                file_path,
                details: e.to_string(),
            });
        }

        Ok(Attachment {
            status: AttachmentStatus::Committed,
            ..row
        })
    }

    /// Remove pending rows created before `older_than`, object first.
    ///
    /// A row whose object cannot be deleted is kept for the next pass.
    pub async fn reconcile_pending(
        &self,
        older_than: DateTime<Utc>,
    ) -> ideabase_core::Result<ReconcileReport> {
        let stale = self.attachments.list_stale_pending(older_than).await?;
        let mut report = ReconcileReport {
            examined: stale.len(),
            removed: 0,
        };

        for row in stale {
            if let Err(e) = self.storage.delete(&row.file_path).await {
                warn!(
                    subsystem = "api",
                    component = "upload_gateway",
                    op = "reconcile_pending",
                    attachment_id = %row.id,
                    file_path = %row.file_path,
                    error = %e,
                    "Could not delete object of stale pending upload"
                );
                continue;
            }
            self.attachments.remove(row.id).await?;
            report.removed += 1;
        }

        info!(
            subsystem = "api",
            component = "upload_gateway",
            op = "reconcile_pending",
            result_count = report.removed,
            examined = report.examined,
            "Pending uploads reconciled"
        );
        Ok(report)
    }
}
