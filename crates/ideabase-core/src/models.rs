//! Domain models for notes, attachments, tags, and sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::{file_extension, normalize_mime};

// =============================================================================
// NOTES
// =============================================================================

/// A note owned by exactly one user.
///
/// `content` is the editor's rich text serialized as markup. The owner never
/// changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Note {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub content: String,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a note. The owner comes from the session, not the body.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateNoteRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Partial update of a note. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub archived: Option<bool>,
}

impl UpdateNoteRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.archived.is_none()
    }
}

/// Filter for listing a user's notes.
#[derive(Debug, Clone, Default)]
pub struct ListNotesRequest {
    /// `None` returns archived and active notes.
    pub archived: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// =============================================================================
// ATTACHMENTS
// =============================================================================

/// Supported attachment formats. Serialized exactly as the database enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileType {
    Json,
    Txt,
    Rtf,
    Pdf,
    M4a,
    Docx,
    Xls,
    Csv,
    Xlsx,
    Png,
    Jpg,
    Jpeg,
    Html,
}

impl FileType {
    pub const ALL: [FileType; 13] = [
        FileType::Json,
        FileType::Txt,
        FileType::Rtf,
        FileType::Pdf,
        FileType::M4a,
        FileType::Docx,
        FileType::Xls,
        FileType::Csv,
        FileType::Xlsx,
        FileType::Png,
        FileType::Jpg,
        FileType::Jpeg,
        FileType::Html,
    ];

    /// Database / wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Json => "JSON",
            FileType::Txt => "TXT",
            FileType::Rtf => "RTF",
            FileType::Pdf => "PDF",
            FileType::M4a => "M4A",
            FileType::Docx => "DOCX",
            FileType::Xls => "XLS",
            FileType::Csv => "CSV",
            FileType::Xlsx => "XLSX",
            FileType::Png => "PNG",
            FileType::Jpg => "JPG",
            FileType::Jpeg => "JPEG",
            FileType::Html => "HTML",
        }
    }

    /// Kind for an allow-listed MIME type.
    ///
    /// JPEG images keep the spelling of their extension (`.jpeg` vs `.jpg`).
    pub fn from_declared(mime: &str, file_name: &str) -> Option<FileType> {
        let kind = match normalize_mime(mime).as_str() {
            "application/json" => FileType::Json,
            "text/plain" => FileType::Txt,
            "application/rtf" | "text/rtf" => FileType::Rtf,
            "application/pdf" => FileType::Pdf,
            "audio/mp4" | "audio/x-m4a" | "audio/m4a" => FileType::M4a,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                FileType::Docx
            }
            "application/vnd.ms-excel" => FileType::Xls,
            "text/csv" => FileType::Csv,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => FileType::Xlsx,
            "image/png" => FileType::Png,
            "image/jpeg" => match file_extension(file_name).as_deref() {
                Some("jpeg") => FileType::Jpeg,
                _ => FileType::Jpg,
            },
            "text/html" => FileType::Html,
            _ => return None,
        };
        Some(kind)
    }

    /// Kind for an accepted client extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<FileType> {
        let kind = match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "json" => FileType::Json,
            "txt" => FileType::Txt,
            "rtf" => FileType::Rtf,
            "pdf" => FileType::Pdf,
            "m4a" => FileType::M4a,
            "docx" => FileType::Docx,
            "xls" => FileType::Xls,
            "csv" => FileType::Csv,
            "xlsx" => FileType::Xlsx,
            "png" => FileType::Png,
            "jpg" => FileType::Jpg,
            "jpeg" => FileType::Jpeg,
            "html" => FileType::Html,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical MIME type used when serving stored bytes.
    pub fn mime_type(&self) -> &'static str {
        match self {
            FileType::Json => "application/json",
            FileType::Txt => "text/plain",
            FileType::Rtf => "application/rtf",
            FileType::Pdf => "application/pdf",
            FileType::M4a => "audio/mp4",
            FileType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FileType::Xls => "application/vnd.ms-excel",
            FileType::Csv => "text/csv",
            FileType::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            FileType::Png => "image/png",
            FileType::Jpg | FileType::Jpeg => "image/jpeg",
            FileType::Html => "text/html",
        }
    }

    /// Formats with no magic bytes; sniffing cannot confirm them.
    pub fn is_text_like(&self) -> bool {
        matches!(
            self,
            FileType::Json | FileType::Txt | FileType::Rtf | FileType::Csv | FileType::Html
        )
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FileType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        FileType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Invalid file type: {}", s))
    }
}

/// Lifecycle of a metadata row.
///
/// Rows written by the best-effort protocol are born `Committed`. The
/// two-phase protocol inserts `Pending` before the object write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentStatus {
    Pending,
    #[default]
    Committed,
}

impl std::fmt::Display for AttachmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Committed => write!(f, "committed"),
        }
    }
}

impl std::str::FromStr for AttachmentStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "committed" => Ok(Self::Committed),
            _ => Err(format!("Invalid attachment status: {}", s)),
        }
    }
}

/// Audit blob stored alongside each attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentMetadata {
    pub original_name: String,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
}

/// Metadata row describing one stored object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Attachment {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Optional back-reference to a note.
    pub note_id: Option<Uuid>,
    /// Stored file name (`{uuid}.{ext}`), the last segment of `file_path`.
    pub file_name: String,
    /// Storage key: `{ownerId}/{uuid}.{ext}`.
    pub file_path: String,
    pub file_size: i64,
    pub file_type: FileType,
    pub metadata: AttachmentMetadata,
    pub status: AttachmentStatus,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to insert a metadata row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttachment {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub note_id: Option<Uuid>,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub file_type: FileType,
    pub metadata: AttachmentMetadata,
    pub status: AttachmentStatus,
}

impl NewAttachment {
    pub fn into_attachment(self, created_at: DateTime<Utc>) -> Attachment {
        Attachment {
            id: self.id,
            owner_id: self.owner_id,
            note_id: self.note_id,
            file_name: self.file_name,
            file_path: self.file_path,
            file_size: self.file_size,
            file_type: self.file_type,
            metadata: self.metadata,
            status: self.status,
            created_at,
        }
    }
}

/// Bytes of an upload as they arrived.
#[derive(Clone, PartialEq, Eq)]
pub enum UploadBody {
    /// Multipart transport: raw file bytes.
    Raw(Vec<u8>),
    /// JSON transport: base64 or data-URL text.
    Base64(String),
}

impl std::fmt::Debug for UploadBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadBody::Raw(bytes) => write!(f, "Raw({} bytes)", bytes.len()),
            UploadBody::Base64(text) => write!(f, "Base64({} chars)", text.len()),
        }
    }
}

/// The one upload contract every transport is converted into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub declared_type: String,
    pub declared_size: u64,
    /// Owner claimed by the client; must match the session if present.
    pub owner_id: Option<Uuid>,
    pub note_id: Option<Uuid>,
    pub body: UploadBody,
}

/// Successful upload response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub message: String,
    pub file_path: String,
    pub file_name: String,
    pub attachment_id: Uuid,
}

// =============================================================================
// TAGS
// =============================================================================

/// A user-defined label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Tag {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateTagRequest {
    pub name: String,
    pub color: Option<String>,
}

/// Many-to-many link between a note and a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NoteTag {
    pub note_id: Uuid,
    pub tag_id: Uuid,
}

// =============================================================================
// ACCOUNTS
// =============================================================================

/// The resolved owner identity of an active session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
}

/// Email + password credentials.
#[derive(Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A freshly issued session. The token is only ever shown once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            email: self.email.clone(),
        }
    }
}
