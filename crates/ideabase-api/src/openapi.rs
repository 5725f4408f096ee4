//! OpenAPI document.

use utoipa::OpenApi;

use ideabase_core::{
    Attachment, AttachmentMetadata, AttachmentStatus, CreateNoteRequest, CreateTagRequest,
    Credentials, FileType, Identity, Note, NoteTag, Session, Tag, UpdateNoteRequest,
    UploadReceipt,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "IdeaBase API",
        description = "Notes with file attachments: accounts, notes, tags and the upload gateway"
    ),
    components(schemas(
        Note,
        CreateNoteRequest,
        UpdateNoteRequest,
        FileType,
        AttachmentStatus,
        AttachmentMetadata,
        Attachment,
        UploadReceipt,
        Tag,
        CreateTagRequest,
        NoteTag,
        Identity,
        Credentials,
        Session
    )),
    tags(
        (name = "Auth", description = "Accounts and sessions"),
        (name = "Notes", description = "Note CRUD operations"),
        (name = "Uploads", description = "Attachment upload gateway"),
        (name = "Attachments", description = "Attachment metadata and content"),
        (name = "Tags", description = "Tag management"),
        (name = "System", description = "Health checks and API description")
    )
)]
pub struct ApiDoc;
