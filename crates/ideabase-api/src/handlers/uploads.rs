//! Upload endpoint.
//!
//! Both transports arrive here and are converted into one [`UploadRequest`]
//! by the [`UploadForm`] extractor, chosen by `Content-Type`:
//! - `multipart/form-data`: fields `file`, optional `userId` and `noteId`
//! - `application/json`: `{name, type, size, userId?, noteId?, content}` with
//!   `content` as a data URL or bare base64

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use tracing::{debug, trace};
use uuid::Uuid;

use ideabase_core::validation::normalize_mime;
use ideabase_core::{mime_for_extension, UploadBody, UploadReceipt, UploadRequest, ValidationError};

use crate::services::UploadError;
use crate::{body_limit, ApiError, AppState, RequireSession};

/// JSON transport body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonUpload {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: String,
    pub size: u64,
    pub user_id: Option<Uuid>,
    pub note_id: Option<Uuid>,
    pub content: String,
}

impl From<JsonUpload> for UploadRequest {
    fn from(body: JsonUpload) -> Self {
        UploadRequest {
            file_name: body.name,
            declared_type: body.declared_type,
            declared_size: body.size,
            owner_id: body.user_id,
            note_id: body.note_id,
            body: UploadBody::Base64(body.content),
        }
    }
}

/// An upload in either transport, normalised.
pub struct UploadForm(pub UploadRequest);

#[axum::async_trait]
impl FromRequest<AppState> for UploadForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let max = state.gateway.config().max_file_size;
        if let Some(length) = content_length(req.headers()) {
            if length > body_limit(max) as u64 {
                return Err(too_large(length, max));
            }
        }

        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(normalize_mime)
            .unwrap_or_default();

        match content_type.as_str() {
            "multipart/form-data" => {
                let multipart = Multipart::from_request(req, state).await?;
                read_multipart(multipart, max).await.map(UploadForm)
            }
            "application/json" => match Json::<JsonUpload>::from_request(req, state).await {
                Ok(Json(body)) => Ok(UploadForm(body.into())),
                Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                    Err(too_large(body_limit(max) as u64 + 1, max))
                }
                Err(rejection) => Err(ApiError::from(rejection)),
            },
            other => Err(ApiError::BadRequest(format!(
                "Unsupported upload content type '{}': expected multipart/form-data or application/json",
                other
            ))),
        }
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn too_large(size: u64, max: u64) -> ApiError {
    debug!(
        subsystem = "api",
        component = "uploads",
        size_bytes = size,
        max_bytes = max,
        "Upload body exceeded size ceiling"
    );
    UploadError::from(ValidationError::TooLarge { size, max }).into()
}

/// Body-limit overflow while streaming maps to the size error.
fn multipart_error(e: MultipartError, max: u64) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return too_large(body_limit(max) as u64 + 1, max);
    }
    ApiError::BadRequest(e.body_text())
}

fn parse_id(field: &str, value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| ApiError::BadRequest(format!("Invalid {}: {}", field, value.trim())))
}

/// Read the file field chunk by chunk, giving up as soon as it passes `max`.
async fn read_file_field(field: &mut Field<'_>, max: u64) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, max))? {
        let size = (bytes.len() + chunk.len()) as u64;
        if size > max {
            return Err(too_large(size, max));
        }
        trace!(chunk_bytes = chunk.len(), "Multipart chunk");
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn read_multipart(mut multipart: Multipart, max: u64) -> Result<UploadRequest, ApiError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut owner_id = None;
    let mut note_id = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let declared_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| mime_for_extension(&file_name).to_string());
                let bytes = read_file_field(&mut field, max).await?;
                file = Some((file_name, declared_type, bytes));
            }
            "userId" => {
                let value = field.text().await.map_err(|e| multipart_error(e, max))?;
                owner_id = Some(parse_id("userId", &value)?);
            }
            "noteId" => {
                let value = field.text().await.map_err(|e| multipart_error(e, max))?;
                if !value.trim().is_empty() {
                    note_id = Some(parse_id("noteId", &value)?);
                }
            }
            _ => {}
        }
    }

    let (file_name, declared_type, bytes) =
        file.ok_or_else(|| ApiError::from(UploadError::from(ValidationError::MissingFile)))?;

    Ok(UploadRequest {
        file_name,
        declared_type,
        declared_size: bytes.len() as u64,
        owner_id,
        note_id,
        body: UploadBody::Raw(bytes),
    })
}

/// Upload Gateway entry point. The session is resolved before the body is read.
pub async fn upload(
    State(state): State<AppState>,
    session: RequireSession,
    UploadForm(request): UploadForm,
) -> Result<Json<UploadReceipt>, ApiError> {
    if let Some(note_id) = request.note_id {
        if !state.notes.exists(session.identity.user_id, note_id).await? {
            return Err(ApiError::NotFound("Note not found".to_string()));
        }
    }

    let receipt = state.gateway.upload(&session.identity, request).await?;
    Ok(Json(receipt))
}
