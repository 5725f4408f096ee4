//! HTTP client for the IdeaBase API.

use std::time::{Duration, Instant};

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use ideabase_core::defaults::{self, MAX_FILE_SIZE};
use ideabase_core::{
    encode_data_url, CreateNoteRequest, Credentials, Identity, Session, Transport, UploadReceipt,
};

use crate::{ClientError, FileCandidate, StoredSession};

/// Error body shared by every API failure.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedNote {
    id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonUploadBody<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    declared_type: &'a str,
    size: u64,
    user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    note_id: Option<Uuid>,
    content: String,
}

/// Thin async client. One request per call, no retries.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    session: Option<StoredSession>,
    max_file_size: u64,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(defaults::CLIENT_TIMEOUT_SECS))
            .user_agent(concat!("ideabase-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            session: None,
            max_file_size: MAX_FILE_SIZE,
        })
    }

    pub fn with_session(mut self, session: Option<StoredSession>) -> Self {
        self.session = session;
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn session(&self) -> Option<&StoredSession> {
        self.session.as_ref()
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn require_session(&self) -> Result<&StoredSession, ClientError> {
        self.session.as_ref().ok_or(ClientError::SignInRequired)
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let session = self.require_session()?;
        Ok(builder.bearer_auth(&session.token))
    }

    pub async fn sign_up(&self, credentials: &Credentials) -> Result<Session, ClientError> {
        let response = self
            .http
            .post(self.url("/auth/signup"))
            .json(credentials)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session, ClientError> {
        let response = self
            .http
            .post(self.url("/auth/signin"))
            .json(credentials)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn sign_out(&self) -> Result<(), ClientError> {
        let request = self.authorized(self.http.post(self.url("/auth/signout")))?;
        check(request.send().await?).await?;
        Ok(())
    }

    /// Identity the server resolves for the stored token.
    pub async fn current_session(&self) -> Result<Identity, ClientError> {
        let request = self.authorized(self.http.get(self.url("/auth/session")))?;
        Ok(check(request.send().await?).await?.json().await?)
    }

    /// Create a note and return its id.
    pub async fn create_note(&self, req: &CreateNoteRequest) -> Result<Uuid, ClientError> {
        let request = self.authorized(self.http.post(self.url("/notes")))?;
        let created: CreatedNote = check(request.json(req).send().await?)
            .await?
            .json()
            .await?;
        info!(
            subsystem = "client",
            component = "api_client",
            op = "create_note",
            note_id = %created.id,
            "Note created"
        );
        Ok(created.id)
    }

    /// Upload one file.
    ///
    /// The session and the allow-list/size checks run first; a rejected
    /// file is never read and never produces a request.
    pub async fn upload(
        &self,
        file: &FileCandidate,
        transport: Transport,
        note_id: Option<Uuid>,
    ) -> Result<UploadReceipt, ClientError> {
        let start = Instant::now();
        let session = self.require_session()?;
        if let Err(e) = file.validate(self.max_file_size) {
            warn!(
                subsystem = "client",
                component = "api_client",
                op = "upload",
                file_name = %file.name,
                error = %e,
                "File rejected before upload"
            );
            return Err(e.into());
        }

        let bytes = file.read().await?;
        debug!(
            subsystem = "client",
            component = "api_client",
            op = "upload",
            transport = ?transport,
            size = bytes.len(),
            "Sending file"
        );

        let request = self.http.post(self.url("/uploads")).bearer_auth(&session.token);
        let request = match transport {
            Transport::Multipart => {
                let part = Part::bytes(bytes)
                    .file_name(file.name.clone())
                    .mime_str(&file.declared_type)?;
                let mut form = Form::new()
                    .text("userId", session.user_id.to_string())
                    .part("file", part);
                if let Some(note_id) = note_id {
                    form = form.text("noteId", note_id.to_string());
                }
                request.multipart(form)
            }
            Transport::Json => request.json(&JsonUploadBody {
                name: &file.name,
                declared_type: &file.declared_type,
                size: file.size,
                user_id: session.user_id,
                note_id,
                content: encode_data_url(&file.declared_type, &bytes),
            }),
        };

        let receipt: UploadReceipt = check(request.send().await?).await?.json().await?;
        info!(
            subsystem = "client",
            component = "api_client",
            op = "upload",
            file_path = %receipt.file_path,
            duration_ms = start.elapsed().as_millis() as u64,
            "File uploaded"
        );
        Ok(receipt)
    }
}

/// Turn a non-2xx response into [`ClientError::Api`].
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let (message, details) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.error, body.details),
        Err(_) => (
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
            (!text.is_empty()).then_some(text),
        ),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
        details,
    })
}
