//! Shared harness: the real router wired to in-memory repositories.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use ideabase_api::{build_router, AllowedOrigins, AppState, GatewayConfig};
use ideabase_core::Identity;
use ideabase_db::mock::{
    MemoryAccountRepository, MemoryAttachmentRepository, MemoryBackend, MemoryNoteRepository,
    MemoryTagRepository,
};

pub const ORIGIN: &str = "http://localhost:3000";
pub const BOUNDARY: &str = "ideabase-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub notes: MemoryNoteRepository,
    pub attachments: MemoryAttachmentRepository,
    pub tags: MemoryTagRepository,
    pub accounts: MemoryAccountRepository,
    pub storage: MemoryBackend,
    pub identity: Identity,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(GatewayConfig::default())
    }

    pub fn with_config(config: GatewayConfig) -> Self {
        Self::build(config, AllowedOrigins::List(vec![HeaderValue::from_static(ORIGIN)]))
    }

    pub fn build(config: GatewayConfig, origins: AllowedOrigins) -> Self {
        let notes = MemoryNoteRepository::new();
        let attachments = MemoryAttachmentRepository::new();
        let tags = MemoryTagRepository::new(notes.clone());
        let accounts = MemoryAccountRepository::new();
        let storage = MemoryBackend::new();

        let state = AppState::new(
            Arc::new(notes.clone()),
            Arc::new(attachments.clone()),
            Arc::new(tags.clone()),
            Arc::new(accounts.clone()),
            Arc::new(storage.clone()),
            config,
        );
        let router = build_router(state, &origins);

        let identity = Identity {
            user_id: Uuid::new_v4(),
            email: "u1@example.test".to_string(),
        };
        let token = accounts.issue_session(&identity);

        Self {
            router,
            notes,
            attachments,
            tags,
            accounts,
            storage,
            identity,
            token,
        }
    }

    /// A second signed-in user.
    pub fn other_user(&self) -> (Identity, String) {
        let identity = Identity {
            user_id: Uuid::new_v4(),
            email: "u2@example.test".to_string(),
        };
        let token = self.accounts.issue_session(&identity);
        (identity, token)
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub async fn send(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Send a request and decode the JSON body (`Null` when empty).
    pub async fn call(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.send(req).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub fn get(&self, uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, self.bearer())
            .body(Body::empty())
            .unwrap()
    }

    pub fn delete(&self, uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .header(header::AUTHORIZATION, self.bearer())
            .body(Body::empty())
            .unwrap()
    }

    pub fn json(&self, method: Method, uri: &str, body: Value) -> Request<Body> {
        json_request(method, uri, Some(&self.bearer()), body)
    }

    pub fn multipart(&self, parts: &[Part]) -> Request<Body> {
        multipart_request(Some(&self.bearer()), parts)
    }

    /// Create a note through the API and return its id.
    pub async fn create_note(&self, title: &str) -> Uuid {
        let (status, body) = self
            .call(self.json(
                Method::POST,
                "/api/v1/notes",
                serde_json::json!({ "title": title, "content": "<p>body</p>" }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().parse().unwrap()
    }
}

pub fn json_request(
    method: Method,
    uri: &str,
    authorization: Option<&str>,
    body: Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// One multipart form field.
pub enum Part {
    File {
        name: String,
        content_type: String,
        data: Vec<u8>,
    },
    Text {
        field: String,
        value: String,
    },
}

impl Part {
    pub fn file(name: &str, content_type: &str, data: Vec<u8>) -> Self {
        Part::File {
            name: name.to_string(),
            content_type: content_type.to_string(),
            data,
        }
    }

    pub fn text(field: &str, value: impl ToString) -> Self {
        Part::Text {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text { field, value } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                        field, value
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(authorization: Option<&str>, parts: &[Part]) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/uploads")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

/// Set `Content-Length` the way an HTTP client would.
pub fn with_content_length(mut req: Request<Body>, len: usize) -> Request<Body> {
    req.headers_mut()
        .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    req
}

/// Bytes that start like a PDF.
pub fn pdf_bytes(len: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.7\n".to_vec();
    bytes.resize(len, b' ');
    bytes
}
