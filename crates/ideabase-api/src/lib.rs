//! # ideabase-api
//!
//! HTTP API for IdeaBase: accounts and sessions, notes, tags, and the
//! attachment upload gateway.
//!
//! The binary in `main.rs` wires PostgreSQL repositories and a storage
//! backend into [`AppState`]; tests wire the in-memory mocks instead.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use ideabase_core::{
    defaults, encoded_len, AccountRepository, AttachmentRepository, NoteRepository, TagRepository,
};
use ideabase_db::{Database, StorageBackend};

pub use auth::RequireSession;
pub use config::{parse_allowed_origins, AllowedOrigins, ServerConfig, StorageSettings};
pub use error::ApiError;
pub use services::{CommitProtocol, GatewayConfig, UploadError, UploadGateway};

/// Room for multipart boundaries and the JSON envelope around a payload.
const BODY_LIMIT_SLACK: u64 = 64 * 1024;

/// Shared handler state. Every repository is a trait object so the router
/// runs unchanged against PostgreSQL or the in-memory mocks.
#[derive(Clone)]
pub struct AppState {
    pub notes: Arc<dyn NoteRepository>,
    pub attachments: Arc<dyn AttachmentRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub storage: Arc<dyn StorageBackend>,
    pub gateway: Arc<UploadGateway>,
}

impl AppState {
    pub fn new(
        notes: Arc<dyn NoteRepository>,
        attachments: Arc<dyn AttachmentRepository>,
        tags: Arc<dyn TagRepository>,
        accounts: Arc<dyn AccountRepository>,
        storage: Arc<dyn StorageBackend>,
        gateway_config: GatewayConfig,
    ) -> Self {
        let gateway = Arc::new(UploadGateway::new(
            gateway_config,
            storage.clone(),
            attachments.clone(),
        ));
        Self {
            notes,
            attachments,
            tags,
            accounts,
            storage,
            gateway,
        }
    }

    /// State backed by the PostgreSQL repositories.
    pub fn from_database(
        db: &Database,
        storage: Arc<dyn StorageBackend>,
        gateway_config: GatewayConfig,
    ) -> Self {
        Self::new(
            db.notes.clone(),
            db.attachments.clone(),
            db.tags.clone(),
            db.accounts.clone(),
            storage,
            gateway_config,
        )
    }
}

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// CORS layer answering preflight with the fixed header set.
pub fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(
            defaults::CORS_ALLOWED_HEADERS
                .iter()
                .map(|name| HeaderName::from_static(*name))
                .collect::<Vec<_>>(),
        )
        .expose_headers([header::CONTENT_DISPOSITION])
        .max_age(Duration::from_secs(3600));

    match origins {
        AllowedOrigins::Any => layer.allow_origin(Any),
        AllowedOrigins::List(list) => layer.allow_origin(AllowOrigin::list(list.clone())),
    }
}

/// Largest request body accepted: a base64-encoded maximum-size file plus envelope.
pub fn body_limit(max_file_size: u64) -> usize {
    usize::try_from(encoded_len(max_file_size) + BODY_LIMIT_SLACK).unwrap_or(usize::MAX)
}

/// Build the full application router.
pub fn build_router(state: AppState, origins: &AllowedOrigins) -> Router {
    let limit = body_limit(state.gateway.config().max_file_size);

    let api = Router::new()
        .route("/auth/signup", post(handlers::auth::sign_up))
        .route("/auth/signin", post(handlers::auth::sign_in))
        .route("/auth/signout", post(handlers::auth::sign_out))
        .route("/auth/session", get(handlers::auth::current_session))
        .route(
            "/notes",
            post(handlers::notes::create_note).get(handlers::notes::list_notes),
        )
        .route(
            "/notes/:id",
            get(handlers::notes::get_note).patch(handlers::notes::update_note),
        )
        .route(
            "/notes/:id/attachments",
            get(handlers::attachments::list_note_attachments),
        )
        .route("/notes/:id/tags", get(handlers::tags::list_note_tags))
        .route(
            "/notes/:id/tags/:tag_id",
            put(handlers::tags::tag_note).delete(handlers::tags::untag_note),
        )
        .route("/attachments", get(handlers::attachments::list_attachments))
        .route(
            "/attachments/:id",
            get(handlers::attachments::get_attachment)
                .delete(handlers::attachments::delete_attachment),
        )
        .route(
            "/attachments/:id/content",
            get(handlers::attachments::download_attachment),
        )
        .route(
            "/tags",
            post(handlers::tags::create_tag).get(handlers::tags::list_tags),
        )
        .route("/openapi.json", get(handlers::system::openapi_json))
        .layer(RequestBodyLimitLayer::new(defaults::API_BODY_LIMIT));

    // Uploads carry their own ceiling; overflow is reported as a size validation error.
    let uploads = Router::new().route(
        "/uploads",
        post(handlers::uploads::upload).layer(DefaultBodyLimit::max(limit)),
    );

    Router::new()
        .route("/health", get(handlers::system::health))
        .nest("/api/v1", api.merge(uploads))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer(origins))
        .with_state(state)
}
