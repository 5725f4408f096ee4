use axum::response::IntoResponse;
use axum::Json;
use utoipa::OpenApi;

use crate::openapi::ApiDoc;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
