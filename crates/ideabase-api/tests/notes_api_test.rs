//! Note Persistence through the HTTP surface.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use common::{json_request, TestApp};

#[tokio::test]
async fn test_create_note_is_owned_by_session() {
    let app = TestApp::new();
    let id = app.create_note("Groceries").await;

    let notes = app.notes.all();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].id, id);
    assert_eq!(notes[0].owner_id, app.identity.user_id);
    assert_eq!(notes[0].content, "<p>body</p>");
    assert!(!notes[0].archived);
}

#[tokio::test]
async fn test_empty_title_rejected_before_persistence() {
    let app = TestApp::new();
    for title in ["", "   "] {
        let (status, body) = app
            .call(app.json(
                Method::POST,
                "/api/v1/notes",
                json!({ "title": title, "content": "x" }),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Please add a title");
    }
    assert_eq!(app.notes.insert_count(), 0);
}

#[tokio::test]
async fn test_create_without_session_rejected_before_persistence() {
    let app = TestApp::new();
    let (status, body) = app
        .call(json_request(
            Method::POST,
            "/api/v1/notes",
            None,
            json!({ "title": "Hello" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Please sign in");
    assert_eq!(app.notes.insert_count(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new();
    let req = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/v1/notes")
        .header("authorization", app.bearer())
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"title\":"))
        .unwrap();
    let (status, body) = app.call(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_get_note_is_owner_scoped() {
    let app = TestApp::new();
    let id = app.create_note("Private").await;

    let (status, body) = app.call(app.get(&format!("/api/v1/notes/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Private");

    let (_, other_token) = app.other_user();
    let req = axum::http::Request::builder()
        .uri(format!("/api/v1/notes/{}", id))
        .header("authorization", format!("Bearer {}", other_token))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = app.call(req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Note not found");
}

#[tokio::test]
async fn test_missing_and_malformed_ids() {
    let app = TestApp::new();
    let (status, _) = app
        .call(app.get(&format!("/api/v1/notes/{}", Uuid::new_v4())))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.call(app.get("/api/v1/notes/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_note() {
    let app = TestApp::new();
    let id = app.create_note("Draft").await;
    let uri = format!("/api/v1/notes/{}", id);

    let (status, body) = app
        .call(app.json(
            Method::PATCH,
            &uri,
            json!({ "title": "Final", "archived": true }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Final");
    assert_eq!(body["archived"], true);
    assert_eq!(body["content"], "<p>body</p>");

    let (status, body) = app
        .call(app.json(Method::PATCH, &uri, json!({ "title": " " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please add a title");
}

#[tokio::test]
async fn test_only_owner_can_update() {
    let app = TestApp::new();
    let id = app.create_note("Mine").await;
    let (_, other_token) = app.other_user();

    let (status, _) = app
        .call(json_request(
            Method::PATCH,
            &format!("/api/v1/notes/{}", id),
            Some(&format!("Bearer {}", other_token)),
            json!({ "title": "Stolen" }),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.notes.all()[0].title, "Mine");
}

#[tokio::test]
async fn test_list_notes_filters_archived() {
    let app = TestApp::new();
    let keep = app.create_note("Keep").await;
    let old = app.create_note("Old").await;
    let (status, _) = app
        .call(app.json(
            Method::PATCH,
            &format!("/api/v1/notes/{}", old),
            json!({ "archived": true }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, all) = app.call(app.get("/api/v1/notes")).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, active) = app.call(app.get("/api/v1/notes?archived=false")).await;
    let active = active.as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["id"], keep.to_string());

    let (status, _) = app.call(app.get("/api/v1/notes?archived=sometimes")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
