#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use argon2::Params;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use corkboard_api::{AppStateInner, AuthConfig};
use corkboard_db::Database;

pub const PASSWORD: &str = "correct horse battery";

pub fn app() -> Router {
    app_with_db().0
}

/// The router together with its database, for tests that tamper with storage.
pub fn app_with_db() -> (Router, Arc<Database>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let config = AuthConfig {
        session_ttl: Duration::from_secs(3600),
        password_params: Params::new(Params::MIN_M_COST, 1, 1, None).unwrap(),
    };
    let router = corkboard_api::router(AppStateInner::new(db.clone(), config).unwrap());
    (router, db)
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Sign up and log in; returns (user id, bearer token).
pub async fn login_as(app: &Router, email: &str) -> (i64, String) {
    let credentials = serde_json::json!({ "email": email, "password": PASSWORD });

    let (status, user) = send(
        app,
        Method::POST,
        "/auth/users",
        None,
        Some(credentials.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {user}");

    let (status, session) =
        send(app, Method::POST, "/auth/sessions", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::CREATED, "login failed: {session}");

    (
        user["id"].as_i64().unwrap(),
        session["token"].as_str().unwrap().to_string(),
    )
}

pub async fn create_board(app: &Router, token: &str, title: &str) -> i64 {
    let (status, board) = send(
        app,
        Method::POST,
        "/boards",
        Some(token),
        Some(serde_json::json!({ "title": title })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create board failed: {board}");
    board["id"].as_i64().unwrap()
}

pub async fn create_bookmark(app: &Router, token: &str, board_id: i64, title: &str) -> i64 {
    let (status, bookmark) = send(
        app,
        Method::POST,
        &format!("/boards/{board_id}/bookmarks"),
        Some(token),
        Some(serde_json::json!({ "title": title, "url": "https://example.com/" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create bookmark failed: {bookmark}");
    bookmark["id"].as_i64().unwrap()
}
