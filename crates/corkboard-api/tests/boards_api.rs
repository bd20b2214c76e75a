mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{app, create_board, login_as, send};

#[tokio::test]
async fn create_board_takes_owner_from_session() {
    let app = app();
    let (user_id, token) = login_as(&app, "ada@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/boards",
        Some(&token),
        Some(json!({ "title": "Trip", "description": "Plans" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].is_i64());
    assert_eq!(body["ownerId"], user_id);
    assert_eq!(body["title"], "Trip");
    assert_eq!(body["description"], "Plans");
    assert!(body["createdAt"].is_string());
    assert!(body["updatedAt"].is_string());
}

#[tokio::test]
async fn create_board_requires_session() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/boards",
        None,
        Some(json!({ "title": "Trip" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn client_cannot_choose_owner() {
    let app = app();
    let (_, token) = login_as(&app, "ada@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/boards",
        Some(&token),
        Some(json!({ "title": "Trip", "ownerId": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "body");

    let (_, page) = send(&app, Method::GET, "/boards", None, None).await;
    assert!(page["boards"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_board_payload_lists_fields() {
    let app = app();
    let (_, token) = login_as(&app, "ada@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/boards",
        Some(&token),
        Some(json!({ "title": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
    assert_eq!(body["fields"][0]["field"], "title");
}

#[tokio::test]
async fn only_owner_mutates_board() {
    let app = app();
    let (_, alice) = login_as(&app, "alice@example.com").await;
    let (_, carol) = login_as(&app, "carol@example.com").await;
    let board_id = create_board(&app, &alice, "Trip").await;
    let uri = format!("/boards/{board_id}");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&carol),
        Some(json!({ "title": "Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&carol), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Nothing changed.
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Trip");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&alice),
        Some(json!({ "description": "Two weeks" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Trip");
    assert_eq!(body["description"], "Two weeks");

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mutation_status_codes() {
    let app = app();
    let (_, alice) = login_as(&app, "alice@example.com").await;
    let board_id = create_board(&app, &alice, "Trip").await;

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/boards/{board_id}"),
        None,
        Some(json!({ "title": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::DELETE, "/boards/9999", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, "/boards/not-a-number", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn authorization_precedes_payload_validation() {
    let app = app();
    let (_, alice) = login_as(&app, "alice@example.com").await;
    let (_, carol) = login_as(&app, "carol@example.com").await;
    let board_id = create_board(&app, &alice, "Trip").await;
    let uri = format!("/boards/{board_id}");

    let blank = json!({ "title": "" });

    let (status, _) = send(&app, Method::PATCH, &uri, Some(&carol), Some(blank.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::PATCH, &uri, None, Some(blank.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/boards/9999",
        Some(&alice),
        Some(blank.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::PATCH, &uri, Some(&alice), Some(blank)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn anonymous_mutation_is_unauthenticated_even_with_bad_id() {
    let app = app();
    let (_, alice) = login_as(&app, "alice@example.com").await;
    let rename = json!({ "title": "Renamed" });

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/boards/not-a-number",
        None,
        Some(rename.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, _) = send(&app, Method::DELETE, "/boards/not-a-number", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/boards/not-a-number",
        Some(&alice),
        Some(rename),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, "/boards/not-a-number", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_patch_returns_board_unchanged() {
    let app = app();
    let (_, alice) = login_as(&app, "alice@example.com").await;
    let board_id = create_board(&app, &alice, "Trip").await;

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/boards/{board_id}"),
        Some(&alice),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Trip");
}

#[tokio::test]
async fn null_description_clears_it() {
    let app = app();
    let (_, alice) = login_as(&app, "alice@example.com").await;
    let (_, board) = send(
        &app,
        Method::POST,
        "/boards",
        Some(&alice),
        Some(json!({ "title": "Trip", "description": "Plans" })),
    )
    .await;
    let uri = format!("/boards/{}", board["id"]);

    let retitle = json!({ "title": "Voyage" });
    let (_, body) = send(&app, Method::PATCH, &uri, Some(&alice), Some(retitle)).await;
    assert_eq!(body["description"], "Plans");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&alice),
        Some(json!({ "description": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Voyage");
    assert!(body["description"].is_null());
}

#[tokio::test]
async fn listing_degrades_bad_paging_to_defaults() {
    let app = app();
    let (_, alice) = login_as(&app, "alice@example.com").await;
    for title in ["One", "Two", "Three"] {
        create_board(&app, &alice, title).await;
    }

    let (status, plain) = send(&app, Method::GET, "/boards", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plain["page"], 1);
    assert_eq!(plain["count"], 20);
    assert_eq!(plain["boards"].as_array().unwrap().len(), 3);

    for uri in ["/boards?page=0&count=-5", "/boards?page=abc&count=", "/boards?page=-2"] {
        let (status, body) = send(&app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, plain, "{uri}");
    }

    let (_, second) = send(&app, Method::GET, "/boards?page=2&count=2", None, None).await;
    let titles: Vec<&str> = second["boards"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Three"]);
}
