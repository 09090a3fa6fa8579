//! Authentication and authorization boundaries
//!
//! Anonymous requests to protected endpoints get 401; signed-in users
//! without the needed role or project relationship get 403.

mod helpers;

use axum::http::StatusCode;
use helpers::TestApp;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_protected_endpoints_require_session() {
    let app = TestApp::without_worker().await;
    let id = Uuid::new_v4();

    let get_endpoints = [
        "/api/auth/me".to_string(),
        "/api/people".to_string(),
        "/api/people/pending".to_string(),
        format!("/api/people/{}", id),
        "/api/projects".to_string(),
        format!("/api/projects/{}", id),
        format!("/api/projects/{}/bop", id),
        format!("/api/collections/{}/depositors", id),
        "/api/depositable-collections".to_string(),
        format!("/api/deposits/{}/status", id),
        format!("/api/objects/{}/deposits", id),
        "/api/archive/units?type=DATA_ITEM".to_string(),
        "/api/metadata-formats".to_string(),
    ];

    for uri in &get_endpoints {
        let (status, body) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "GET {} should be 401", uri);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    let (status, _) = app.deposit(None, id, &[("a.txt", b"a")]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post("/api/projects", None, json!({ "name": "X", "pi_ids": [] }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_token_is_anonymous() {
    let app = TestApp::without_worker().await;

    let (status, _) = app.get("/api/auth/me", Some("not-a-real-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Public endpoints still answer
    let (status, _) = app.get("/health", Some("not-a-real-token")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_expired_session_is_rejected() {
    let app = TestApp::with_session_lifetime(chrono::Duration::milliseconds(300)).await;
    let token = app.admin_token().await;

    let (status, _) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(std::time::Duration::from_millis(600)).await;

    let (status, body) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // A fresh login works again
    let token = app.admin_token().await;
    let (status, _) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_endpoints_forbidden_to_users() {
    let app = TestApp::without_worker().await;
    let (user, token) = app.approved_user("user@example.org").await;

    for uri in [
        "/api/people",
        "/api/people/pending",
        "/api/archive/units?type=COLLECTION",
    ] {
        let (status, body) = app.get(uri, Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "GET {} should be 403", uri);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    let (status, _) = app
        .post(&format!("/api/people/{}/approve", user), Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/api/projects",
            Some(&token),
            json!({ "name": "Mine", "pi_ids": [user] }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/api/metadata-formats",
            Some(&token),
            json!({
                "name": "EML",
                "version": "2.1.1",
                "root_element": "eml",
                "applies_to": "COLLECTION",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_only_project_managers_change_collections() {
    let app = TestApp::without_worker().await;
    let (pi, pi_token) = app.approved_user("pi@example.org").await;
    let (_, outsider_token) = app.approved_user("outsider@example.org").await;
    let project_id = app.create_project(&[pi], 0).await;
    let collection_id = app.collection(&pi_token, project_id, "Ice cores").await;

    let (status, _) = app
        .create_collection(&outsider_token, project_id, "Intruder", None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .put(
            &format!("/api/collections/{}", collection_id),
            Some(&outsider_token),
            json!({ "title": "Renamed", "summary": "s" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .put(
            &format!("/api/projects/{}", project_id),
            Some(&outsider_token),
            json!({ "name": "Renamed", "pi_ids": [pi] }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .get(
            &format!("/api/collections/{}/depositors", collection_id),
            Some(&outsider_token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_collection_bop_hides_restricted_records() {
    let app = TestApp::without_worker().await;
    let (pi, pi_token) = app.approved_user("pi@example.org").await;
    let (_, outsider_token) = app.approved_user("outsider@example.org").await;
    let project_id = app.create_project(&[pi], 0).await;
    let collection_id = app.collection(&pi_token, project_id, "Ice cores").await;
    let uri = format!("/api/collections/{}/bop", collection_id);

    let (status, _) = app.get(&format!("/api/projects/{}", project_id), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, anonymous) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(anonymous["collections"].as_array().unwrap().len(), 1);
    assert!(anonymous["projects"].as_array().unwrap().is_empty());
    assert!(anonymous["people"].as_array().unwrap().is_empty());
    assert!(!anonymous.to_string().contains("pi@example.org"));

    let (_, outsider) = app.get(&uri, Some(&outsider_token)).await;
    assert_eq!(outsider["projects"].as_array().unwrap().len(), 1);
    assert!(outsider["people"].as_array().unwrap().is_empty());

    let (_, manager) = app.get(&uri, Some(&pi_token)).await;
    assert_eq!(manager["projects"].as_array().unwrap().len(), 1);
    assert_eq!(manager["people"][0]["email"], "pi@example.org");
}

#[tokio::test]
async fn test_non_depositor_cannot_deposit() {
    let app = TestApp::without_worker().await;
    let (pi, pi_token) = app.approved_user("pi@example.org").await;
    let (_, outsider_token) = app.approved_user("outsider@example.org").await;
    let project_id = app.create_project(&[pi], 0).await;
    let collection_id = app.collection(&pi_token, project_id, "Ice cores").await;

    let (status, _) = app
        .deposit(Some(&outsider_token), collection_id, &[("a.txt", b"a")])
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deposit_into_unknown_collection_is_not_found() {
    let app = TestApp::without_worker().await;
    let admin = app.admin_token().await;

    let (status, _) = app
        .deposit(Some(&admin), Uuid::new_v4(), &[("a.txt", b"a")])
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
