//! Integration tests for accounts, projects and collections
//!
//! Every request runs through the full router (session middleware included)
//! against a fresh database in a temporary root folder.

mod helpers;

use axum::http::StatusCode;
use helpers::{id_of, TestApp, ADMIN_EMAIL, PASSWORD};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::without_worker().await;

    let (status, body) = app.get("/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "dcs-server");
    assert_eq!(body["pending_deposits"], 0);
    assert!(body["version"].is_string());
}

// ============================================================================
// Registration and login
// ============================================================================

#[tokio::test]
async fn test_registration_starts_pending_and_cannot_log_in() {
    let app = TestApp::without_worker().await;

    let (status, person) = app.register("rosalind@example.org").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(person["registration_status"], "PENDING");
    assert_eq!(person["roles"], json!(["USER"]));
    assert!(person.get("password_hash").is_none());

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "rosalind@example.org", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = TestApp::without_worker().await;

    let (status, _) = app.register("dup@example.org").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.register("dup@example.org").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_registration_rejects_invalid_input() {
    let app = TestApp::without_worker().await;

    let (status, _) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "email": "no-at-sign", "password": PASSWORD, "first_names": "A", "last_names": "B" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "email": "short@example.org", "password": "abc", "first_names": "A", "last_names": "B" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Missing fields are a 400, not axum's default 422
    let (status, _) = app
        .post("/api/auth/register", None, json!({ "email": "x@example.org" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = TestApp::without_worker().await;

    let (status, _) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": "not-the-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "nobody@example.org", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_approval_flow_and_me() {
    let app = TestApp::without_worker().await;
    let (id, token) = app.approved_user("marie@example.org").await;

    let (status, me) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(id_of(&me), id);
    assert_eq!(me["registration_status"], "APPROVED");
}

#[tokio::test]
async fn test_logout_invalidates_token() {
    let app = TestApp::without_worker().await;
    let (_, token) = app.approved_user("lise@example.org").await;

    let (status, body) = app
        .post("/api/auth/logout", Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "logged_out");

    let (status, _) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_declining_user_ends_sessions() {
    let app = TestApp::without_worker().await;
    let admin = app.admin_token().await;
    let (id, token) = app.approved_user("emmy@example.org").await;

    let (status, person) = app
        .post(&format!("/api/people/{}/decline", id), Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(person["registration_status"], "DECLINED");

    let (status, _) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// People administration
// ============================================================================

#[tokio::test]
async fn test_pending_list_and_status_filter() {
    let app = TestApp::without_worker().await;
    let admin = app.admin_token().await;
    app.register("p1@example.org").await;
    app.register("p2@example.org").await;
    app.approved_user("a1@example.org").await;

    let (status, pending) = app.get("/api/people/pending", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 2);

    let (status, approved) = app
        .get("/api/people?status=APPROVED", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    let emails: Vec<&str> = approved
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["email"].as_str().unwrap())
        .collect();
    assert!(emails.contains(&"a1@example.org"));
    assert!(emails.contains(&ADMIN_EMAIL));
    assert!(!emails.contains(&"p1@example.org"));
}

#[tokio::test]
async fn test_profile_visibility() {
    let app = TestApp::without_worker().await;
    let admin = app.admin_token().await;
    let (alice, alice_token) = app.approved_user("alice@example.org").await;
    let (bob, _) = app.approved_user("bob@example.org").await;

    let (status, _) = app
        .get(&format!("/api/people/{}", alice), Some(&alice_token))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .get(&format!("/api/people/{}", bob), Some(&alice_token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get(&format!("/api/people/{}", bob), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .get(&format!("/api/people/{}", Uuid::new_v4()), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_role_changes_keep_user_role() {
    let app = TestApp::without_worker().await;
    let admin = app.admin_token().await;
    let (id, _) = app.approved_user("grace@example.org").await;

    let (status, person) = app
        .put(
            &format!("/api/people/{}/roles", id),
            Some(&admin),
            json!({ "roles": ["ADMIN"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let roles = person["roles"].as_array().unwrap();
    assert!(roles.contains(&json!("ADMIN")));
    assert!(roles.contains(&json!("USER")));
}

#[tokio::test]
async fn test_admin_cannot_demote_or_decline_self() {
    let app = TestApp::without_worker().await;
    let admin = app.admin_token().await;
    let (_, me) = app.get("/api/auth/me", Some(&admin)).await;
    let admin_id = id_of(&me);

    let (status, _) = app
        .put(
            &format!("/api/people/{}/roles", admin_id),
            Some(&admin),
            json!({ "roles": ["USER"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(&format!("/api/people/{}/decline", admin_id), Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Projects
// ============================================================================

#[tokio::test]
async fn test_create_and_update_project() {
    let app = TestApp::without_worker().await;
    let (pi, pi_token) = app.approved_user("pi@example.org").await;
    let project_id = app.create_project(&[pi], 0).await;

    let (status, project) = app
        .get(&format!("/api/projects/{}", project_id), Some(&pi_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(project["name"], "Arctic Ice Survey");
    assert_eq!(project["storage_used"], 0);
    assert_eq!(project["pi_ids"], json!([pi]));

    // A PI manages their own project
    let (status, updated) = app
        .put(
            &format!("/api/projects/{}", project_id),
            Some(&pi_token),
            json!({
                "name": "Arctic Ice Survey II",
                "pi_ids": [pi],
                "storage_allocated": 4096,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Arctic Ice Survey II");
    assert_eq!(updated["storage_allocated"], 4096);
}

#[tokio::test]
async fn test_project_validation() {
    let app = TestApp::without_worker().await;
    let admin = app.admin_token().await;
    let (_, pending_pi) = app.register("pending-pi@example.org").await;
    let pending_id = id_of(&pending_pi);

    // PI must be approved
    let (status, _) = app
        .post(
            "/api/projects",
            Some(&admin),
            json!({ "name": "X", "pi_ids": [pending_id] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // At least one PI
    let (status, _) = app
        .post("/api/projects", Some(&admin), json!({ "name": "X", "pi_ids": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // End before start
    let (_, me) = app.get("/api/auth/me", Some(&admin)).await;
    let (status, _) = app
        .post(
            "/api/projects",
            Some(&admin),
            json!({
                "name": "X",
                "pi_ids": [id_of(&me)],
                "start_date": "2025-06-01",
                "end_date": "2025-01-01",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_project_listing_is_scoped() {
    let app = TestApp::without_worker().await;
    let admin = app.admin_token().await;
    let (pi_a, token_a) = app.approved_user("a@example.org").await;
    let (pi_b, _) = app.approved_user("b@example.org").await;
    app.create_project(&[pi_a], 0).await;
    app.create_project(&[pi_b], 0).await;

    let (_, mine) = app.get("/api/projects", Some(&token_a)).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (_, all) = app.get("/api/projects", Some(&admin)).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_project_is_not_found() {
    let app = TestApp::without_worker().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .get(&format!("/api/projects/{}", Uuid::new_v4()), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_ids_get_json_errors() {
    let app = TestApp::without_worker().await;
    let admin = app.admin_token().await;

    for uri in [
        "/api/items/not-a-uuid".to_string(),
        "/api/projects/42".to_string(),
        format!("/api/collections/{}/depositors/nobody", Uuid::new_v4()),
    ] {
        let (status, body) = if uri.contains("/depositors/") {
            app.put(&uri, Some(&admin), json!({})).await
        } else {
            app.get(&uri, Some(&admin)).await
        };
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} should be 400", uri);
        assert_eq!(body["error"]["code"], "BAD_REQUEST", "{} body: {}", uri, body);
        assert!(!body["error"]["message"].as_str().unwrap().is_empty());
    }
}

// ============================================================================
// Collections and hierarchy
// ============================================================================

#[tokio::test]
async fn test_collection_creation_queues_archive_record() {
    let app = TestApp::without_worker().await;
    let (pi, pi_token) = app.approved_user("pi@example.org").await;
    let project_id = app.create_project(&[pi], 0).await;

    let (status, body) = app
        .create_collection(&pi_token, project_id, "Ice cores", None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["collection"]["title"], "Ice cores");
    assert_eq!(body["deposit"]["object_type"], "COLLECTION");
    assert_eq!(body["deposit"]["status"], "PENDING");

    let (_, listed) = app
        .get(&format!("/api/projects/{}/collections", project_id), None)
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_collection_hierarchy() {
    let app = TestApp::without_worker().await;
    let (pi, pi_token) = app.approved_user("pi@example.org").await;
    let project_id = app.create_project(&[pi], 0).await;

    let root = app.collection(&pi_token, project_id, "Root").await;
    let (_, child) = app
        .create_collection(&pi_token, project_id, "Child", Some(root))
        .await;
    let child_id = Uuid::parse_str(child["collection"]["id"].as_str().unwrap()).unwrap();
    let (_, grandchild) = app
        .create_collection(&pi_token, project_id, "Grandchild", Some(child_id))
        .await;
    let grandchild_id =
        Uuid::parse_str(grandchild["collection"]["id"].as_str().unwrap()).unwrap();

    let (status, children) = app
        .get(&format!("/api/collections/{}/children", root), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(children.as_array().unwrap().len(), 1);
    assert_eq!(children[0]["title"], "Child");

    let (_, ancestors) = app
        .get(&format!("/api/collections/{}/ancestors", grandchild_id), None)
        .await;
    let titles: Vec<&str> = ancestors
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Child", "Root"]);

    // Moving the root under its own grandchild would create a cycle
    let (status, _) = app
        .put(
            &format!("/api/collections/{}", root),
            Some(&pi_token),
            json!({ "title": "Root", "summary": "s", "parent_id": grandchild_id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // ...as would making a collection its own parent
    let (status, _) = app
        .put(
            &format!("/api/collections/{}", root),
            Some(&pi_token),
            json!({ "title": "Root", "summary": "s", "parent_id": root }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_concurrent_moves_cannot_form_cycle() {
    let app = TestApp::without_worker().await;
    let (pi, pi_token) = app.approved_user("pi@example.org").await;
    let project_id = app.create_project(&[pi], 0).await;
    let a = app.collection(&pi_token, project_id, "A").await;
    let b = app.collection(&pi_token, project_id, "B").await;

    let uri_a = format!("/api/collections/{}", a);
    let uri_b = format!("/api/collections/{}", b);
    let move_a = app.put(
        &uri_a,
        Some(&pi_token),
        json!({ "title": "A", "summary": "s", "parent_id": b }),
    );
    let move_b = app.put(
        &uri_b,
        Some(&pi_token),
        json!({ "title": "B", "summary": "s", "parent_id": a }),
    );
    let ((status_a, _), (status_b, _)) = tokio::join!(move_a, move_b);

    let mut statuses = [status_a, status_b];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);

    // The refused move left its collection where it was
    let (_, a_now) = app.get(&format!("/api/collections/{}", a), None).await;
    let (_, b_now) = app.get(&format!("/api/collections/{}", b), None).await;
    let parents = [a_now["parent_id"].is_null(), b_now["parent_id"].is_null()];
    assert_eq!(parents.iter().filter(|is_root| **is_root).count(), 1);
}

#[tokio::test]
async fn test_parent_must_belong_to_same_project() {
    let app = TestApp::without_worker().await;
    let (pi, pi_token) = app.approved_user("pi@example.org").await;
    let project_a = app.create_project(&[pi], 0).await;
    let project_b = app.create_project(&[pi], 0).await;
    let parent_in_a = app.collection(&pi_token, project_a, "A root").await;

    let (status, _) = app
        .create_collection(&pi_token, project_b, "B child", Some(parent_in_a))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .create_collection(&pi_token, project_b, "Orphan", Some(Uuid::new_v4()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_collection_requires_title() {
    let app = TestApp::without_worker().await;
    let (pi, pi_token) = app.approved_user("pi@example.org").await;
    let project_id = app.create_project(&[pi], 0).await;

    let (status, _) = app
        .create_collection(&pi_token, project_id, "   ", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Business object packages
// ============================================================================

#[tokio::test]
async fn test_project_bop_contains_everything() {
    let app = TestApp::without_worker().await;
    let (pi, pi_token) = app.approved_user("pi@example.org").await;
    let project_id = app.create_project(&[pi], 0).await;
    let root = app.collection(&pi_token, project_id, "Root").await;
    app.create_collection(&pi_token, project_id, "Child", Some(root))
        .await;
    let (status, _) = app.deposit(Some(&pi_token), root, &[("a.txt", b"alpha")]).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, bop) = app
        .get(&format!("/api/projects/{}/bop", project_id), Some(&pi_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bop["projects"].as_array().unwrap().len(), 1);
    assert_eq!(bop["collections"].as_array().unwrap().len(), 2);
    assert_eq!(bop["data_items"].as_array().unwrap().len(), 1);

    // PI appears once even though they are also the depositor
    let people = bop["people"].as_array().unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(id_of(&people[0]), pi);
}

#[tokio::test]
async fn test_collection_bop_includes_descendants_only() {
    let app = TestApp::without_worker().await;
    let (pi, pi_token) = app.approved_user("pi@example.org").await;
    let project_id = app.create_project(&[pi], 0).await;
    let root = app.collection(&pi_token, project_id, "Root").await;
    let (_, child) = app
        .create_collection(&pi_token, project_id, "Child", Some(root))
        .await;
    let child_id = Uuid::parse_str(child["collection"]["id"].as_str().unwrap()).unwrap();
    app.collection(&pi_token, project_id, "Sibling root").await;

    let (status, bop) = app
        .get(&format!("/api/collections/{}/bop", root), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = bop["collections"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"Root"));
    assert!(titles.contains(&"Child"));

    let (_, leaf) = app
        .get(&format!("/api/collections/{}/bop", child_id), None)
        .await;
    assert_eq!(leaf["collections"].as_array().unwrap().len(), 1);
}
