//! Test helper utilities
//!
//! [`TestApp`] owns a temporary root folder, a fresh database with the
//! bootstrap admin, a filesystem archive and (optionally) a running archive
//! worker. Requests go through the full router with `oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use dcs_common::config::BootstrapAdmin;
use dcs_common::db::init_database;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt;
use uuid::Uuid;

use dcs_server::services::accounts;
use dcs_server::services::archive::{ArchiveWorker, FsArchiveStore};
use dcs_server::{build_router, AppState};

pub const ADMIN_EMAIL: &str = "admin@test.example";
pub const ADMIN_PASSWORD: &str = "admin-secret";
pub const PASSWORD: &str = "password123";

pub struct TestApp {
    _dir: TempDir,
    pub root: PathBuf,
    pub pool: SqlitePool,
    pub router: Router,
    pub store: Arc<FsArchiveStore>,
    cancel: CancellationToken,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl TestApp {
    /// App with the archive worker polling every 20 ms
    pub async fn new() -> Self {
        Self::build(true, chrono::Duration::hours(1)).await
    }

    /// App whose deposits stay PENDING until processed by hand
    pub async fn without_worker() -> Self {
        Self::build(false, chrono::Duration::hours(1)).await
    }

    /// App without a worker whose sessions expire after `lifetime`
    pub async fn with_session_lifetime(lifetime: chrono::Duration) -> Self {
        Self::build(false, lifetime).await
    }

    async fn build(with_worker: bool, session_lifetime: chrono::Duration) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path().to_path_buf();
        let staging = root.join("staging");
        let archive = root.join("archive");
        std::fs::create_dir_all(&staging).unwrap();

        let pool = init_database(&root.join("dcs.db")).await.expect("database");

        let admin = BootstrapAdmin {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            first_names: "Ada".to_string(),
            last_names: "Admin".to_string(),
        };
        accounts::ensure_bootstrap_admin(&pool, &admin)
            .await
            .expect("bootstrap admin");

        let store = Arc::new(FsArchiveStore::new(archive));
        let cancel = CancellationToken::new();
        if with_worker {
            ArchiveWorker::new(pool.clone(), store.clone(), Duration::from_millis(20), 10)
                .spawn(cancel.clone());
        }

        let state = AppState::new(pool.clone(), store.clone(), staging, session_lifetime);

        Self {
            _dir: dir,
            root,
            pool,
            router: build_router(state),
            store,
            cancel,
        }
    }

    pub fn worker(&self) -> ArchiveWorker {
        ArchiveWorker::new(
            self.pool.clone(),
            self.store.clone(),
            Duration::from_millis(20),
            10,
        )
    }

    /// Send a request and return the status plus parsed JSON (Null if empty)
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("PUT", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("DELETE", uri, token, None).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/login",
                None,
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    pub async fn register(&self, email: &str) -> (StatusCode, Value) {
        self.post(
            "/api/auth/register",
            None,
            json!({
                "email": email,
                "password": PASSWORD,
                "first_names": "Test",
                "last_names": "User",
            }),
        )
        .await
    }

    /// Register, approve and log in a user; returns (id, token)
    pub async fn approved_user(&self, email: &str) -> (Uuid, String) {
        let (status, person) = self.register(email).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", person);
        let id = id_of(&person);

        let admin = self.admin_token().await;
        let (status, _) = self
            .post(&format!("/api/people/{}/approve", id), Some(&admin), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);

        (id, self.login(email, PASSWORD).await)
    }

    /// Create a project (as admin) with the given PIs; returns its id
    pub async fn create_project(&self, pi_ids: &[Uuid], storage_allocated: i64) -> Uuid {
        let admin = self.admin_token().await;
        let (status, body) = self
            .post(
                "/api/projects",
                Some(&admin),
                json!({
                    "name": "Arctic Ice Survey",
                    "description": "Ice core measurements",
                    "start_date": "2024-01-01",
                    "end_date": "2026-12-31",
                    "pi_ids": pi_ids,
                    "funding_entity": "NSF",
                    "award_numbers": ["ARC-0001"],
                    "storage_allocated": storage_allocated,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {}", body);
        id_of(&body)
    }

    /// Create a collection; returns the response body
    pub async fn create_collection(
        &self,
        token: &str,
        project_id: Uuid,
        title: &str,
        parent_id: Option<Uuid>,
    ) -> (StatusCode, Value) {
        self.post(
            &format!("/api/projects/{}/collections", project_id),
            Some(token),
            json!({
                "title": title,
                "summary": format!("Summary of {}", title),
                "parent_id": parent_id,
                "creators": [{"given_names": "Grace", "family_names": "Hopper"}],
            }),
        )
        .await
    }

    /// Create a collection and return its id, asserting success
    pub async fn collection(&self, token: &str, project_id: Uuid, title: &str) -> Uuid {
        let (status, body) = self.create_collection(token, project_id, title, None).await;
        assert_eq!(status, StatusCode::CREATED, "create collection failed: {}", body);
        Uuid::parse_str(body["collection"]["id"].as_str().unwrap()).unwrap()
    }

    pub async fn deposit(
        &self,
        token: Option<&str>,
        collection_id: Uuid,
        files: &[(&str, &[u8])],
    ) -> (StatusCode, Value) {
        let files: Vec<Value> = files
            .iter()
            .map(|(name, content)| json!({ "name": name, "content_base64": b64(content) }))
            .collect();
        self.post(
            &format!("/api/collections/{}/items", collection_id),
            token,
            json!({ "name": "Core sample 17", "description": "Depth 40m", "files": files }),
        )
        .await
    }
}

pub fn b64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

pub fn id_of(body: &Value) -> Uuid {
    Uuid::parse_str(body["id"].as_str().expect("id field")).expect("uuid")
}
