//! Shared helpers for the Web API integration tests.
#![allow(dead_code)]

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use drivebox::{Config, Database, FileStorage, WebServer};
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;

/// A running test server with its database and storage directory.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub storage_dir: TempDir,
}

impl TestApp {
    /// Directory holding a user's stored files.
    pub fn user_dir(&self, user_id: i64) -> PathBuf {
        self.storage_dir.path().join(user_id.to_string())
    }

    /// Number of files stored on disk for a user.
    pub fn stored_file_count(&self, user_id: i64) -> usize {
        std::fs::read_dir(self.user_dir(user_id))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// Read a user's storage counter straight from the database.
    pub async fn storage_used(&self, user_id: i64) -> i64 {
        sqlx::query_scalar("SELECT storage_used FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(self.db.pool())
            .await
            .expect("storage_used")
    }

    /// Set a user's quota directly.
    pub async fn set_quota(&self, user_id: i64, quota: i64) {
        sqlx::query("UPDATE users SET storage_quota = ? WHERE id = ?")
            .bind(quota)
            .bind(user_id)
            .execute(self.db.pool())
            .await
            .expect("set quota");
    }
}

/// Configuration with generous rate limits and small upload limits.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = "test-secret-key-for-testing-only".to_string();
    config.auth.login_attempts = 1000;
    config.auth.register_attempts = 1000;
    config.storage.max_file_size_mb = 1;
    config.storage.max_files_per_upload = 3;
    config
}

/// Create a test server from a configuration, with an in-memory database.
pub async fn create_test_app_with(config: Config) -> TestApp {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let storage_dir = tempfile::tempdir().expect("Failed to create storage dir");
    let storage = FileStorage::new(storage_dir.path()).expect("Failed to create storage");

    let web = WebServer::new(&config, db.clone(), storage).expect("Failed to create server");
    let server = TestServer::new(web.router()).expect("Failed to create test server");

    TestApp {
        server,
        db,
        storage_dir,
    }
}

/// Create a test server with the default test configuration.
pub async fn create_test_app() -> TestApp {
    create_test_app_with(test_config()).await
}

/// Authorization header value for a token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Register a user and return (token, user id).
pub async fn register_test_user(server: &TestServer, username: &str) -> (String, i64) {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "password123"
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body = response.json::<Value>();
    let token = body["data"]["token"]
        .as_str()
        .expect("token in response")
        .to_string();
    let user_id = body["data"]["user"]["id"].as_i64().expect("user id");
    (token, user_id)
}

/// Create a folder and return its JSON.
pub async fn create_folder(
    server: &TestServer,
    token: &str,
    name: &str,
    parent_id: Option<i64>,
) -> Value {
    let response = server
        .post("/api/folders")
        .add_header(axum::http::header::AUTHORIZATION, bearer(token))
        .json(&json!({ "name": name, "parentId": parent_id }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()["data"].clone()
}

/// A file part for the `files` field.
pub fn file_part(name: &str, mime: &str, content: &[u8]) -> Part {
    Part::bytes(content.to_vec())
        .file_name(name.to_string())
        .mime_type(mime.to_string())
}

/// Upload files and return the response.
pub async fn upload(
    server: &TestServer,
    token: &str,
    folder_id: Option<i64>,
    parts: Vec<(&str, Part)>,
) -> axum_test::TestResponse {
    let mut form = MultipartForm::new();
    if let Some(folder_id) = folder_id {
        form = form.add_text("folderId", folder_id.to_string());
    }
    for (field, part) in parts {
        form = form.add_part(field.to_string(), part);
    }

    server
        .post("/api/files/upload")
        .add_header(axum::http::header::AUTHORIZATION, bearer(token))
        .multipart(form)
        .await
}

/// Upload a single text file and return its JSON.
pub async fn upload_text(
    server: &TestServer,
    token: &str,
    folder_id: Option<i64>,
    name: &str,
    content: &str,
) -> Value {
    let response = upload(
        server,
        token,
        folder_id,
        vec![("files", file_part(name, "text/plain", content.as_bytes()))],
    )
    .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()["data"]["files"][0].clone()
}
