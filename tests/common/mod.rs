#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

use task_tracker::jwt::JwtConfig;
use task_tracker::{create_app, AppConfig, PasswordResetConfig};

pub const JWT_SECRET: &str = "test-secret";

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    // keeps the database file alive for the duration of the test
    _dir: TempDir,
}

pub async fn spawn_app() -> Result<TestApp> {
    let dir = tempfile::tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test.db");
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    // run migrations from crate migrations folder
    let migrator =
        sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;

    let config = AppConfig {
        database_url: format!("sqlite://{}", db_path.display()),
        port: 0,
        jwt: jwt_config(),
        password_reset: PasswordResetConfig::default(),
    };
    let router = create_app(pool.clone(), &config).await?;

    Ok(TestApp { router, pool, _dir: dir })
}

pub fn jwt_config() -> JwtConfig {
    JwtConfig::new(JWT_SECRET, 24)
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.router.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok((status, value))
    }

    /// Sign up and return `(id, token)`.
    pub async fn signup(&self, username: &str, email: &str, role: &str) -> Result<(String, String)> {
        let (status, body) = self
            .request(
                "POST",
                "/api/auth/signup",
                None,
                Some(json!({
                    "username": username,
                    "email": email,
                    "password": "password123",
                    "role": role
                })),
            )
            .await?;
        if status != StatusCode::CREATED {
            panic!("signup failed: {} - {}", status, body);
        }
        let id = body["id"].as_str().context("missing id")?.to_string();
        let token = body["token"].as_str().context("missing token")?.to_string();
        Ok((id, token))
    }

    /// Create a task as `admin_token` and return its id.
    pub async fn create_task(&self, admin_token: &str, title: &str, assigned_to: &str) -> Result<String> {
        let (status, body) = self
            .request(
                "POST",
                "/api/tasks",
                Some(admin_token),
                Some(json!({ "title": title, "assignedTo": assigned_to })),
            )
            .await?;
        if status != StatusCode::CREATED {
            panic!("task create failed: {} - {}", status, body);
        }
        Ok(body["id"].as_str().context("missing task id")?.to_string())
    }
}

pub fn task_ids(body: &Value) -> Vec<String> {
    body.as_array()
        .map(|tasks| {
            tasks
                .iter()
                .filter_map(|t| t["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
