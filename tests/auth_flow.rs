mod common;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use task_tracker::db::users::{self, NewUser};
use task_tracker::errors::AppError;
use task_tracker::models::user::Role;

#[tokio::test]
async fn signup_login_and_me() -> Result<()> {
    let app = common::spawn_app().await?;

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({"username": "bob", "email": "bob@x.com", "password": "password123"})),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "User");
    assert_eq!(body["username"], "bob");
    let id = body["id"].as_str().context("missing id")?.to_string();

    // login returns the same identity
    let (status, body) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "bob@x.com", "password": "password123"})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    let token = body["token"].as_str().context("missing token")?.to_string();

    let (status, body) = app.request("GET", "/api/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "bob@x.com");
    assert!(body.get("passwordHash").is_none(), "secrets must not leak: {}", body);

    Ok(())
}

#[tokio::test]
async fn signup_role_selection() -> Result<()> {
    let app = common::spawn_app().await?;

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({"username": "root", "email": "root@x.com", "password": "password123", "role": "Admin"})),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "Admin");

    // anything other than exactly "Admin" becomes a plain user
    let (status, body) = app
        .request(
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({"email": "sneaky@x.com", "password": "password123", "role": "admin"})),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "User");

    Ok(())
}

#[tokio::test]
async fn signup_and_login_failures() -> Result<()> {
    let app = common::spawn_app().await?;
    app.signup("bob", "bob@x.com", "User").await?;

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({"email": "bob@x.com", "password": "password123"})),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT, "duplicate email should conflict");

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({"email": "short@x.com", "password": "short"})),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "short password should be rejected");

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "bob@x.com", "password": "wrongpassword"})),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "nobody@x.com", "password": "password123"})),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_valid_session() -> Result<()> {
    let app = common::spawn_app().await?;
    let (id, _) = app.signup("bob", "bob@x.com", "User").await?;

    let (status, _) = app.request("GET", "/api/tasks", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "missing token");

    let (status, _) = app.request("GET", "/api/tasks", Some("garbage"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "malformed token");

    let expired = common::jwt_config().encode_at(&id, Role::User, Utc::now() - Duration::hours(48))?;
    let (status, body) = app.request("GET", "/api/tasks", Some(&expired), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "expired token");
    assert!(
        body["message"].as_str().unwrap_or_default().contains("expired"),
        "expected an expiry message, got {}",
        body
    );

    Ok(())
}

#[tokio::test]
async fn password_reset_flow() -> Result<()> {
    let app = common::spawn_app().await?;
    app.signup("bob", "bob@x.com", "User").await?;

    // unknown email gets the same neutral answer and no token
    let (status, body) = app
        .request("POST", "/api/auth/forgot-password", None, Some(json!({"email": "nobody@x.com"})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("resetToken").is_none());

    let (status, body) = app
        .request("POST", "/api/auth/forgot-password", None, Some(json!({"email": "bob@x.com"})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let reset_token = body["resetToken"].as_str().context("missing resetToken")?.to_string();

    // the raw token is never stored
    let stored: Option<String> = sqlx::query_scalar("SELECT reset_token_hash FROM users WHERE email = ?")
        .bind("bob@x.com")
        .fetch_one(&app.pool)
        .await?;
    assert_ne!(stored.as_deref(), Some(reset_token.as_str()));

    let (status, _) = app
        .request("POST", "/api/auth/reset-password", None, Some(json!({"token": reset_token})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "password is required");

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/reset-password",
            None,
            Some(json!({"token": "deadbeef", "password": "newpassword1"})),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "unknown token");

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/reset-password",
            None,
            Some(json!({"token": reset_token, "password": "newpassword1"})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    // token is single-use
    let (status, _) = app
        .request(
            "POST",
            "/api/auth/reset-password",
            None,
            Some(json!({"token": reset_token, "password": "another-pass"})),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "bob@x.com", "password": "password123"})),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "old password must stop working");

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "bob@x.com", "password": "newpassword1"})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn expired_reset_token_is_refused() -> Result<()> {
    let app = common::spawn_app().await?;
    app.signup("bob", "bob@x.com", "User").await?;

    let (_, body) = app
        .request("POST", "/api/auth/forgot-password", None, Some(json!({"email": "bob@x.com"})))
        .await?;
    let reset_token = body["resetToken"].as_str().context("missing resetToken")?.to_string();

    sqlx::query("UPDATE users SET reset_token_expires_at = ? WHERE email = ?")
        .bind(Utc::now() - Duration::minutes(5))
        .bind("bob@x.com")
        .execute(&app.pool)
        .await?;

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/reset-password",
            None,
            Some(json!({"token": reset_token, "password": "newpassword1"})),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().contains("expired"), "{}", body);

    Ok(())
}

#[tokio::test]
async fn user_directory_lists_minimal_fields() -> Result<()> {
    let app = common::spawn_app().await?;
    let (_, token) = app.signup("bob", "bob@x.com", "User").await?;
    app.request(
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({"email": "anon@x.com", "password": "password123"})),
    )
    .await?;

    let (status, body) = app.request("GET", "/api/users", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().context("expected array")?;
    assert_eq!(users.len(), 2);
    let anon = users
        .iter()
        .find(|u| u["email"] == "anon@x.com")
        .context("anon user missing")?;
    assert_eq!(anon["username"], "", "missing username renders as empty string");
    assert!(anon.get("role").is_none());

    Ok(())
}

#[tokio::test]
async fn duplicate_insert_is_a_conflict() -> Result<()> {
    let app = common::spawn_app().await?;
    app.signup("bob", "bob@x.com", "User").await?;

    // a second signup that passed the email check before the first one committed
    let err = users::insert_user(
        &app.pool,
        NewUser {
            id: "late-bob",
            username: Some("bob2"),
            email: "bob@x.com",
            password_hash: "not-a-real-hash",
            role: Role::User,
            created_at: Utc::now(),
        },
    )
    .await
    .expect_err("unique email index must reject the insert");
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);

    Ok(())
}
