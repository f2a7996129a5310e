//! User record access.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::errors::{AppError, AppResult};
use crate::models::user::{DbUser, Role, User};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, reset_token_hash, reset_token_expires_at, created_at";

pub struct NewUser<'a> {
    pub id: &'a str,
    pub username: Option<&'a str>,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// `None` is a normal outcome, not an error.
pub async fn get_user_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<DbUser>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let user = sqlx::query_as::<_, DbUser>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<DbUser>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
    let user = sqlx::query_as::<_, DbUser>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_user_by_reset_token_hash(pool: &SqlitePool, token_hash: &str) -> AppResult<Option<DbUser>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE reset_token_hash = ?");
    let user = sqlx::query_as::<_, DbUser>(&sql)
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn email_in_use(pool: &SqlitePool, email: &str) -> AppResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn insert_user(pool: &SqlitePool, user: NewUser<'_>) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user.id)
    .bind(user.username)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.role.as_str())
    .bind(user.created_at)
    .execute(pool)
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::conflict("email already in use"),
        other => AppError::from(other),
    })?;
    Ok(())
}

pub async fn list_users(pool: &SqlitePool) -> AppResult<Vec<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC");
    let rows = sqlx::query_as::<_, DbUser>(&sql).fetch_all(pool).await?;
    rows.into_iter().map(User::try_from).collect()
}

pub async fn set_reset_token(
    pool: &SqlitePool,
    user_id: &str,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query("UPDATE users SET reset_token_hash = ?, reset_token_expires_at = ? WHERE id = ?")
        .bind(token_hash)
        .bind(expires_at)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Store the new password hash and clear any outstanding reset token.
pub async fn reset_password(pool: &SqlitePool, user_id: &str, password_hash: &str) -> AppResult<()> {
    sqlx::query(
        "UPDATE users SET password_hash = ?, reset_token_hash = NULL, reset_token_expires_at = NULL WHERE id = ?",
    )
    .bind(password_hash)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns false when no user has that email.
pub async fn set_role(pool: &SqlitePool, email: &str, role: Role) -> AppResult<bool> {
    let result = sqlx::query("UPDATE users SET role = ? WHERE email = ?")
        .bind(role.as_str())
        .bind(email)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
