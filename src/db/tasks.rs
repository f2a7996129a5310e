//! Task record access.

use sqlx::SqlitePool;

use crate::errors::AppResult;
use crate::models::task::{DbTask, Task};

const TASK_COLUMNS: &str = "id, title, description, status, assigned_to, created_by, created_at, updated_at";

fn into_tasks(rows: Vec<DbTask>) -> AppResult<Vec<Task>> {
    rows.into_iter().map(Task::try_from).collect()
}

pub async fn list_tasks(pool: &SqlitePool) -> AppResult<Vec<Task>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at ASC, id ASC");
    let rows = sqlx::query_as::<_, DbTask>(&sql).fetch_all(pool).await?;
    into_tasks(rows)
}

/// Exact match on the stored assignee reference.
pub async fn query_tasks_by_assignee(pool: &SqlitePool, value: &str) -> AppResult<Vec<Task>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE assigned_to = ? ORDER BY created_at ASC, id ASC");
    let rows = sqlx::query_as::<_, DbTask>(&sql)
        .bind(value)
        .fetch_all(pool)
        .await?;
    into_tasks(rows)
}

pub async fn get_task(pool: &SqlitePool, id: &str) -> AppResult<Option<Task>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?");
    let row = sqlx::query_as::<_, DbTask>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(Task::try_from).transpose()
}

pub async fn insert_task(pool: &SqlitePool, task: &Task) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO tasks (id, title, description, status, assigned_to, created_by, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status.as_str())
    .bind(&task.assigned_to)
    .bind(&task.created_by)
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Write back the mutable columns. Last write wins.
pub async fn update_task(pool: &SqlitePool, task: &Task) -> AppResult<()> {
    sqlx::query(
        "UPDATE tasks SET title = ?, description = ?, status = ?, assigned_to = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status.as_str())
    .bind(&task.assigned_to)
    .bind(task.updated_at)
    .bind(&task.id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns false when there was nothing to delete.
pub async fn delete_task(pool: &SqlitePool, id: &str) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
