use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::{identity, visible_tasks, PolicyDenied, Principal};
use crate::db::{tasks, users};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::task::{Task, TaskCreateRequest, TaskUpdateRequest};
use crate::models::user::User;
use crate::utils::{new_id, utc_now};

#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "Tasks",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "Tasks visible to the caller", body = [Task]))
)]
pub async fn list_tasks(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Task>>> {
    let principal = &auth.principal;
    let caller = load_caller(&state, principal).await?;
    let candidates = candidate_tasks(&state, principal, caller.as_ref()).await?;

    let visible = visible_tasks(principal, &candidates, |_| caller);
    Ok(Json(visible))
}

#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "Tasks",
    security(("bearerAuth" = [])),
    request_body = TaskCreateRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Title and assignee are required"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<TaskCreateRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let principal = &auth.principal;
    if !state.policy.can_create(principal) {
        return Err(PolicyDenied::NotAdmin.into());
    }

    let title = payload.title.filter(|t| !t.trim().is_empty());
    let assigned_to = payload.assigned_to.filter(|a| !a.trim().is_empty());
    let (Some(title), Some(assigned_to)) = (title, assigned_to) else {
        return Err(AppError::bad_request("title and assignedTo are required"));
    };

    let now = utc_now();
    // assigned_to is stored verbatim: an id, an email or a username are all accepted.
    let task = Task {
        id: new_id(),
        title,
        description: payload.description.unwrap_or_default(),
        status: payload.status.unwrap_or_default(),
        assigned_to,
        created_by: principal.id.clone(),
        created_at: now,
        updated_at: now,
    };

    tasks::insert_task(&state.pool, &task).await?;
    tracing::info!(task_id = %task.id, assigned_to = %task.assigned_to, "task created");

    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task detail", body = Task),
        (status = 403, description = "Not assigned to the caller"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Task>> {
    let principal = &auth.principal;
    let task = fetch_task(&state, &id).await?;
    let caller = load_caller(&state, principal).await?;

    if !state.policy.can_read(principal, caller.as_ref(), &task) {
        return Err(PolicyDenied::NotAssignee.into());
    }

    Ok(Json(task))
}

#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Task id")),
    request_body = TaskUpdateRequest,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 400, description = "Empty title"),
        (status = 403, description = "Not the assignee, or a non-status field was sent"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<TaskUpdateRequest>,
) -> AppResult<Json<Task>> {
    let principal = &auth.principal;
    let mut task = fetch_task(&state, &id).await?;
    let caller = load_caller(&state, principal).await?;

    let requested = payload.requested_fields();
    let decision = state.policy.can_update(principal, caller.as_ref(), &task, &requested);
    tracing::debug!(
        principal_id = %principal.id,
        task_id = %task.id,
        decision = ?decision,
        "task update check"
    );
    let allowed = decision.into_result()?;

    if allowed.is_empty() {
        return Ok(Json(task));
    }

    payload.apply_to(&mut task, &allowed)?;
    if task.title.trim().is_empty() {
        return Err(AppError::bad_request("title must not be empty"));
    }
    if task.assigned_to.trim().is_empty() {
        return Err(AppError::bad_request("assignedTo must not be empty"));
    }

    task.updated_at = utc_now();
    tasks::update_task(&state.pool, &task).await?;

    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if !state.policy.can_delete(&auth.principal) {
        return Err(PolicyDenied::NotAdmin.into());
    }

    if !tasks::delete_task(&state.pool, &id).await? {
        return Err(AppError::not_found("task not found"));
    }

    tracing::info!(task_id = %id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_task(state: &AppState, id: &str) -> AppResult<Task> {
    tasks::get_task(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("task not found"))
}

/// The caller's own record, used to match email and username references. Admins never need it.
async fn load_caller(state: &AppState, principal: &Principal) -> AppResult<Option<User>> {
    if principal.is_admin() {
        return Ok(None);
    }

    let record = users::get_user_by_id(&state.pool, &principal.id)
        .await
        .map_err(|err| {
            tracing::error!(principal_id = %principal.id, error = %err, "caller lookup failed");
            err
        })?;

    record.map(User::try_from).transpose()
}

/// Narrow the store read to rows that can possibly be visible: everything for admins, otherwise
/// only rows assigned to one of the caller's identifiers.
async fn candidate_tasks(state: &AppState, principal: &Principal, caller: Option<&User>) -> AppResult<Vec<Task>> {
    if principal.is_admin() {
        return tasks::list_tasks(&state.pool).await;
    }

    let mut keys = vec![principal.id.as_str()];
    if let Some(user) = caller {
        for key in identity::fallback_keys(user) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    let mut candidates = Vec::new();
    for key in keys {
        candidates.extend(tasks::query_tasks_by_assignee(&state.pool, key).await?);
    }
    Ok(candidates)
}
