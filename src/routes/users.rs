use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::db::users;
use crate::errors::AppResult;
use crate::jwt::AuthUser;
use crate::models::user::UserSummary;

/// Minimal directory for picking assignees. Any signed-in caller may read it.
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "User directory", body = [UserSummary]))
)]
pub async fn list_users(State(state): State<AppState>, _auth: AuthUser) -> AppResult<Json<Vec<UserSummary>>> {
    let users = users::list_users(&state.pool).await?;
    Ok(Json(users.into_iter().map(UserSummary::from).collect()))
}
