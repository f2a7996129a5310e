use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Duration;

use crate::app::AppState;
use crate::db::users::{self, NewUser};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::user::{
    AuthResponse, ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest, ResetPasswordRequest, Role,
    SignupRequest, User,
};
use crate::routes::MessageResponse;
use crate::utils::{generate_reset_token, hash_password, hash_reset_token, new_id, utc_now, verify_password};

const FORGOT_PASSWORD_MESSAGE: &str = "If an account exists, a reset token has been issued";

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "Auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Missing email or weak password"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let email = payload.email.trim();
    if email.is_empty() {
        return Err(AppError::bad_request("email is required"));
    }

    if users::email_in_use(&state.pool, email).await? {
        return Err(AppError::conflict("email already in use"));
    }

    let password_hash = hash_password(&payload.password)?;
    let role = Role::from_signup(payload.role.as_deref());
    let user_id = new_id();
    let username = payload.username.as_deref().map(str::trim).filter(|name| !name.is_empty());

    users::insert_user(
        &state.pool,
        NewUser {
            id: &user_id,
            username,
            email,
            password_hash: &password_hash,
            role,
            created_at: utc_now(),
        },
    )
    .await?;

    let user = fetch_user(&state, &user_id).await?;
    let token = state.jwt.encode(&user.id, user.role)?;
    tracing::info!(user_id = %user.id, role = %user.role, "user signed up");

    Ok((StatusCode::CREATED, Json(AuthResponse::new(user, token))))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let db_user = users::find_user_by_email(&state.pool, payload.email.trim())
        .await?
        .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    let password_ok = verify_password(&payload.password, &db_user.password_hash)?;
    if !password_ok {
        tracing::warn!(user_id = %db_user.id, "login with wrong password");
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let user: User = db_user.try_into()?;
    let token = state.jwt.encode(&user.id, user.role)?;

    Ok(Json(AuthResponse::new(user, token)))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Missing, invalid or expired token")
    )
)]
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<User>> {
    let user = fetch_user(&state, &auth.principal.id).await?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordRequest,
    responses((status = 200, description = "Reset requested", body = ForgotPasswordResponse))
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ForgotPasswordResponse>> {
    // Same answer whether or not the account exists.
    let Some(db_user) = users::find_user_by_email(&state.pool, payload.email.trim()).await? else {
        return Ok(Json(ForgotPasswordResponse {
            message: FORGOT_PASSWORD_MESSAGE.to_string(),
            reset_token: None,
        }));
    };

    let token = generate_reset_token();
    let expires_at = utc_now() + Duration::minutes(state.password_reset.ttl_minutes);
    users::set_reset_token(&state.pool, &db_user.id, &hash_reset_token(&token), expires_at).await?;
    tracing::info!(user_id = %db_user.id, "password reset token issued");

    let reset_token = state.password_reset.expose_token.then_some(token);
    Ok(Json(ForgotPasswordResponse {
        message: FORGOT_PASSWORD_MESSAGE.to_string(),
        reset_token,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password has been reset", body = MessageResponse),
        (status = 400, description = "Missing fields, unknown or expired token")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let (token, password) = match (payload.token.as_deref(), payload.password.as_deref()) {
        (Some(token), Some(password)) if !token.is_empty() && !password.is_empty() => (token, password),
        _ => return Err(AppError::bad_request("token and new password are required")),
    };

    let db_user = users::find_user_by_reset_token_hash(&state.pool, &hash_reset_token(token))
        .await?
        .ok_or_else(|| AppError::bad_request("invalid or expired token"))?;

    let still_valid = db_user
        .reset_token_expires_at
        .is_some_and(|expires_at| expires_at > utc_now());
    if !still_valid {
        return Err(AppError::bad_request("token has expired"));
    }

    let password_hash = hash_password(password)?;
    users::reset_password(&state.pool, &db_user.id, &password_hash).await?;
    tracing::info!(user_id = %db_user.id, "password reset");

    Ok(Json(MessageResponse::new("Password has been reset")))
}

async fn fetch_user(state: &AppState, user_id: &str) -> AppResult<User> {
    users::get_user_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?
        .try_into()
}
