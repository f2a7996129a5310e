use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{DefaultPolicyEvaluator, PolicyEvaluator};
use crate::config::{AppConfig, PasswordResetConfig};
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{auth, health, tasks, users};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub policy: Arc<dyn PolicyEvaluator>,
    pub password_reset: Arc<PasswordResetConfig>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, password_reset: PasswordResetConfig) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
            policy: Arc::new(DefaultPolicyEvaluator::new()),
            password_reset: Arc::new(password_reset),
        }
    }
}

pub async fn create_app(pool: SqlitePool, config: &AppConfig) -> Result<Router, AppError> {
    let state = AppState::new(pool, config.jwt.clone(), config.password_reset.clone());
    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password));

    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/:id",
            get(tasks::get_task).put(tasks::update_task).delete(tasks::delete_task),
        );

    let user_routes = Router::new().route("/", get(users::list_users));

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/api/auth", auth_routes)
        .nest("/api/tasks", task_routes)
        .nest("/api/users", user_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
