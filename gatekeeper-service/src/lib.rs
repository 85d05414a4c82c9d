pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::State,
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::GatekeeperConfig;
use crate::services::{
    Database, PermissionGroupService, PermissionService, ServiceRegistry, TokenService,
    UserService,
};
use crate::utils::Argon2Hasher;
use gatekeeper_core::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: GatekeeperConfig,
    pub db: Database,
    pub tokens: TokenService,
    pub users: UserService,
    pub registry: ServiceRegistry,
    pub permissions: PermissionService,
    pub groups: PermissionGroupService,
}

impl AppState {
    /// Wire all services against the PostgreSQL-backed repositories.
    pub fn new(config: GatekeeperConfig, db: Database) -> Self {
        let repo = Arc::new(db.clone());
        let tokens = TokenService::new(&config.token);
        let users = UserService::new(repo.clone(), Arc::new(Argon2Hasher));
        let registry = ServiceRegistry::new(repo.clone());
        let permissions = PermissionService::new(repo.clone());
        let groups = PermissionGroupService::new(repo);

        Self {
            config,
            db,
            tokens,
            users,
            registry,
            permissions,
            groups,
        }
    }
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    // Everything past login requires a bearer token.
    let protected = Router::new()
        .route(
            "/users/me",
            get(handlers::user::get_me).delete(handlers::user::delete_me),
        )
        .route("/users/me/password", post(handlers::user::change_password))
        .route(
            "/groups",
            post(handlers::group::create_group).get(handlers::group::search_groups),
        )
        .route(
            "/groups/:group_id",
            get(handlers::group::get_group)
                .put(handlers::group::update_group)
                .delete(handlers::group::delete_group),
        )
        .route(
            "/groups/:group_id/permissions",
            post(handlers::group::add_permissions).delete(handlers::group::remove_permissions),
        )
        .route(
            "/groups/:group_id/members/:user_id",
            post(handlers::group::add_member).delete(handlers::group::remove_member),
        )
        .route("/authz/check", get(handlers::authz::check_permission))
        .route(
            "/services",
            post(handlers::service::create_service).get(handlers::service::list_services),
        )
        .route(
            "/services/:service_id",
            get(handlers::service::get_service)
                .patch(handlers::service::update_service)
                .delete(handlers::service::delete_service),
        )
        .route(
            "/services/:service_id/permissions",
            put(handlers::service::sync_permissions),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .security
                .allowed_origins
                .iter()
                .filter_map(|origin| {
                    origin
                        .parse::<HeaderValue>()
                        .map_err(|e| {
                            tracing::error!("Invalid CORS origin '{}': {}", origin, e);
                            e
                        })
                        .ok()
                })
                .collect::<Vec<HeaderValue>>(),
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .merge(protected)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(cors);

    Ok(app)
}

/// Service health check.
///
/// GET /health
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Database health check failed");
        e
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "checks": {
            "postgres": "up"
        }
    })))
}
