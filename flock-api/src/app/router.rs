use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;
use flock_core::Operation;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    change_password, delete_user, forgot_password, get_user, handler_404, health, list_users,
    list_users_by_role, login, me, register, reset_password, revoke, revoke_all, update_user,
};
use super::middleware::{auth_middleware, role_guard};
use super::state::AppState;

/// 根据配置的来源列表构建 CorsLayer
fn build_cors_layer(cors_origins: Vec<String>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ])
        .allow_credentials(true);

    if cors_origins.is_empty() {
        tracing::warn!("FLOCK_CORS_ORIGINS not configured, allowing all origins");
        base.allow_origin(AllowOrigin::any())
            .allow_credentials(false) // any() 不能与 credentials(true) 共用
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .into_iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        base.allow_origin(origins)
    }
}

/// Build the router with routes and middleware wired.
pub fn app_router(state: AppState, cors_origins: Vec<String>) -> Router {
    // 公开端点（auth_middleware 按路径放行）
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/forgotpassword", post(forgot_password))
        .route("/api/auth/resetpassword/:resettoken", put(reset_password));

    // 任何已认证用户
    let session_routes = Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/auth/revoke", post(revoke))
        .route("/api/auth/revoke-all", post(revoke_all))
        .route("/api/auth/password", put(change_password));

    // 用户管理端点（仅 ADMIN）
    let admin_routes = Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/role/:role", get(list_users_by_role))
        .route(
            "/api/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route_layer(from_fn_with_state(Operation::ManageUsers, role_guard));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(admin_routes)
        .fallback(handler_404)
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors_origins))
        .with_state(state)
}
