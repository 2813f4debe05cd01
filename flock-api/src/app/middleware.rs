use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use flock_core::user::authorize;
use flock_core::{Identity, Operation};

use super::error::ApiError;
use super::state::AppState;

/// 不需要认证的路径
const PUBLIC_PATHS: &[&str] = &[
    "/health",
    "/api/auth/register",
    "/api/auth/login",
    "/api/auth/forgotpassword",
];

/// 重置密码路径带 token 参数，按前缀匹配
const PUBLIC_PREFIXES: &[&str] = &["/api/auth/resetpassword/"];

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|p| path == *p)
        || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// 从 Authorization 头提取 Bearer token；缺失或格式错误返回 None
pub fn extract_bearer(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// 提取客户端 IP
/// trust_proxy 时优先级：X-Real-IP > X-Forwarded-For（第一个） > Socket Address；
/// 否则代理头可由客户端伪造，只用 Socket Address
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    let peer_ip = || {
        peer.map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    };
    if !trust_proxy {
        return peer_ip();
    }

    if let Some(real_ip) = headers
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
    {
        return real_ip.to_string();
    }

    if let Some(forwarded) = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first_ip) = forwarded.split(',').next().map(|s| s.trim()) {
            if !first_ip.is_empty() {
                return first_ip.to_string();
            }
        }
    }

    peer_ip()
}

fn request_client_ip(request: &Request<Body>, trust_proxy: bool) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    client_ip(request.headers(), peer, trust_proxy)
}

/// 认证中间件：NoToken -> TokenPresent -> Lookup -> RevocationCheck -> Authenticated
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path().to_string();

    if is_public(&path) {
        return Ok(next.run(request).await);
    }

    let client_ip = request_client_ip(&request, state.trust_proxy);
    let token = match extract_bearer(&request) {
        Some(t) => t,
        None => {
            if !state.auth_limiter.allow(&client_ip).await {
                tracing::warn!(ip = %client_ip, path = %path, "auth rate limit hit (no token)");
                return Err(ApiError::too_many_requests(
                    "too many requests, try again later",
                ));
            }
            return Err(ApiError::unauthenticated());
        }
    };

    let identity = match state.users.authenticate(&token).await {
        Ok(identity) => identity,
        Err(err) => {
            if !state.auth_limiter.allow(&client_ip).await {
                tracing::warn!(ip = %client_ip, path = %path, "auth rate limit hit (bad token)");
                return Err(ApiError::too_many_requests(
                    "too many requests, try again later",
                ));
            }
            tracing::debug!(ip = %client_ip, path = %path, error = %err, "authentication failed");
            return Err(err.into());
        }
    };

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// 角色守卫：作为 route_layer 挂在声明了允许角色的路由上
pub async fn role_guard(
    State(operation): State<Operation>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .ok_or_else(ApiError::unauthenticated)?;

    if let Err(err) = authorize(identity.role, operation.allowed_roles()) {
        tracing::warn!(
            user_id = %identity.user_id,
            role = %identity.role,
            operation = ?operation,
            "forbidden"
        );
        return Err(err.into());
    }
    Ok(next.run(request).await)
}
