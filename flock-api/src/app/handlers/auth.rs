//! 认证相关 API handlers

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::{Extension, Json};
use flock_core::{
    AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, Identity, LoginRequest,
    ProfileResponse, RegisterRequest, ResetPasswordRequest, ResetPasswordResponse, UserSummary,
};
use serde_json::{json, Value};
use std::net::SocketAddr;

use super::super::error::ApiError;
use super::super::middleware::client_ip;
use super::super::state::AppState;

/// 重置链接的前缀：优先使用配置的公开地址，否则从 Host 头推导
fn reset_base_url(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(url) = &state.public_url {
        return Ok(url.clone());
    }
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ApiError::bad_request("Host header is required"))?;
    Ok(format!("http://{host}"))
}

/// POST /api/auth/register - 注册
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let auth = state.users.register(req).await?;
    Ok((StatusCode::CREATED, Json(auth)))
}

/// POST /api/auth/login - 用户登录
pub async fn login(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let ip = client_ip(&headers, connect.map(|c| c.0), state.trust_proxy);
    if !state.login_limiter.allow(&ip).await {
        return Err(ApiError::too_many_requests(
            "too many login attempts, try again later",
        ));
    }

    let auth = state.users.login(&req.email, &req.password).await?;
    state.login_limiter.forget(&ip).await;
    Ok(Json(auth))
}

/// POST /api/auth/forgotpassword - 发送重置邮件
pub async fn forgot_password(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let ip = client_ip(&headers, connect.map(|c| c.0), state.trust_proxy);
    if !state.reset_limiter.allow(&ip).await {
        return Err(ApiError::too_many_requests(
            "too many reset requests, try again later",
        ));
    }

    let base = reset_base_url(&state, &headers)?;
    state.users.forgot_password(&req.email, &base).await?;
    Ok(Json(json!({ "message": "Email sent successfully" })))
}

/// PUT /api/auth/resetpassword/:resettoken - 使用重置 token 设置新密码
pub async fn reset_password(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<ResetPasswordResponse>, ApiError> {
    let resp = state
        .users
        .reset_password(&reset_token, &req.password)
        .await?;
    Ok(Json(resp))
}

/// POST /api/auth/revoke - 撤销当前请求使用的 token
pub async fn revoke(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, ApiError> {
    state
        .users
        .revoke(&identity.user_id, &identity.token)
        .await?;
    Ok(Json(json!({ "message": "Token revoked successfully" })))
}

/// POST /api/auth/revoke-all - 撤销当前用户的所有 token
pub async fn revoke_all(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, ApiError> {
    state.users.revoke_all(&identity.user_id).await?;
    Ok(Json(json!({ "message": "All tokens revoked successfully" })))
}

/// PUT /api/auth/password - 修改自己的密码
pub async fn change_password(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<UserSummary>, ApiError> {
    let user = state
        .users
        .change_password(&identity.user_id, &req.current_password, &req.new_password)
        .await?;
    Ok(Json(user))
}

/// GET /api/auth/me - 当前用户信息
pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.users.profile(&identity.user_id).await?;
    Ok(Json(profile))
}
