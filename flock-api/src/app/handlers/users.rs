//! 用户管理 API handlers（仅管理员可访问，由路由上的 role_guard 检查）

use axum::extract::{Path, State};
use axum::Json;
use flock_core::{Role, UpdateUserRequest, UserSummary};
use serde_json::{json, Value};

use super::super::error::ApiError;
use super::super::state::AppState;

fn summaries(users: Vec<flock_core::User>) -> Vec<UserSummary> {
    users.into_iter().map(UserSummary::from).collect()
}

/// GET /api/users - 列出所有用户
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let users = state.users.list_users(None).await?;
    Ok(Json(summaries(users)))
}

/// GET /api/users/role/:role - 按角色列出用户
pub async fn list_users_by_role(
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let role: Role = role.parse()?;
    let users = state.users.list_users(Some(role)).await?;
    Ok(Json(summaries(users)))
}

/// GET /api/users/:id - 获取用户详情
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserSummary>, ApiError> {
    let user = state.users.get_user(&id).await?;
    Ok(Json(user.into()))
}

/// PUT /api/users/:id - 更新用户
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserSummary>, ApiError> {
    let user = state.users.update_user(&id, req).await?;
    Ok(Json(user.into()))
}

/// DELETE /api/users/:id - 删除用户
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.users.delete_user(&id).await?;
    Ok(Json(json!({ "message": "User removed successfully" })))
}
