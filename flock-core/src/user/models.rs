//! 用户数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::permissions::Operation;
use crate::dashboard::DashboardView;
use crate::models::Role;

/// 已撤销的 token 记录（只保存 token 的 SHA-256 摘要）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevokedToken {
    pub token_hash: String,
    pub revoked_at: DateTime<Utc>,
}

/// 用户账户（存储模型，包含密码哈希）
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// 用户唯一 ID (UUID)
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// 邮箱（唯一，用于登录）
    pub email: String,
    /// bcrypt 哈希后的密码
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    /// 所属部门 ID
    pub department: Option<String>,
    pub phone_number: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    /// 重置密码 token 的 SHA-256 摘要，与 expiry 同时设置、同时清除
    pub reset_password_token_hash: Option<String>,
    pub reset_password_expiry: Option<DateTime<Utc>>,
    /// 主动撤销的 token（只追加）
    #[serde(default)]
    pub revoked_tokens: Vec<RevokedToken>,
    /// Token 代数，revoke_all 时递增
    #[serde(default)]
    pub token_generation: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl User {
    /// 是否已撤销指定 token 摘要
    pub fn has_revoked(&self, token_hash: &str) -> bool {
        self.revoked_tokens
            .iter()
            .any(|entry| entry.token_hash == token_hash)
    }

    pub(crate) fn clear_reset_state(&mut self) {
        self.reset_password_token_hash = None;
        self.reset_password_expiry = None;
    }
}

/// 注册请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// 登录请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// 忘记密码请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

/// 重置密码请求（token 来自路径）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub password: String,
}

/// 修改密码请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// 管理员更新用户请求，未提供的字段保持不变
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub department: Option<String>,
    pub phone_number: Option<String>,
    pub is_active: Option<bool>,
}

/// JWT Claims：只绑定用户 ID，没有 exp
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject: 用户 ID
    pub sub: String,
    /// 随机 ID，保证同一秒内签发的 token 互不相同
    pub jti: String,
    /// Token 代数
    #[serde(default)]
    pub gen: u64,
    /// 签发时间戳，仅供参考，不参与过期判断
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// 通过认证后附加在请求上的身份
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub department: Option<String>,
    /// 本次请求出示的 token 原文
    pub token: String,
}

/// 用户信息（不含敏感字段）
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub department: Option<String>,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
            department: user.department,
            phone_number: user.phone_number,
            is_active: user.is_active,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

/// 注册 / 登录响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: UserSummary,
    pub token: String,
}

/// 重置密码响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordResponse {
    pub message: String,
    pub token: String,
}

/// 当前用户信息及其对应的仪表盘
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserSummary,
    pub dashboard: DashboardView,
    /// 该角色可执行的操作
    pub operations: Vec<Operation>,
}
