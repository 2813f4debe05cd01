//! 用户管理器：核心结构和管理员用户 CRUD

use super::crypto::CredentialHasher;
use super::models::*;
use super::token::TokenService;
use crate::error::{AuthError, Result};
use crate::mailer::EmailDispatcher;
use crate::models::Role;
use crate::store::CredentialStore;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

/// 重置密码 token 默认有效期：10 分钟
pub const DEFAULT_RESET_TOKEN_TTL_SECS: i64 = 10 * 60;

/// 用户管理器：认证核心的统一入口
#[derive(Clone)]
pub struct UserManager {
    pub(super) store: Arc<dyn CredentialStore>,
    pub(super) hasher: Arc<dyn CredentialHasher>,
    pub(super) tokens: TokenService,
    pub(super) mailer: Arc<dyn EmailDispatcher>,
    /// 重置密码 token 有效期
    pub(super) reset_token_ttl: Duration,
}

// ============================================================================
// 构造器和配置
// ============================================================================

impl UserManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: TokenService,
        mailer: Arc<dyn EmailDispatcher>,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
            mailer,
            reset_token_ttl: Duration::seconds(DEFAULT_RESET_TOKEN_TTL_SECS),
        }
    }

    /// 配置重置 token 有效期
    pub fn with_reset_ttl(mut self, ttl: Duration) -> Self {
        self.reset_token_ttl = ttl;
        self
    }
}

// ============================================================================
// 内部辅助方法
// ============================================================================

impl UserManager {
    /// 邮箱统一去空格并转小写
    pub(super) fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// 字段存在性校验（唯一的输入校验）
    pub(super) fn require(value: &str, field: &'static str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(AuthError::MissingField(field));
        }
        Ok(())
    }

    pub(super) async fn load_user(&self, id: &str) -> Result<User> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".into()))
    }
}

/// 非空字符串才覆盖原值
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// 用户 CRUD 操作（管理员）
// ============================================================================

impl UserManager {
    /// 获取用户
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: &str) -> Result<User> {
        self.load_user(id).await
    }

    /// 列出用户，可按角色过滤；按创建时间排序
    #[instrument(skip(self))]
    pub async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
        let mut users: Vec<User> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|u| role.map(|r| u.role == r).unwrap_or(true))
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    /// 最近创建的用户
    pub async fn latest_user(&self) -> Result<Option<User>> {
        Ok(self.list_users(None).await?.pop())
    }

    /// 更新用户资料（空字段保持不变）
    #[instrument(skip(self, req))]
    pub async fn update_user(&self, id: &str, req: UpdateUserRequest) -> Result<User> {
        let email = non_empty(req.email).map(|e| Self::normalize_email(&e));
        let first_name = non_empty(req.first_name);
        let last_name = non_empty(req.last_name);
        let department = non_empty(req.department);
        let phone_number = non_empty(req.phone_number);
        let role = req.role;
        let is_active = req.is_active;

        let user = self
            .store
            .update(
                id,
                Box::new(move |user| {
                    if let Some(v) = first_name {
                        user.first_name = v;
                    }
                    if let Some(v) = last_name {
                        user.last_name = v;
                    }
                    if let Some(v) = email {
                        user.email = v;
                    }
                    if let Some(v) = role {
                        user.role = v;
                    }
                    if let Some(v) = department {
                        user.department = Some(v);
                    }
                    if let Some(v) = phone_number {
                        user.phone_number = Some(v);
                    }
                    if let Some(v) = is_active {
                        user.is_active = v;
                    }
                    user.updated_at = Some(Utc::now());
                    Ok(())
                }),
            )
            .await?;

        info!(user_id = %id, "updated user");
        Ok(user)
    }

    /// 删除用户（不级联其他实体）
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        self.store.delete(id).await?;
        info!(user_id = %id, "deleted user");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn list_users_filters_by_role() {
        let (manager, _, _) = manager();
        manager.register(alice()).await.unwrap();
        let mut bishop = alice();
        bishop.email = "bishop@x.com".into();
        bishop.role = Some(Role::Bishop);
        manager.register(bishop).await.unwrap();

        assert_eq!(manager.list_users(None).await.unwrap().len(), 2);
        let bishops = manager.list_users(Some(Role::Bishop)).await.unwrap();
        assert_eq!(bishops.len(), 1);
        assert_eq!(bishops[0].email, "bishop@x.com");
        assert_eq!(
            manager.latest_user().await.unwrap().unwrap().email,
            "bishop@x.com"
        );
    }

    #[tokio::test]
    async fn update_user_keeps_blank_fields_and_rejects_taken_email() {
        let (manager, _, _) = manager();
        let a = manager.register(alice()).await.unwrap();
        let mut bob = alice();
        bob.email = "bob@x.com".into();
        manager.register(bob).await.unwrap();

        let updated = manager
            .update_user(
                &a.user.id,
                UpdateUserRequest {
                    first_name: Some("  ".into()),
                    role: Some(Role::Overseer),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Alice");
        assert_eq!(updated.role, Role::Overseer);

        let err = manager
            .update_user(
                &a.user.id,
                UpdateUserRequest {
                    email: Some("BOB@x.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserExists(_)));
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let (manager, _, _) = manager();
        assert!(matches!(
            manager.get_user("nope").await.unwrap_err(),
            AuthError::NotFound(_)
        ));
        assert!(matches!(
            manager.delete_user("nope").await.unwrap_err(),
            AuthError::NotFound(_)
        ));
    }
}
