//! 认证：注册、登录、请求认证、撤销 token

use super::crypto::sha256_hex;
use super::models::*;
use super::permissions::operations_for;
use super::UserManager;
use crate::dashboard::DashboardView;
use crate::error::{AuthError, Result};
use chrono::Utc;
use tracing::{info, instrument, warn};

impl UserManager {
    /// 注册新用户并签发 token
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse> {
        Self::require(&req.first_name, "first_name")?;
        Self::require(&req.last_name, "last_name")?;
        Self::require(&req.email, "email")?;
        Self::require(&req.password, "password")?;

        let email = Self::normalize_email(&req.email);
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AuthError::UserExists(email));
        }

        let password_hash = self.hasher.hash(&req.password).await?;
        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email,
            password_hash,
            role: req.role.unwrap_or_default(),
            department: req.department.filter(|d| !d.trim().is_empty()),
            phone_number: req.phone_number.filter(|p| !p.trim().is_empty()),
            is_active: true,
            last_login: None,
            reset_password_token_hash: None,
            reset_password_expiry: None,
            revoked_tokens: Vec::new(),
            token_generation: 0,
            created_at: Some(now),
            updated_at: Some(now),
        };

        // 插入时存储层再次检查邮箱唯一性
        let user = self.store.insert(user).await?;
        let token = self.tokens.issue(&user)?;

        info!(user_id = %user.id, role = %user.role, "registered user");
        Ok(AuthResponse {
            user: user.into(),
            token,
        })
    }

    /// 用户登录
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        Self::require(email, "email")?;
        Self::require(password, "password")?;

        let email = Self::normalize_email(email);
        let user = match self.store.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                warn!(email = %email, "login failed: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(password, &user.password_hash).await? {
            warn!(email = %email, "login failed: invalid password");
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            warn!(user_id = %user.id, "login failed: account deactivated");
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .update(
                &user.id,
                Box::new(|user| {
                    user.last_login = Some(Utc::now());
                    Ok(())
                }),
            )
            .await?;
        let token = self.tokens.issue(&user)?;

        info!(user_id = %user.id, "user logged in");
        Ok(AuthResponse {
            user: user.into(),
            token,
        })
    }

    /// 认证一次请求：验签 -> 查用户 -> 检查启用状态 -> 检查撤销
    pub async fn authenticate(&self, token: &str) -> Result<Identity> {
        let claims = self.tokens.validate(token)?;

        let user = self
            .store
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| AuthError::unauthenticated("user no longer exists"))?;

        if !user.is_active {
            return Err(AuthError::unauthenticated("account is deactivated"));
        }
        if user.has_revoked(&sha256_hex(token)) || claims.gen != user.token_generation {
            warn!(user_id = %user.id, "rejected revoked token");
            return Err(AuthError::unauthenticated("token revoked"));
        }

        Ok(Identity {
            user_id: user.id,
            email: user.email,
            role: user.role,
            department: user.department,
            token: token.to_string(),
        })
    }

    /// 撤销单个 token；重复撤销不产生新记录
    #[instrument(skip(self, token))]
    pub async fn revoke(&self, user_id: &str, token: &str) -> Result<()> {
        let token_hash = sha256_hex(token);
        let revoked_at = Utc::now();
        self.store
            .update(
                user_id,
                Box::new(move |user| {
                    if !user.has_revoked(&token_hash) {
                        user.revoked_tokens.push(RevokedToken {
                            token_hash,
                            revoked_at,
                        });
                    }
                    Ok(())
                }),
            )
            .await?;
        info!(user_id = %user_id, "token revoked");
        Ok(())
    }

    /// 撤销该用户所有已签发的 token
    #[instrument(skip(self))]
    pub async fn revoke_all(&self, user_id: &str) -> Result<()> {
        let user = self
            .store
            .update(
                user_id,
                Box::new(|user| {
                    user.token_generation = user.token_generation.saturating_add(1);
                    user.updated_at = Some(Utc::now());
                    Ok(())
                }),
            )
            .await?;
        info!(user_id = %user_id, generation = user.token_generation, "all tokens revoked");
        Ok(())
    }

    /// 当前用户资料及仪表盘
    pub async fn profile(&self, user_id: &str) -> Result<ProfileResponse> {
        let user = self.load_user(user_id).await?;
        let role = user.role;
        Ok(ProfileResponse {
            user: user.into(),
            dashboard: DashboardView::for_role(role),
            operations: operations_for(role),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::models::Role;
    use crate::store::CredentialStore;

    #[tokio::test]
    async fn issued_token_authenticates_until_revoked() {
        let (manager, _, _) = manager();
        let auth = manager.register(alice()).await.unwrap();

        let identity = manager.authenticate(&auth.token).await.unwrap();
        assert_eq!(identity.user_id, auth.user.id);
        assert_eq!(identity.role, Role::Member);

        manager.revoke(&auth.user.id, &auth.token).await.unwrap();
        let err = manager.authenticate(&auth.token).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated(ref m) if m == "token revoked"));
    }

    #[tokio::test]
    async fn revoking_one_token_keeps_others_valid() {
        let (manager, _, _) = manager();
        manager.register(alice()).await.unwrap();
        let a = manager.login("alice@x.com", "pw123456").await.unwrap();
        let b = manager.login("alice@x.com", "pw123456").await.unwrap();
        assert_ne!(a.token, b.token);

        manager.revoke(&a.user.id, &a.token).await.unwrap();
        assert!(manager.authenticate(&a.token).await.is_err());
        assert!(manager.authenticate(&b.token).await.is_ok());
    }

    #[tokio::test]
    async fn re_revoking_does_not_duplicate_entries() {
        let (manager, store, _) = manager();
        let auth = manager.register(alice()).await.unwrap();
        manager.revoke(&auth.user.id, &auth.token).await.unwrap();
        manager.revoke(&auth.user.id, &auth.token).await.unwrap();

        let user = store.find_by_id(&auth.user.id).await.unwrap().unwrap();
        assert_eq!(user.revoked_tokens.len(), 1);
        assert_ne!(user.revoked_tokens[0].token_hash, auth.token);
    }

    #[tokio::test]
    async fn concurrent_revocations_are_all_recorded() {
        let (manager, store, _) = manager();
        let auth = manager.register(alice()).await.unwrap();
        let mut tokens = Vec::new();
        for _ in 0..8 {
            tokens.push(manager.login("alice@x.com", "pw123456").await.unwrap().token);
        }

        let handles: Vec<_> = tokens
            .iter()
            .cloned()
            .map(|token| {
                let manager = manager.clone();
                let id = auth.user.id.clone();
                tokio::spawn(async move { manager.revoke(&id, &token).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let user = store.find_by_id(&auth.user.id).await.unwrap().unwrap();
        assert_eq!(user.revoked_tokens.len(), 8);
        for token in &tokens {
            assert!(manager.authenticate(token).await.is_err());
        }
        assert!(manager.authenticate(&auth.token).await.is_ok());
    }

    #[tokio::test]
    async fn revoke_all_invalidates_every_token() {
        let (manager, _, _) = manager();
        let a = manager.register(alice()).await.unwrap();
        let b = manager.login("alice@x.com", "pw123456").await.unwrap();

        manager.revoke_all(&a.user.id).await.unwrap();
        assert!(manager.authenticate(&a.token).await.is_err());
        assert!(manager.authenticate(&b.token).await.is_err());

        let c = manager.login("alice@x.com", "pw123456").await.unwrap();
        assert!(manager.authenticate(&c.token).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_registration_fails_without_new_document() {
        let (manager, store, _) = manager();
        manager.register(alice()).await.unwrap();

        let mut again = alice();
        again.email = "  Alice@X.com ".into();
        let err = manager.register(again).await.unwrap_err();
        assert!(matches!(err, AuthError::UserExists(_)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn registration_requires_fields() {
        let (manager, store, _) = manager();
        let mut req = alice();
        req.password = String::new();
        let err = manager.register(req).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingField("password")));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let (manager, _, _) = manager();
        manager.register(alice()).await.unwrap();

        let err = manager.login("alice@x.com", "nope").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        let err = manager.login("bob@x.com", "pw123456").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn login_records_last_login() {
        let (manager, _, _) = manager();
        manager.register(alice()).await.unwrap();
        let auth = manager.login("alice@x.com", "pw123456").await.unwrap();
        assert!(auth.user.last_login.is_some());
    }

    #[tokio::test]
    async fn deactivated_user_is_rejected() {
        let (manager, _, _) = manager();
        let auth = manager.register(alice()).await.unwrap();
        manager
            .update_user(
                &auth.user.id,
                UpdateUserRequest {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = manager.authenticate(&auth.token).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated(_)));
        let err = manager.login("alice@x.com", "pw123456").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn deleted_user_token_is_rejected() {
        let (manager, _, _) = manager();
        let auth = manager.register(alice()).await.unwrap();
        manager.delete_user(&auth.user.id).await.unwrap();
        assert!(manager.authenticate(&auth.token).await.is_err());
    }

    #[tokio::test]
    async fn profile_selects_dashboard_for_role() {
        let (manager, _, _) = manager();
        let mut req = alice();
        req.role = Some(Role::DeptLeader);
        let auth = manager.register(req).await.unwrap();

        let profile = manager.profile(&auth.user.id).await.unwrap();
        assert_eq!(profile.dashboard, DashboardView::Department);
        assert!(profile
            .operations
            .contains(&crate::user::Operation::SubmitReport));
    }
}
