//! 直接操作数据目录的维护命令（不经过 HTTP API）

use super::auth::print_token_hint;
use super::output::print_json;
use super::ui::{print_header, print_kv, print_success, print_user, print_warning};
use super::OutputFormat;
use flock_core::{
    AuthError, AuthResponse, BcryptHasher, DisabledMailer, FileStore, JwtSigner, RegisterRequest,
    Role, TokenService, UserManager, UserSummary,
};
use std::path::Path;
use std::sync::Arc;

/// 签名配置，需与 API 的 FLOCK_JWT_SECRET / FLOCK_JWT_ISSUER / FLOCK_JWT_AUDIENCE 一致，
/// 本地签发的 token 才能被 API 接受
#[derive(Debug, Clone)]
pub struct SigningConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

impl SigningConfig {
    fn signer(&self) -> JwtSigner {
        JwtSigner::new(&self.secret).with_claims_context(self.issuer.clone(), self.audience.clone())
    }
}

/// 基于数据目录构建 UserManager
fn local_manager(data_dir: &Path, signing: &SigningConfig) -> anyhow::Result<UserManager> {
    let store = Arc::new(FileStore::new(data_dir));
    store.ensure_dirs()?;
    Ok(UserManager::new(
        store,
        Arc::new(BcryptHasher::default()),
        TokenService::new(Arc::new(signing.signer())),
        Arc::new(DisabledMailer),
    ))
}

/// 创建管理员账户；邮箱已存在时不做修改并返回 None
pub async fn create_admin(
    data_dir: &Path,
    signing: &SigningConfig,
    req: RegisterRequest,
    output: OutputFormat,
) -> anyhow::Result<Option<AuthResponse>> {
    let manager = local_manager(data_dir, signing)?;
    let req = RegisterRequest {
        role: Some(Role::Admin),
        ..req
    };
    let email = req.email.clone();

    match manager.register(req).await {
        Ok(auth) => {
            if !print_json(&auth, output)? {
                print_header("🛡 管理员已创建");
                print_user(&auth.user);
                print_token_hint(&auth.token);
                println!();
            }
            Ok(Some(auth))
        }
        Err(AuthError::UserExists(_)) => {
            print_warning(&format!("{} 已存在，未做修改", email));
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// 显示最近创建的用户
pub async fn latest_user(
    data_dir: &Path,
    signing: &SigningConfig,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let manager = local_manager(data_dir, signing)?;
    let Some(user) = manager.latest_user().await? else {
        print_warning("数据目录中没有用户");
        return Ok(());
    };
    let summary = UserSummary::from(user);

    if print_json(&summary, output)? {
        return Ok(());
    }
    print_header("🕒 最近创建的用户");
    print_user(&summary);
    print_kv("Data dir", &data_dir.display().to_string());
    println!();
    print_success("done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn admin_request() -> RegisterRequest {
        RegisterRequest {
            first_name: "Super".into(),
            last_name: "Admin".into(),
            email: "admin@test.com".into(),
            password: "password123".into(),
            ..Default::default()
        }
    }

    fn signing() -> SigningConfig {
        SigningConfig {
            secret: "secret".into(),
            issuer: "church-api".into(),
            audience: "church-web".into(),
        }
    }

    #[tokio::test]
    async fn create_admin_is_idempotent_and_latest_user_sees_it() {
        let dir = TempDir::new().unwrap();
        let first = create_admin(dir.path(), &signing(), admin_request(), OutputFormat::Json)
            .await
            .unwrap();
        assert!(first.is_some());
        let second = create_admin(dir.path(), &signing(), admin_request(), OutputFormat::Json)
            .await
            .unwrap();
        assert!(second.is_none());

        let manager = local_manager(dir.path(), &signing()).unwrap();
        let users = manager.list_users(None).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::Admin);
        assert!(manager.login("admin@test.com", "password123").await.is_ok());

        latest_user(dir.path(), &signing(), OutputFormat::Json)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn admin_token_carries_configured_signing_context() {
        let dir = TempDir::new().unwrap();
        let auth = create_admin(dir.path(), &signing(), admin_request(), OutputFormat::Json)
            .await
            .unwrap()
            .unwrap();

        let api_side = TokenService::new(Arc::new(signing().signer()));
        let claims = api_side.validate(&auth.token).unwrap();
        assert_eq!(claims.sub, auth.user.id);

        let other_audience = SigningConfig {
            audience: "someone-else".into(),
            ..signing()
        };
        assert!(TokenService::new(Arc::new(other_audience.signer()))
            .validate(&auth.token)
            .is_err());
        let other_secret = SigningConfig {
            secret: "other".into(),
            ..signing()
        };
        assert!(TokenService::new(Arc::new(other_secret.signer()))
            .validate(&auth.token)
            .is_err());
    }
}
