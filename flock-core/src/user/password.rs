//! 密码管理：修改密码、忘记密码、重置密码

use super::crypto::{generate_reset_token, sha256_hex};
use super::models::*;
use super::UserManager;
use crate::error::{AuthError, Result};
use crate::mailer::EmailMessage;
use crate::store::reset_hash_matches;
use chrono::Utc;
use tracing::{error, info, instrument, warn};

pub const RESET_EMAIL_SUBJECT: &str = "Password Reset Request - Church App";

fn reset_email_html(reset_url: &str, minutes: i64) -> String {
    format!(
        r#"
      <h3>Password Reset Request</h3>
      <p>You requested a password reset. Please click the link below to reset your password:</p>
      <a href="{reset_url}" target="_blank">Reset Password</a>
      <p>This link will expire in {minutes} minutes.</p>
      <p>If you did not request this, please ignore this email.</p>
    "#
    )
}

impl UserManager {
    /// 修改自己的密码（需要当前密码）；不会撤销已签发的 token
    #[instrument(skip(self, current_password, new_password))]
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<UserSummary> {
        Self::require(current_password, "current_password")?;
        Self::require(new_password, "new_password")?;

        let user = self.load_user(user_id).await?;
        if !self.hasher.verify(current_password, &user.password_hash).await? {
            warn!(user_id = %user_id, "password change rejected: wrong current password");
            return Err(AuthError::InvalidCredentials);
        }

        let password_hash = self.hasher.hash(new_password).await?;
        let user = self
            .store
            .update(
                user_id,
                Box::new(move |user| {
                    user.password_hash = password_hash;
                    user.updated_at = Some(Utc::now());
                    Ok(())
                }),
            )
            .await?;

        info!(user_id = %user_id, "password changed");
        Ok(user.into())
    }

    /// 发起重置：保存 token 摘要并发送含明文 token 的邮件。
    ///
    /// 邮件发送失败时清除刚写入的摘要与过期时间，再返回 `DeliveryFailure`。
    #[instrument(skip(self, reset_base_url))]
    pub async fn forgot_password(&self, email: &str, reset_base_url: &str) -> Result<()> {
        Self::require(email, "email")?;
        let email = Self::normalize_email(email);
        let user = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AuthError::NotFound("No user with that email".into()))?;

        let (plaintext, token_hash) = generate_reset_token();
        let expiry = Utc::now() + self.reset_token_ttl;
        let stored_hash = token_hash.clone();
        self.store
            .update(
                &user.id,
                Box::new(move |user| {
                    user.reset_password_token_hash = Some(stored_hash);
                    user.reset_password_expiry = Some(expiry);
                    Ok(())
                }),
            )
            .await?;

        let reset_url = format!(
            "{}/reset-password/{}",
            reset_base_url.trim_end_matches('/'),
            plaintext
        );
        let message = EmailMessage {
            to: user.email.clone(),
            subject: RESET_EMAIL_SUBJECT.to_string(),
            html: reset_email_html(&reset_url, self.reset_token_ttl.num_minutes()),
        };

        if let Err(err) = self.mailer.send(message).await {
            error!(user_id = %user.id, error = %err, "reset email failed, rolling back reset token");
            // 只清除本次写入的 token，不覆盖并发的新请求
            self.store
                .update(
                    &user.id,
                    Box::new(move |user| {
                        if user.reset_password_token_hash.as_deref() == Some(token_hash.as_str()) {
                            user.clear_reset_state();
                        }
                        Ok(())
                    }),
                )
                .await?;
            return Err(match err {
                AuthError::DeliveryFailure(msg) => AuthError::DeliveryFailure(msg),
                other => AuthError::DeliveryFailure(other.to_string()),
            });
        }

        info!(user_id = %user.id, "password reset email sent");
        Ok(())
    }

    /// 使用明文 token 重置密码，成功后签发新 token
    #[instrument(skip(self, reset_token, new_password))]
    pub async fn reset_password(
        &self,
        reset_token: &str,
        new_password: &str,
    ) -> Result<ResetPasswordResponse> {
        Self::require(new_password, "password")?;
        if reset_token.trim().is_empty() {
            return Err(AuthError::InvalidOrExpiredToken);
        }

        let token_hash = sha256_hex(reset_token);
        let user = self
            .store
            .find_by_reset_token_hash(&token_hash, Utc::now())
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        let password_hash = self.hasher.hash(new_password).await?;
        // 在原子更新内再次校验，保证 token 只能使用一次
        let user = self
            .store
            .update(
                &user.id,
                Box::new(move |user| {
                    if !reset_hash_matches(user, &token_hash, Utc::now()) {
                        return Err(AuthError::InvalidOrExpiredToken);
                    }
                    user.password_hash = password_hash;
                    user.clear_reset_state();
                    user.updated_at = Some(Utc::now());
                    Ok(())
                }),
            )
            .await?;

        let token = self.tokens.issue(&user)?;
        info!(user_id = %user.id, "password reset completed");
        Ok(ResetPasswordResponse {
            message: "Password reset successful".into(),
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::store::CredentialStore;
    use chrono::Duration;

    /// 从邮件中取出明文 token
    fn token_from(html: &str) -> String {
        let start = html.find("/reset-password/").unwrap() + "/reset-password/".len();
        html[start..].chars().take_while(|c| c.is_ascii_hexdigit()).collect()
    }

    #[tokio::test]
    async fn reset_round_trip_succeeds_exactly_once() {
        let (manager, store, mailer) = manager();
        let auth = manager.register(alice()).await.unwrap();

        manager
            .forgot_password("alice@x.com", "http://church.local/")
            .await
            .unwrap();
        let email = mailer.last().unwrap();
        assert_eq!(email.to, "alice@x.com");
        assert_eq!(email.subject, RESET_EMAIL_SUBJECT);
        assert!(email.html.contains("http://church.local/reset-password/"));
        let plaintext = token_from(&email.html);

        let stored = store.find_by_id(&auth.user.id).await.unwrap().unwrap();
        assert_eq!(
            stored.reset_password_token_hash.as_deref(),
            Some(sha256_hex(&plaintext).as_str())
        );
        assert!(!serde_json::to_string(&stored).unwrap().contains(&plaintext));

        let reset = manager.reset_password(&plaintext, "newpass99").await.unwrap();
        assert_eq!(reset.message, "Password reset successful");
        assert!(manager.authenticate(&reset.token).await.is_ok());

        let stored = store.find_by_id(&auth.user.id).await.unwrap().unwrap();
        assert!(stored.reset_password_token_hash.is_none());
        assert!(stored.reset_password_expiry.is_none());

        let err = manager
            .reset_password(&plaintext, "another1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredToken));

        assert!(manager.login("alice@x.com", "newpass99").await.is_ok());
        assert!(manager.login("alice@x.com", "pw123456").await.is_err());
    }

    #[tokio::test]
    async fn expired_reset_token_is_rejected() {
        let (manager, store, mailer) = manager();
        let auth = manager.register(alice()).await.unwrap();
        manager
            .forgot_password("alice@x.com", "http://church.local")
            .await
            .unwrap();
        let plaintext = token_from(&mailer.last().unwrap().html);

        // 把过期时间拨回 11 分钟前
        store
            .update(
                &auth.user.id,
                Box::new(|user| {
                    user.reset_password_expiry = Some(Utc::now() - Duration::minutes(11));
                    Ok(())
                }),
            )
            .await
            .unwrap();

        let err = manager
            .reset_password(&plaintext, "newpass99")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredToken));
        assert!(manager.login("alice@x.com", "pw123456").await.is_ok());
    }

    #[tokio::test]
    async fn zero_ttl_token_is_already_expired() {
        let (manager, _, mailer) = manager();
        let manager = manager.with_reset_ttl(Duration::zero());
        manager.register(alice()).await.unwrap();
        manager
            .forgot_password("alice@x.com", "http://church.local")
            .await
            .unwrap();
        let plaintext = token_from(&mailer.last().unwrap().html);
        let err = manager
            .reset_password(&plaintext, "newpass99")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn unknown_email_is_not_found_and_store_untouched() {
        let (manager, store, mailer) = manager();
        let auth = manager.register(alice()).await.unwrap();
        let before = serde_json::to_string(&store.find_by_id(&auth.user.id).await.unwrap()).unwrap();

        let err = manager
            .forgot_password("ghost@x.com", "http://church.local")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotFound(ref m) if m == "No user with that email"));
        assert!(mailer.sent().is_empty());

        let after = serde_json::to_string(&store.find_by_id(&auth.user.id).await.unwrap()).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn delivery_failure_rolls_back_reset_state() {
        let (manager, store, mailer) = manager();
        let auth = manager.register(alice()).await.unwrap();
        mailer.set_failing(true);

        let err = manager
            .forgot_password("alice@x.com", "http://church.local")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DeliveryFailure(_)));

        let stored = store.find_by_id(&auth.user.id).await.unwrap().unwrap();
        assert!(stored.reset_password_token_hash.is_none());
        assert!(stored.reset_password_expiry.is_none());
    }

    #[tokio::test]
    async fn second_request_supersedes_first_token() {
        let (manager, _, mailer) = manager();
        manager.register(alice()).await.unwrap();
        manager.forgot_password("alice@x.com", "http://h").await.unwrap();
        let first = token_from(&mailer.last().unwrap().html);
        manager.forgot_password("alice@x.com", "http://h").await.unwrap();
        let second = token_from(&mailer.last().unwrap().html);

        assert!(matches!(
            manager.reset_password(&first, "x").await.unwrap_err(),
            AuthError::InvalidOrExpiredToken
        ));
        assert!(manager.reset_password(&second, "x").await.is_ok());
    }

    #[tokio::test]
    async fn change_password_requires_current_password() {
        let (manager, _, _) = manager();
        let auth = manager.register(alice()).await.unwrap();

        let err = manager
            .change_password(&auth.user.id, "wrong", "newpass99")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        manager
            .change_password(&auth.user.id, "pw123456", "newpass99")
            .await
            .unwrap();
        assert!(manager.login("alice@x.com", "newpass99").await.is_ok());
        // 修改密码不会撤销已有 token
        assert!(manager.authenticate(&auth.token).await.is_ok());
    }
}
