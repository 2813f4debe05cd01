use flock_core::UserManager;
use std::sync::Arc;

/// Shared application state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserManager>,
    /// 重置密码链接的前缀；为空时从 Host 头推导
    pub public_url: Option<String>,
    /// 登录接口限流（按 IP）
    pub login_limiter: Arc<crate::app::RateLimiter>,
    /// 忘记密码接口限流（按 IP，防止邮件轰炸）
    pub reset_limiter: Arc<crate::app::RateLimiter>,
    /// Token 认证失败限流（按 IP）
    pub auth_limiter: Arc<crate::app::RateLimiter>,
    /// 部署在反向代理之后时为 true，此时才采信 X-Real-IP / X-Forwarded-For
    pub trust_proxy: bool,
}
