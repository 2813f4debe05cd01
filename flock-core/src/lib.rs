//! 教会管理后台的认证与授权核心。
//!
//! 包含凭据存储、可撤销的 Bearer token、密码重置以及角色权限策略。

pub mod dashboard;
mod error;
pub mod mailer;
mod models;
pub mod store;
pub mod user;

pub use dashboard::DashboardView;
pub use error::{AuthError, Result};
pub use mailer::{DisabledMailer, EmailDispatcher, EmailMessage, MemoryMailer, SmtpConfig, SmtpMailer};
pub use models::Role;
pub use store::{CredentialStore, FileStore, MemoryStore};
pub use user::{
    AuthResponse, BcryptHasher, ChangePasswordRequest, CredentialHasher, ForgotPasswordRequest,
    Identity, JwtSigner, LoginRequest, Operation, ProfileResponse, RegisterRequest,
    ResetPasswordRequest, ResetPasswordResponse, TokenService, UpdateUserRequest, User,
    UserManager, UserSummary,
};
