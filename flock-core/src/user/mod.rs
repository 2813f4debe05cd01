//! 用户认证与授权模块

mod auth;
pub(crate) mod crypto;
mod manager;
mod models;
mod password;
mod permissions;
mod token;

#[cfg(test)]
pub(crate) mod test_support;

pub use crypto::{BcryptHasher, CredentialHasher, DEFAULT_BCRYPT_COST};
pub use manager::{UserManager, DEFAULT_RESET_TOKEN_TTL_SECS};
pub use models::{
    AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, Identity, LoginRequest,
    ProfileResponse, RegisterRequest, ResetPasswordRequest, ResetPasswordResponse, RevokedToken,
    TokenClaims, UpdateUserRequest, User, UserSummary,
};
pub use password::RESET_EMAIL_SUBJECT;
pub use permissions::{authorize, operations_for, permits, Operation};
pub use token::{JwtSigner, TokenService, TokenSigner, DEFAULT_JWT_AUDIENCE, DEFAULT_JWT_ISSUER};
