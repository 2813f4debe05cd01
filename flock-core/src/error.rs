use thiserror::Error;

/// 核心操作通用的 Result 类型
pub type Result<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User already exists: {0}")]
    UserExists(String),
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,
    #[error("Email could not be sent: {0}")]
    DeliveryFailure(String),
    #[error("{0}")]
    NotFound(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid role: {0}")]
    InvalidRole(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("other error: {0}")]
    Other(String),
}

impl AuthError {
    pub(crate) fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }
}
