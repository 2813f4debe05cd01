use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use flock_core::AuthError;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    code: &'static str,
    message: String,
    status: StatusCode,
}

impl ApiError {
    pub fn new(code: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            status,
            message: message.into(),
        }
    }

    pub fn unauthenticated() -> Self {
        Self::new(
            "Unauthenticated",
            StatusCode::UNAUTHORIZED,
            "Not authorized, no token",
        )
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BadRequest", StatusCode::BAD_REQUEST, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new("TooManyRequests", StatusCode::TOO_MANY_REQUESTS, message)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated(msg) => {
                ApiError::new("Unauthenticated", StatusCode::UNAUTHORIZED, msg)
            }
            AuthError::Forbidden(msg) => ApiError::new("Forbidden", StatusCode::FORBIDDEN, msg),
            AuthError::InvalidCredentials => ApiError::new(
                "InvalidCredentials",
                StatusCode::UNAUTHORIZED,
                "Invalid email or password",
            ),
            AuthError::UserExists(_) => {
                ApiError::new("UserExists", StatusCode::BAD_REQUEST, "User already exists")
            }
            AuthError::InvalidOrExpiredToken => ApiError::new(
                "InvalidOrExpiredToken",
                StatusCode::BAD_REQUEST,
                "Invalid or expired token",
            ),
            AuthError::DeliveryFailure(_) => ApiError::new(
                "DeliveryFailure",
                StatusCode::INTERNAL_SERVER_ERROR,
                "Email could not be sent",
            ),
            AuthError::NotFound(msg) => ApiError::new("NotFound", StatusCode::NOT_FOUND, msg),
            AuthError::MissingField(field) => ApiError::new(
                "MissingField",
                StatusCode::BAD_REQUEST,
                format!("{field} is required"),
            ),
            AuthError::InvalidRole(role) => ApiError::new(
                "InvalidRole",
                StatusCode::BAD_REQUEST,
                format!("invalid role: {role}"),
            ),
            AuthError::Serde(e) => {
                ApiError::new("SerdeError", StatusCode::BAD_REQUEST, e.to_string())
            }
            AuthError::Io(e) => {
                ApiError::new("IoError", StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AuthError::Other(msg) => {
                ApiError::new("Error", StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, message = %self.message, "request failed");
        }
        let body = Json(json!({
            "code": self.code,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}
