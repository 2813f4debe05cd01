use axum::http::{StatusCode, Uri};
use axum::Json;
use serde_json::json;

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// 未匹配的路由
pub async fn handler_404(uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    tracing::warn!(path = %uri.path(), "route not found");
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "code": "NotFound",
            "message": "Route not found"
        })),
    )
}
