use axum::http::{Method, Uri};
use axum::Json;
use serde_json::json;

use crate::app::ApiError;

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Unknown endpoints. The engine only calls the plugin routes, so anything
/// else is worth a warning.
pub async fn handler_404(method: Method, uri: Uri) -> ApiError {
    tracing::warn!(%method, path = uri.path(), "request to unknown endpoint");
    ApiError::not_found(format!("no handler for {method} {}", uri.path()))
}
