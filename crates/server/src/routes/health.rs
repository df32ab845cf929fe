use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// Health check endpoint (liveness)
/// Returns 200 with a fixed body while the server is running
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "watermark-processor",
    }))
}
