use axum::{Json, response::IntoResponse};
use serde_json::json;

// fixed payload, no state involved
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}
