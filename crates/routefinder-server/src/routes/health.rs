use axum::Json;

pub const GREETING: &str = "I'm the routefinder server. I only answer health checks.";

/// GET / — static acknowledgement for the process health checker.
pub async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "hello": GREETING }))
}
