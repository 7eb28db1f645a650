//! GET /health - 存活检查

use axum::response::Json;
use serde_json::{json, Value};

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
