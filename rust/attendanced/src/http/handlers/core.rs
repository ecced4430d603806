use axum::Json;
use serde_json::{json, Value};

pub async fn handle_health() -> Json<Value> {
    Json(json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
