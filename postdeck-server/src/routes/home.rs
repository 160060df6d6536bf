use axum::Json;
use serde_json::{json, Value};

pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Postdeck API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
