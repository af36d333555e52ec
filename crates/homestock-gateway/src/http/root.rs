use axum::Json;
use serde_json::{json, Value};

/// GET /: welcome message and endpoint map.
pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Welcome to Homestock API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "categories": "/api/categories",
            "consumables": "/api/consumables",
            "tasks": "/api/tasks",
        },
    }))
}
