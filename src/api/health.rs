/// Health check endpoint
use crate::context::AppContext;
use axum::{routing::get, Json, Router};

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/health", get(health_basic))
}

/// Basic health check
///
/// Returns simple JSON with status and version
pub async fn health_basic() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
