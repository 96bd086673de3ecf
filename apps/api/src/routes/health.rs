use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and cache freshness.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.cache.snapshot().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "ats-api",
        "cache_generation": state.cache.generation(),
        "cache_refreshed_at": snapshot.refreshed_at,
    }))
}
