use axum::extract::State;
use axum::Json;

use super::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once a precision table with at least one market is loaded.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let markets = state.precision.len();
    let status = if markets > 0 { "ready" } else { "degraded" };
    Json(serde_json::json!({
        "status": status,
        "precision_markets": markets,
        "first_fill_policy": format!("{:?}", state.reconciler.policy()),
    }))
}
