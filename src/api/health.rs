use axum::extract::State;
use axum::Json;

use super::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready to accept a batch unless one is running.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let busy = state.session.try_lock().is_err();
    Json(serde_json::json!({
        "status": if busy { "busy" } else { "ready" },
        "batch": state.view.state().name(),
    }))
}
