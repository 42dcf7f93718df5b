use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and open document count.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "reportfit",
        "documents": state.sessions.len().await,
        "generation": state.writer.is_some(),
        "layoutDebounceMs": state.config.layout_debounce.as_millis() as u64,
    }))
}
