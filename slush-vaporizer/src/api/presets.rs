//! Preset listing

use axum::{extract::State, routing::get, Json, Router};
use std::collections::BTreeMap;

use crate::AppState;

/// GET /api/presets
///
/// Preset name → description.
pub async fn list_presets(State(state): State<AppState>) -> Json<BTreeMap<String, String>> {
    Json(state.orchestrator.list_presets())
}

pub fn preset_routes() -> Router<AppState> {
    Router::new().route("/api/presets", get(list_presets))
}
