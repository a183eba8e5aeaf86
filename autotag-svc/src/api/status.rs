//! Status API handler
//!
//! GET /status — snapshot of the most recent batch job

use axum::{extract::State, routing::get, Json, Router};

use crate::{models::StatusSnapshot, AppState};

/// GET /status
///
/// Returns a point-in-time snapshot of the most recent batch job, or the
/// inactive default if no job has ever been started. Counters in one
/// snapshot are always mutually consistent.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.job_manager.status().await)
}

/// Build status routes
pub fn status_routes() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}
