//! Admin endpoints for artifact cleanup
//!
//! All routes here sit behind the admin key.

use axum::{extract::State, Json};

use crate::error::Result;
use crate::lifecycle::{CleanupStats, SweepReport};
use crate::state::AppState;

/// Directory statistics for both artifact directories
pub async fn cleanup_stats(State(state): State<AppState>) -> Result<Json<CleanupStats>> {
    Ok(Json(state.cleanup().stats().await?))
}

/// Run one sweep now with the configured max age
pub async fn run_cleanup(State(state): State<AppState>) -> Json<SweepReport> {
    let max_age = state.config().cleanup.max_age();
    Json(state.cleanup().sweep(max_age).await)
}

/// Delete every stored artifact
pub async fn purge(State(state): State<AppState>) -> Json<SweepReport> {
    Json(state.cleanup().purge_all().await)
}
