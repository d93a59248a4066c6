//! Activity statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::server::state::AppState;
use crate::tracker::{ActivityStats, TrackerState};

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    #[serde(flatten)]
    pub stats: ActivityStats,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub is_running: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub state: TrackerState,
    pub message: &'static str,
}

/// GET /api/activity - Event counts over the trailing window.
pub async fn get_activity(State(state): State<Arc<AppState>>) -> Json<ActivityResponse> {
    let snapshot = state.counter.snapshot();

    Json(ActivityResponse {
        stats: snapshot.stats,
        timestamp: snapshot.timestamp.timestamp_micros() as f64 / 1_000_000.0,
        is_running: snapshot.is_running,
    })
}

/// GET /api/status - Whether the tracker is running.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let tracker_state = state.counter.state();

    Json(StatusResponse {
        running: tracker_state == TrackerState::Running,
        state: tracker_state,
        message: match tracker_state {
            TrackerState::Running => "Activity tracker is operational",
            TrackerState::Stopped => "Activity tracker is stopped",
        },
    })
}
