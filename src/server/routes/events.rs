//! Event ingestion for the channel input source.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::monitor::InputEvent;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EventsRequest {
    pub events: Vec<InputEvent>,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub success: bool,
    pub accepted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl EventsResponse {
    fn rejected(message: &'static str) -> Self {
        Self {
            success: false,
            accepted: 0,
            message: Some(message),
        }
    }
}

/// POST /api/events - Push input events into the channel listeners.
pub async fn push_events(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EventsRequest>,
) -> (StatusCode, Json<EventsResponse>) {
    let Some(sender) = state.input.as_ref() else {
        return (
            StatusCode::CONFLICT,
            Json(EventsResponse::rejected(
                "Event ingestion requires the channel input source",
            )),
        );
    };

    if !state.counter.is_running() {
        return (
            StatusCode::BAD_REQUEST,
            Json(EventsResponse::rejected("Tracker is not running")),
        );
    }

    let accepted = request
        .events
        .into_iter()
        .filter(|event| sender.send(*event))
        .count();

    (
        StatusCode::OK,
        Json(EventsResponse {
            success: true,
            accepted,
            message: None,
        }),
    )
}
