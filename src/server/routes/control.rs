//! Start, stop and reset endpoints called by the extension's buttons.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use super::ActionResponse;
use crate::error::TrackerError;
use crate::server::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    pub enable_logging: Option<bool>,
    pub log_file_path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    #[serde(flatten)]
    pub result: ActionResponse,
    pub logging_enabled: bool,
    pub log_file: Option<PathBuf>,
}

/// POST /api/start - Attach listeners and begin counting.
pub async fn start_tracking(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StartRequest>>,
) -> (StatusCode, Json<StartResponse>) {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let logging_enabled = request.enable_logging.unwrap_or(state.default_logging);
    let log_file = logging_enabled.then(|| {
        request
            .log_file_path
            .unwrap_or_else(|| state.default_log_path.clone())
    });

    let failed = |status: StatusCode, message: String| {
        (
            status,
            Json(StartResponse {
                result: ActionResponse::failed(message),
                logging_enabled: false,
                log_file: None,
            }),
        )
    };

    // Attaching listeners spawns and hands off threads
    let started = {
        let state = Arc::clone(&state);
        tokio::task::spawn_blocking(move || state.start_tracking(log_file)).await
    };

    match started {
        Ok(Ok(())) => {}
        Ok(Err(TrackerError::InvalidStateTransition { .. })) => {
            return failed(StatusCode::BAD_REQUEST, "Tracker is already running".into());
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Failed to start tracker");
            return failed(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error starting tracker: {e}"),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Start task failed");
            return failed(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error starting tracker: {e}"),
            );
        }
    }

    (
        StatusCode::OK,
        Json(StartResponse {
            result: ActionResponse::ok("Activity tracking started"),
            logging_enabled,
            log_file: state.log_file(),
        }),
    )
}

/// POST /api/stop - Detach listeners; counts are kept until reset.
pub async fn stop_tracking(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ActionResponse>) {
    // Joins listener and logger threads
    let stopped = {
        let state = Arc::clone(&state);
        tokio::task::spawn_blocking(move || state.stop_tracking()).await
    };

    match stopped {
        Ok(Ok(())) => (
            StatusCode::OK,
            Json(ActionResponse::ok("Activity tracking stopped")),
        ),
        Ok(Err(_)) => (
            StatusCode::BAD_REQUEST,
            Json(ActionResponse::failed("Tracker is not running")),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Stop task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ActionResponse::failed(format!("Error stopping tracker: {e}"))),
            )
        }
    }
}

/// POST /api/reset - Clear all counts.
pub async fn reset_stats(State(state): State<Arc<AppState>>) -> Json<ActionResponse> {
    state.counter.reset();
    Json(ActionResponse::ok("Stats reset successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, InputSource};
    use crate::monitor::build_listeners;
    use crate::tracker::{ActivityCounter, EventKind};

    fn state_with(source: InputSource, log_dir: &std::path::Path) -> Arc<AppState> {
        let mut config = Config::default();
        config.activity_log.path = log_dir.join("activity_log.jsonl");
        let built = build_listeners(source);
        let counter = Arc::new(ActivityCounter::new(config.time_window(), built.listeners));
        Arc::new(AppState::new(counter, built.sender, &config))
    }

    #[tokio::test]
    async fn test_start_twice_returns_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(InputSource::Channel, dir.path());

        let (status, Json(body)) = start_tracking(State(Arc::clone(&state)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.result.success);
        assert!(body.logging_enabled);
        assert_eq!(body.log_file, Some(dir.path().join("activity_log.jsonl")));
        assert!(state.is_logging());

        let (status, Json(body)) = start_tracking(State(Arc::clone(&state)), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.result.success);
        assert_eq!(body.result.message, "Tracker is already running");

        state.shutdown();
    }

    #[tokio::test]
    async fn test_start_without_logging() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(InputSource::Channel, dir.path());

        let request = StartRequest {
            enable_logging: Some(false),
            log_file_path: None,
        };
        let (status, Json(body)) = start_tracking(State(Arc::clone(&state)), Some(Json(request))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.logging_enabled);
        assert!(body.log_file.is_none());
        assert!(!state.is_logging());

        state.shutdown();
    }

    #[tokio::test]
    async fn test_stop_writes_final_log_line() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(InputSource::Channel, dir.path());
        let log_path = dir.path().join("custom.jsonl");

        let request = StartRequest {
            enable_logging: Some(true),
            log_file_path: Some(log_path.clone()),
        };
        start_tracking(State(Arc::clone(&state)), Some(Json(request))).await;

        let (status, Json(body)) = stop_tracking(State(Arc::clone(&state))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        assert!(!state.is_logging());
        assert!(!state.counter.is_running());

        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_start_and_stop_keep_logger_in_step() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(InputSource::Channel, dir.path());

        for _ in 0..5 {
            let start = tokio::spawn(start_tracking(State(Arc::clone(&state)), None));
            let stop = tokio::spawn(stop_tracking(State(Arc::clone(&state))));
            start.await.unwrap();
            stop.await.unwrap();
            assert_eq!(state.is_logging(), state.counter.is_running());
        }

        state.shutdown();
    }

    #[tokio::test]
    async fn test_stop_when_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(InputSource::Channel, dir.path());

        let (status, Json(body)) = stop_tracking(State(state)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "Tracker is not running");
    }

    struct RefusingListener;

    impl crate::monitor::InputListener for RefusingListener {
        fn name(&self) -> &'static str {
            "keyboard"
        }

        fn attach(&mut self, _sink: Arc<dyn crate::monitor::EventSink>) -> Result<(), TrackerError> {
            Err(TrackerError::attach("keyboard", "hook refused"))
        }

        fn detach(&mut self) {}
    }

    #[tokio::test]
    async fn test_attach_failure_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.activity_log.path = dir.path().join("activity_log.jsonl");
        let counter = Arc::new(ActivityCounter::new(
            config.time_window(),
            vec![Box::new(RefusingListener)],
        ));
        let state = Arc::new(AppState::new(counter, None, &config));

        let (status, Json(body)) = start_tracking(State(Arc::clone(&state)), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.result.message.starts_with("Error starting tracker"));
        assert!(!state.counter.is_running());
        assert!(!state.is_logging());
    }

    #[tokio::test]
    async fn test_reset_clears_counts() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(InputSource::Channel, dir.path());
        state.counter.record_now(EventKind::KeyPress);

        let Json(body) = reset_stats(State(Arc::clone(&state))).await;
        assert!(body.success);
        assert_eq!(state.counter.get_stats().total(), 0);
    }
}
