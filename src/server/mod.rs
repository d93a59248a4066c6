//! HTTP server module for the tracker API.
//!
//! Exposes the activity counter to the browser extension. Reads and
//! resets are short critical sections called inline; start and stop join
//! threads and run on the blocking pool.

pub mod routes;
pub mod state;

use crate::server::routes::{activity, control, events, health};
use crate::server::state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Builds the router with all tracker routes.
pub fn router(state: Arc<AppState>) -> Router {
    // The extension calls from a chrome-extension:// origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/activity", get(activity::get_activity))
        .route("/api/status", get(activity::get_status))
        .route("/api/start", post(control::start_tracking))
        .route("/api/stop", post(control::stop_tracking))
        .route("/api/reset", post(control::reset_stats))
        .route("/api/events", post(events::push_events))
        .layer(cors)
        .with_state(state)
}

/// Serves the API on `addr` until `shutdown` resolves.
pub async fn serve(
    state: Arc<AppState>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
