//! FocusPulse - activity tracker backend.
//!
//! Serves the tracker API and waits for the extension to start tracking
//! (unless `auto_start` is set). Ctrl+C stops tracking and exits.

use focuspulse::config::Config;
use focuspulse::monitor::{build_listeners, Listeners};
use focuspulse::server::{self, state::AppState};
use focuspulse::tracker::ActivityCounter;
use std::sync::Arc;
use tokio::sync::Notify;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("focuspulse=info")),
        )
        .init();

    let config = Config::load()?;

    let Listeners { listeners, sender } = build_listeners(config.input_source);
    let counter = Arc::new(ActivityCounter::new(config.time_window(), listeners));
    let state = Arc::new(AppState::new(Arc::clone(&counter), sender, &config));

    tracing::info!(
        window_secs = config.time_window_secs,
        input_source = ?config.input_source,
        "Activity tracker ready"
    );

    if config.auto_start {
        let log_file = config
            .activity_log
            .enabled
            .then(|| config.activity_log.path.clone());
        if let Err(e) = state.start_tracking(log_file) {
            tracing::warn!(error = %e, "Auto-start failed, waiting for POST /api/start");
        }
    }

    let shutdown = Arc::new(Notify::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        println!("\n🛑 Shutdown signal received...");
        shutdown_ctrlc.notify_one();
    })?;

    let addr = config.socket_addr();
    println!("API available at http://{addr}");
    println!("  GET  /api/activity - Current activity metrics");
    println!("  GET  /api/status   - Tracker status");
    println!("  POST /api/start    - Start activity tracking");
    println!("  POST /api/stop     - Stop activity tracking");
    println!("  POST /api/reset    - Reset all statistics");
    if state.input.is_some() {
        println!("  POST /api/events   - Push input events");
    }
    println!();

    let runtime = tokio::runtime::Runtime::new()?;
    let served = runtime.block_on(server::serve(Arc::clone(&state), addr, async move {
        shutdown.notified().await;
    }));

    println!("⏳ Shutting down...");
    state.shutdown();
    served?;

    println!("👋 FocusPulse has exited. Goodbye!");
    Ok(())
}
