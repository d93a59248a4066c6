//! Shared application state for the HTTP server.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::config::Config;
use crate::error::TrackerError;
use crate::monitor::InputSender;
use crate::tracker::{ActivityCounter, ActivityLogger};

/// Application state shared across all handlers.
pub struct AppState {
    pub counter: Arc<ActivityCounter>,

    /// Present when the counter is fed through a channel.
    pub input: Option<InputSender>,

    /// Running JSONL logger, if logging was enabled on start.
    ///
    /// Held across every counter start/stop so the logger always matches
    /// the tracker's running state.
    logger: Mutex<Option<ActivityLogger>>,

    pub default_log_path: PathBuf,
    pub default_logging: bool,
    pub log_interval: Duration,
}

impl AppState {
    pub fn new(counter: Arc<ActivityCounter>, input: Option<InputSender>, config: &Config) -> Self {
        Self {
            counter,
            input,
            logger: Mutex::new(None),
            default_log_path: config.activity_log.path.clone(),
            default_logging: config.activity_log.enabled,
            log_interval: config.log_interval(),
        }
    }

    fn logger(&self) -> MutexGuard<'_, Option<ActivityLogger>> {
        self.logger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts the counter and, with `log_file`, a logger writing to it.
    ///
    /// Blocks while listeners attach.
    pub fn start_tracking(&self, log_file: Option<PathBuf>) -> Result<(), TrackerError> {
        let mut logger = self.logger();
        self.counter.start()?;

        if let Some(path) = log_file {
            let spawned = ActivityLogger::spawn(Arc::clone(&self.counter), path, self.log_interval);
            if let Some(previous) = logger.replace(spawned) {
                previous.stop();
            }
        }
        Ok(())
    }

    /// Stops the counter and the logger, which writes its final line.
    ///
    /// Blocks while listener and logger threads are joined.
    pub fn stop_tracking(&self) -> Result<(), TrackerError> {
        let mut logger = self.logger();
        self.counter.stop()?;

        if let Some(running) = logger.take() {
            running.stop();
        }
        Ok(())
    }

    pub fn is_logging(&self) -> bool {
        self.logger().is_some()
    }

    /// Path of the running log file, if any.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.logger().as_ref().map(|logger| logger.path().to_path_buf())
    }

    /// Stops logging and tracking; used on shutdown.
    pub fn shutdown(&self) {
        let mut logger = self.logger();
        if self.counter.is_running() {
            let _ = self.counter.stop();
        }
        if let Some(running) = logger.take() {
            running.stop();
        }
    }
}
