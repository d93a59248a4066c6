//! Periodic JSONL log of activity stats.
//!
//! While tracking runs, a background thread appends one line per
//! interval so sessions can be replayed for model training later.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::counter::ActivityCounter;
use super::types::ActivitySnapshot;

/// How often the logger thread checks for shutdown.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Handle to the background logging thread. Stops it on drop.
pub struct ActivityLogger {
    path: PathBuf,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ActivityLogger {
    /// Spawns the logger thread appending to `path` every `interval`.
    pub fn spawn(counter: Arc<ActivityCounter>, path: impl Into<PathBuf>, interval: Duration) -> Self {
        let path = path.into();
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = {
            let path = path.clone();
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || run(&counter, &path, interval, &shutdown))
        };

        tracing::info!(path = %path.display(), interval_secs = interval.as_secs(), "Activity logging started");

        Self {
            path,
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stops the thread after it writes a final line.
    pub fn stop(mut self) {
        self.stop_inner();
    }

    fn stop_inner(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Activity logger thread panicked");
            }
            tracing::info!(path = %self.path.display(), "Activity logging stopped");
        }
    }
}

impl Drop for ActivityLogger {
    fn drop(&mut self) {
        self.stop_inner();
    }
}

fn run(counter: &ActivityCounter, path: &Path, interval: Duration, shutdown: &AtomicBool) {
    let mut next_write = Instant::now() + interval;

    while !shutdown.load(Ordering::SeqCst) {
        if Instant::now() >= next_write {
            append_line(counter, path);
            next_write += interval;
        }
        thread::sleep(SHUTDOWN_POLL.min(interval));
    }

    append_line(counter, path);
}

fn append_line(counter: &ActivityCounter, path: &Path) {
    let snapshot = counter.snapshot();
    if let Err(e) = write_snapshot(path, &snapshot) {
        tracing::warn!(?e, path = %path.display(), "Failed to write activity log line");
    }
}

/// Appends a single snapshot as one JSON line.
pub fn write_snapshot(path: &Path, snapshot: &ActivitySnapshot) -> std::io::Result<()> {
    let mut line = serde_json::to_string(snapshot)?;
    line.push('\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{EventKind, DEFAULT_TIME_WINDOW};

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_write_snapshot_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let counter = ActivityCounter::new(DEFAULT_TIME_WINDOW, Vec::new());

        counter.record_now(EventKind::KeyPress);
        write_snapshot(&path, &counter.snapshot()).unwrap();
        counter.record_now(EventKind::MouseClick);
        write_snapshot(&path, &counter.snapshot()).unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["keystrokes_per_minute"], 1);
        assert_eq!(lines[0]["mouse_clicks_per_minute"], 0);
        assert_eq!(lines[1]["mouse_clicks_per_minute"], 1);
        assert_eq!(lines[1]["is_running"], false);
        assert!(lines[1]["timestamp"].is_string());
    }

    #[test]
    fn test_logger_writes_periodically_and_on_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let counter = Arc::new(ActivityCounter::new(DEFAULT_TIME_WINDOW, Vec::new()));
        counter.record_now(EventKind::MouseMove);

        let logger = ActivityLogger::spawn(Arc::clone(&counter), &path, Duration::from_millis(50));
        assert_eq!(logger.path(), path.as_path());
        thread::sleep(Duration::from_millis(300));
        logger.stop();

        let lines = read_lines(&path);
        // At least one periodic line plus the final one
        assert!(lines.len() >= 2, "got {} lines", lines.len());
        assert!(lines
            .iter()
            .all(|line| line["mouse_moves_per_minute"] == 1));
    }

    #[test]
    fn test_unwritable_path_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("activity.jsonl");
        let counter = Arc::new(ActivityCounter::new(DEFAULT_TIME_WINDOW, Vec::new()));

        let logger = ActivityLogger::spawn(counter, &path, Duration::from_secs(60));
        drop(logger);
        assert!(!path.exists());
    }
}
