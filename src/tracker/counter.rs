//! Sliding-window activity counter.
//!
//! Holds the three event logs behind a single mutex so that a reader
//! always sees counts that are consistent with each other. Listener
//! threads append through [`EventSink`]; readers trim expired entries
//! lazily when they ask for stats.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::clock::{Clock, SystemClock};
use super::event_log::EventLog;
use super::types::{ActivitySnapshot, ActivityStats, EventKind, TrackerState};
use crate::error::TrackerError;
use crate::monitor::{EventSink, InputListener};

/// Default trailing window.
pub const DEFAULT_TIME_WINDOW: std::time::Duration = std::time::Duration::from_secs(60);

#[derive(Debug, Default)]
struct CounterState {
    keystrokes: EventLog,
    mouse_moves: EventLog,
    mouse_clicks: EventLog,
    running: bool,
}

impl CounterState {
    fn log_mut(&mut self, kind: EventKind) -> &mut EventLog {
        match kind {
            EventKind::KeyPress => &mut self.keystrokes,
            EventKind::MouseMove => &mut self.mouse_moves,
            EventKind::MouseClick => &mut self.mouse_clicks,
        }
    }

    /// Evicts expired entries and reads all three lengths.
    ///
    /// The window is half-open: an event at `t` counts while
    /// `now - t < window`. An event exactly `window` old is expired, so
    /// with a 60 s window an event at t=10 no longer counts at t=70.
    fn evict_and_count(&mut self, now: DateTime<Utc>, window: Duration) -> ActivityStats {
        if let Some(cutoff) = expiry_cutoff(now, window) {
            for kind in EventKind::ALL {
                self.log_mut(kind).evict_through(cutoff);
            }
        }

        ActivityStats {
            keystrokes_per_minute: self.keystrokes.len(),
            mouse_moves_per_minute: self.mouse_moves.len(),
            mouse_clicks_per_minute: self.mouse_clicks.len(),
        }
    }

    fn clear(&mut self) {
        self.keystrokes.clear();
        self.mouse_moves.clear();
        self.mouse_clicks.clear();
    }
}

/// Latest expired instant: everything at or before it is out of the window.
fn expiry_cutoff(now: DateTime<Utc>, window: Duration) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(window)
}

/// State shared with listener threads.
struct Shared {
    state: Mutex<CounterState>,
    clock: Arc<dyn Clock>,
    time_window: Duration,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, CounterState> {
        // Appends and trims leave the logs valid at every step, so a
        // poisoned lock still guards consistent data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for Shared {
    /// Appends an event observed at `at`.
    ///
    /// Timestamps ahead of the clock are stored as "now" and ones already
    /// outside the window are dropped, so every stored entry expires on
    /// schedule and the log stays ordered.
    fn record(&self, kind: EventKind, at: DateTime<Utc>) {
        let mut state = self.lock();
        let now = self.clock.now();

        if expiry_cutoff(now, self.time_window).is_some_and(|cutoff| at <= cutoff) {
            tracing::trace!(?kind, %at, "Dropping expired event");
            return;
        }
        state.log_mut(kind).push(at.min(now));
    }

    fn record_now(&self, kind: EventKind) {
        let mut state = self.lock();
        let now = self.clock.now();
        state.log_mut(kind).push(now);
    }
}

/// Thread-safe, time-windowed counter of keyboard and mouse events.
///
/// Starts `stopped`. [`start`](Self::start) attaches the listeners it was
/// built with and [`stop`](Self::stop) detaches them; both can be repeated.
/// Logged events survive a stop/start cycle and are only cleared by
/// [`reset`](Self::reset) or by ageing out of the window.
pub struct ActivityCounter {
    shared: Arc<Shared>,
    /// Also serializes start/stop. Never taken by `record` or `get_stats`.
    listeners: Mutex<Vec<Box<dyn InputListener>>>,
}

impl ActivityCounter {
    /// Creates a counter using wall-clock time.
    pub fn new(time_window: std::time::Duration, listeners: Vec<Box<dyn InputListener>>) -> Self {
        Self::with_clock(time_window, listeners, Arc::new(SystemClock))
    }

    /// Creates a counter reading "now" from the given clock.
    pub fn with_clock(
        time_window: std::time::Duration,
        listeners: Vec<Box<dyn InputListener>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let time_window = Duration::from_std(time_window).unwrap_or_else(|_| Duration::days(36_500));

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(CounterState::default()),
                clock,
                time_window,
            }),
            listeners: Mutex::new(listeners),
        }
    }

    /// Length of the trailing window.
    pub fn time_window(&self) -> Duration {
        self.shared.time_window
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    pub fn state(&self) -> TrackerState {
        if self.is_running() {
            TrackerState::Running
        } else {
            TrackerState::Stopped
        }
    }

    /// Attaches all listeners and transitions to `running`.
    ///
    /// On a running tracker this reports `InvalidStateTransition` and
    /// attaches nothing. If any listener fails to attach, those already
    /// attached are detached again and the tracker stays stopped.
    pub fn start(&self) -> Result<(), TrackerError> {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);

        if self.is_running() {
            tracing::warn!("Tracker already running");
            return Err(TrackerError::InvalidStateTransition {
                from: TrackerState::Running,
                to: TrackerState::Running,
            });
        }

        let sink: Arc<dyn EventSink> = Arc::clone(&self.shared) as Arc<dyn EventSink>;
        for index in 0..listeners.len() {
            if let Err(e) = listeners[index].attach(Arc::clone(&sink)) {
                tracing::error!(error = %e, "Listener attach failed, rolling back");
                for attached in listeners[..index].iter_mut().rev() {
                    attached.detach();
                }
                return Err(e);
            }
            tracing::debug!(listener = listeners[index].name(), "Listener attached");
        }

        self.shared.lock().running = true;
        tracing::info!(
            window_secs = self.shared.time_window.num_seconds(),
            listeners = listeners.len(),
            "Activity tracker started"
        );
        Ok(())
    }

    /// Detaches all listeners and transitions to `stopped`.
    ///
    /// On a stopped tracker this reports `InvalidStateTransition` and
    /// changes nothing.
    pub fn stop(&self) -> Result<(), TrackerError> {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.is_running() {
            tracing::warn!("Tracker not running");
            return Err(TrackerError::InvalidStateTransition {
                from: TrackerState::Stopped,
                to: TrackerState::Stopped,
            });
        }

        for listener in listeners.iter_mut().rev() {
            listener.detach();
            tracing::debug!(listener = listener.name(), "Listener detached");
        }

        self.shared.lock().running = false;
        tracing::info!("Activity tracker stopped");
        Ok(())
    }

    /// Appends an event to the log for `kind`.
    ///
    /// `at` is clamped to the counter's clock; an already expired `at` is
    /// ignored.
    pub fn record(&self, kind: EventKind, at: DateTime<Utc>) {
        self.shared.record(kind, at);
    }

    /// Appends an event stamped with the counter's clock.
    pub fn record_now(&self, kind: EventKind) {
        self.shared.record_now(kind);
    }

    /// Evicts expired events and returns per-metric counts.
    ///
    /// All three counts are taken under one lock acquisition.
    pub fn get_stats(&self) -> ActivityStats {
        let now = self.shared.clock.now();
        self.shared
            .lock()
            .evict_and_count(now, self.shared.time_window)
    }

    /// Stats, running flag and timestamp from one critical section.
    pub fn snapshot(&self) -> ActivitySnapshot {
        let now = self.shared.clock.now();
        let mut state = self.shared.lock();
        let stats = state.evict_and_count(now, self.shared.time_window);

        ActivitySnapshot {
            stats,
            is_running: state.running,
            timestamp: now,
        }
    }

    /// Clears all three logs. Does not touch the running state.
    pub fn reset(&self) {
        self.shared.lock().clear();
        tracing::info!("Activity stats reset");
    }
}

impl Drop for ActivityCounter {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}
