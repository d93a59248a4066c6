//! Data types for activity tracking.
//!
//! Defines the event kinds the tracker counts and the snapshots it
//! hands out to readers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three disjoint categories of user-input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    KeyPress,
    MouseMove,
    MouseClick,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::KeyPress,
        EventKind::MouseMove,
        EventKind::MouseClick,
    ];

    /// Whether this event is produced by the keyboard listener.
    pub fn is_keyboard(self) -> bool {
        matches!(self, EventKind::KeyPress)
    }
}

/// Lifecycle state of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerState {
    Stopped,
    Running,
}

impl fmt::Display for TrackerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerState::Stopped => f.write_str("stopped"),
            TrackerState::Running => f.write_str("running"),
        }
    }
}

/// Per-metric event counts over the trailing window.
///
/// Field names keep the `_per_minute` suffix the extension expects,
/// whatever the configured window length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityStats {
    pub keystrokes_per_minute: usize,
    pub mouse_moves_per_minute: usize,
    pub mouse_clicks_per_minute: usize,
}

impl ActivityStats {
    /// Returns the count for a single metric.
    #[cfg(test)]
    pub fn count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::KeyPress => self.keystrokes_per_minute,
            EventKind::MouseMove => self.mouse_moves_per_minute,
            EventKind::MouseClick => self.mouse_clicks_per_minute,
        }
    }

    pub fn total(&self) -> usize {
        self.keystrokes_per_minute + self.mouse_moves_per_minute + self.mouse_clicks_per_minute
    }
}

/// Stats plus lifecycle state, all read under one lock acquisition.
#[derive(Debug, Clone, Serialize)]
pub struct ActivitySnapshot {
    #[serde(flatten)]
    pub stats: ActivityStats,
    pub is_running: bool,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_serialization() {
        let json = serde_json::to_string(&EventKind::MouseClick).unwrap();
        assert_eq!(json, "\"mouse_click\"");

        let kind: EventKind = serde_json::from_str("\"key_press\"").unwrap();
        assert_eq!(kind, EventKind::KeyPress);
    }

    #[test]
    fn test_stats_count_by_kind() {
        let stats = ActivityStats {
            keystrokes_per_minute: 3,
            mouse_moves_per_minute: 7,
            mouse_clicks_per_minute: 1,
        };

        assert_eq!(stats.count(EventKind::KeyPress), 3);
        assert_eq!(stats.count(EventKind::MouseMove), 7);
        assert_eq!(stats.count(EventKind::MouseClick), 1);
        assert_eq!(stats.total(), 11);
    }

    #[test]
    fn test_snapshot_flattens_stats() {
        let snapshot = ActivitySnapshot {
            stats: ActivityStats {
                keystrokes_per_minute: 4,
                ..Default::default()
            },
            is_running: true,
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["keystrokes_per_minute"], 4);
        assert_eq!(value["mouse_moves_per_minute"], 0);
        assert_eq!(value["is_running"], true);
    }
}
