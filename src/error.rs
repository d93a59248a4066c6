//! Error types for the activity tracker and its configuration.

use std::path::PathBuf;
use thiserror::Error;

use crate::tracker::TrackerState;

/// Errors reported by the tracker lifecycle.
///
/// Recording, reading and resetting are total and never produce these.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// `start()` on a running tracker or `stop()` on a stopped one.
    /// The tracker is left exactly as it was.
    #[error("tracker is already {from}, cannot transition to {to}")]
    InvalidStateTransition {
        from: TrackerState,
        to: TrackerState,
    },

    /// An input listener refused to attach; tracking did not start.
    #[error("failed to attach {listener} listener: {reason}")]
    ListenerAttachFailure {
        listener: &'static str,
        reason: String,
    },
}

impl TrackerError {
    pub(crate) fn attach(listener: &'static str, reason: impl ToString) -> Self {
        Self::ListenerAttachFailure {
            listener,
            reason: reason.to_string(),
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
