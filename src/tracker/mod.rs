//! Sliding-window activity tracking.
//!
//! Provides the thread-safe counter that turns raw keyboard and mouse
//! events into per-metric rates over a trailing time window, plus the
//! periodic JSONL logger that records those rates.

pub mod activity_log;
pub mod clock;
pub mod counter;
pub mod event_log;
pub mod types;

pub use activity_log::*;
pub use clock::*;
pub use counter::*;
pub use event_log::*;
pub use types::*;
