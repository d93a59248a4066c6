//! The seam between input sources and the activity counter.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::TrackerError;
use crate::tracker::EventKind;

/// Receives discrete, timestamped input events.
///
/// Called from listener threads; implementations must not block for
/// longer than a short critical section and must never panic.
pub trait EventSink: Send + Sync {
    fn record(&self, kind: EventKind, at: DateTime<Utc>);

    /// Records an event stamped with the sink's notion of "now".
    fn record_now(&self, kind: EventKind) {
        self.record(kind, Utc::now());
    }
}

/// An attachable source of input events.
///
/// Once `detach` returns, the sink passed to the last `attach` receives
/// no further events from this listener. A listener may be attached and
/// detached any number of times.
pub trait InputListener: Send {
    fn name(&self) -> &'static str;

    fn attach(&mut self, sink: Arc<dyn EventSink>) -> Result<(), TrackerError>;

    fn detach(&mut self);
}
