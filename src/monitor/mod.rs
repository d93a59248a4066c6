//! Input listeners that feed the activity counter.
//!
//! Native hooks are Windows low-level hooks, or monio on Linux and
//! macOS. On request events arrive through an mpsc channel instead.

pub mod channel;
#[cfg(windows)]
pub mod input_hooks;
pub mod listener;
#[cfg(any(target_os = "linux", target_os = "macos"))]
pub mod monio_hooks;

pub use channel::*;
#[cfg(windows)]
pub use input_hooks::*;
pub use listener::*;
#[cfg(any(target_os = "linux", target_os = "macos"))]
pub use monio_hooks::*;

#[cfg(not(any(windows, target_os = "linux", target_os = "macos")))]
use std::sync::Arc;

use crate::config::InputSource;
#[cfg(not(any(windows, target_os = "linux", target_os = "macos")))]
use crate::error::TrackerError;

/// Listeners for one counter, plus the channel sender when the input
/// source is channel-fed.
pub struct Listeners {
    pub listeners: Vec<Box<dyn InputListener>>,
    pub sender: Option<InputSender>,
}

/// Builds the keyboard and mouse listeners for the configured source.
pub fn build_listeners(source: InputSource) -> Listeners {
    match source {
        InputSource::Native => Listeners {
            listeners: native_listeners(),
            sender: None,
        },
        InputSource::Channel => {
            let (sender, keyboard, mouse) = input_channel();
            Listeners {
                listeners: vec![Box::new(keyboard), Box::new(mouse)],
                sender: Some(sender),
            }
        }
    }
}

#[cfg(windows)]
fn native_listeners() -> Vec<Box<dyn InputListener>> {
    vec![Box::new(HookListener::keyboard()), Box::new(HookListener::mouse())]
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn native_listeners() -> Vec<Box<dyn InputListener>> {
    vec![Box::new(MonioListener::keyboard()), Box::new(MonioListener::mouse())]
}

#[cfg(not(any(windows, target_os = "linux", target_os = "macos")))]
fn native_listeners() -> Vec<Box<dyn InputListener>> {
    vec![Box::new(Unsupported("keyboard")), Box::new(Unsupported("mouse"))]
}

/// Stands in for native hooks on platforms that have none; always fails
/// to attach so `start()` reports why tracking cannot proceed.
#[cfg(not(any(windows, target_os = "linux", target_os = "macos")))]
struct Unsupported(&'static str);

#[cfg(not(any(windows, target_os = "linux", target_os = "macos")))]
impl InputListener for Unsupported {
    fn name(&self) -> &'static str {
        self.0
    }

    fn attach(&mut self, _sink: Arc<dyn EventSink>) -> Result<(), TrackerError> {
        Err(TrackerError::attach(
            self.0,
            "native input hooks are not available on this platform; use the channel input source",
        ))
    }

    fn detach(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_source_exposes_sender() {
        let built = build_listeners(InputSource::Channel);
        assert!(built.sender.is_some());
        let names: Vec<_> = built.listeners.iter().map(|l| l.name()).collect();
        assert_eq!(names, ["keyboard", "mouse"]);
    }

    #[test]
    fn test_native_source_builds_keyboard_and_mouse() {
        let built = build_listeners(InputSource::Native);
        assert!(built.sender.is_none());
        let names: Vec<_> = built.listeners.iter().map(|l| l.name()).collect();
        assert_eq!(names, ["keyboard", "mouse"]);
    }

    #[cfg(not(any(windows, target_os = "linux", target_os = "macos")))]
    #[test]
    fn test_native_source_fails_to_start_without_hooks() {
        use crate::tracker::{ActivityCounter, DEFAULT_TIME_WINDOW};

        let built = build_listeners(InputSource::Native);
        assert!(built.sender.is_none());

        let counter = ActivityCounter::new(DEFAULT_TIME_WINDOW, built.listeners);
        let err = counter.start().unwrap_err();
        assert!(matches!(
            err,
            TrackerError::ListenerAttachFailure {
                listener: "keyboard",
                ..
            }
        ));
        assert!(!counter.is_running());
    }
}
