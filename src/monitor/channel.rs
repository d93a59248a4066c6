//! Channel-fed input listeners.
//!
//! For hosts without native input hooks (or when input arrives from
//! elsewhere, e.g. the browser extension), events are pushed into an
//! mpsc channel and a single aggregator thread per listener forwards
//! them to the counter while the listener is attached.

use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::listener::{EventSink, InputListener};
use crate::error::TrackerError;
use crate::tracker::EventKind;

/// How long the aggregator waits for an event before rechecking its flag.
const RECV_TIMEOUT: Duration = Duration::from_millis(50);

/// One input event delivered through a channel.
///
/// Carries no timestamp: the counter stamps it with its own clock when the
/// aggregator hands it over.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct InputEvent {
    pub kind: EventKind,
}

impl InputEvent {
    pub fn new(kind: EventKind) -> Self {
        Self { kind }
    }
}

/// Cloneable producer side; routes each event to the keyboard or mouse
/// listener by kind.
#[derive(Debug, Clone)]
pub struct InputSender {
    keyboard: Sender<InputEvent>,
    mouse: Sender<InputEvent>,
}

impl InputSender {
    /// Queues an event. Returns `false` if the listener was dropped.
    pub fn send(&self, event: InputEvent) -> bool {
        let tx = if event.kind.is_keyboard() {
            &self.keyboard
        } else {
            &self.mouse
        };
        tx.send(event).is_ok()
    }
}

/// Creates a sender plus the keyboard and mouse listeners it feeds.
pub fn input_channel() -> (InputSender, ChannelListener, ChannelListener) {
    let (keyboard_tx, keyboard_rx) = mpsc::channel();
    let (mouse_tx, mouse_rx) = mpsc::channel();

    (
        InputSender {
            keyboard: keyboard_tx,
            mouse: mouse_tx,
        },
        ChannelListener::new("keyboard", keyboard_rx),
        ChannelListener::new("mouse", mouse_rx),
    )
}

/// Listener that drains an mpsc channel on its own thread.
pub struct ChannelListener {
    name: &'static str,
    receiver: Arc<Mutex<Receiver<InputEvent>>>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ChannelListener {
    fn new(name: &'static str, receiver: Receiver<InputEvent>) -> Self {
        Self {
            name,
            receiver: Arc::new(Mutex::new(receiver)),
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    #[cfg(test)]
    fn is_attached(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl InputListener for ChannelListener {
    fn name(&self) -> &'static str {
        self.name
    }

    fn attach(&mut self, sink: Arc<dyn EventSink>) -> Result<(), TrackerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(TrackerError::attach(self.name, "already attached"));
        }

        // Events sent while detached are not part of this session
        let stale = {
            let rx = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
            rx.try_iter().count()
        };
        if stale > 0 {
            tracing::debug!(listener = self.name, stale, "Discarded events queued while detached");
        }

        let receiver = Arc::clone(&self.receiver);
        let running = Arc::clone(&self.running);
        let name = self.name;

        let spawned = thread::Builder::new()
            .name(format!("{name}-input"))
            .spawn(move || aggregate(name, &receiver, &running, sink.as_ref()));

        match spawned {
            Ok(handle) => {
                self.thread_handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(TrackerError::attach(self.name, e))
            }
        }
    }

    fn detach(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                tracing::error!(listener = self.name, "Aggregator thread panicked");
            }
        }
    }
}

impl Drop for ChannelListener {
    fn drop(&mut self) {
        self.detach();
    }
}

fn aggregate(
    name: &'static str,
    receiver: &Mutex<Receiver<InputEvent>>,
    running: &AtomicBool,
    sink: &dyn EventSink,
) {
    tracing::debug!(listener = name, "Aggregator thread started");
    let rx = receiver.lock().unwrap_or_else(PoisonError::into_inner);

    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(RECV_TIMEOUT) {
            Ok(event) => {
                // Checked again so nothing lands after detach was requested
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                sink.record_now(event.kind);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!(listener = name, "All senders dropped");
                break;
            }
        }
    }

    tracing::debug!(listener = name, "Aggregator thread exiting");
}
