//! Native keyboard and mouse listeners for Linux and macOS, built on monio.
//!
//! monio keeps a single process-wide hook, so both listeners share one
//! [`HookHub`]. The hook starts with the first attach and stops with the
//! last detach; in between each listener only fills or clears its own
//! sink slot.

use monio::{Event, EventType, Hook};
use once_cell::sync::Lazy;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread;
use std::time::Duration;

use super::listener::{EventSink, InputListener};
use crate::error::TrackerError;
use crate::tracker::EventKind;

/// How long a freshly started hook gets to fail before it counts as up.
const STARTUP_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Device {
    Keyboard,
    Mouse,
}

impl Device {
    fn name(self) -> &'static str {
        match self {
            Device::Keyboard => "keyboard",
            Device::Mouse => "mouse",
        }
    }
}

#[derive(Default)]
struct Sinks {
    keyboard: Option<Arc<dyn EventSink>>,
    mouse: Option<Arc<dyn EventSink>>,
}

impl Sinks {
    fn slot(&mut self, device: Device) -> &mut Option<Arc<dyn EventSink>> {
        match device {
            Device::Keyboard => &mut self.keyboard,
            Device::Mouse => &mut self.mouse,
        }
    }

    fn is_empty(&self) -> bool {
        self.keyboard.is_none() && self.mouse.is_none()
    }
}

/// Maps a monio event to the metric it counts toward, if any.
///
/// Key releases, typed characters, button releases and wheel events are
/// not counted. A drag is a move with a button held.
fn classify(event_type: EventType) -> Option<EventKind> {
    match event_type {
        EventType::KeyPressed => Some(EventKind::KeyPress),
        EventType::MouseMoved | EventType::MouseDragged => Some(EventKind::MouseMove),
        EventType::MousePressed => Some(EventKind::MouseClick),
        _ => None,
    }
}

fn dispatch(sinks: &RwLock<Sinks>, event_type: EventType) {
    let Some(kind) = classify(event_type) else {
        return;
    };
    if let Ok(sinks) = sinks.read() {
        let sink = if kind.is_keyboard() {
            &sinks.keyboard
        } else {
            &sinks.mouse
        };
        if let Some(sink) = sink {
            sink.record_now(kind);
        }
    }
}

/// Stops a running hook and waits for its thread.
type Stopper = Box<dyn FnOnce() + Send>;

/// Starts a hook feeding the given sinks.
type Spawner = fn(Arc<RwLock<Sinks>>) -> Result<Stopper, String>;

/// Runs the monio hook on its own thread.
///
/// `Hook::run` only returns once the hook is stopped or failed, so a
/// result arriving within [`STARTUP_GRACE`] means the hook never came up.
fn spawn_monio_hook(sinks: Arc<RwLock<Sinks>>) -> Result<Stopper, String> {
    let hook = Arc::new(Hook::new());
    let (done_tx, done_rx) = mpsc::channel::<monio::Result<()>>();

    let handle = thread::Builder::new()
        .name("input-hook".into())
        .spawn({
            let hook = Arc::clone(&hook);
            move || {
                let result = hook.run(move |event: &Event| dispatch(&sinks, event.event_type));
                if let Err(e) = &result {
                    tracing::error!(error = %e, "Input hook exited");
                }
                let _ = done_tx.send(result);
            }
        })
        .map_err(|e| e.to_string())?;

    match done_rx.recv_timeout(STARTUP_GRACE) {
        Err(RecvTimeoutError::Timeout) => {}
        Ok(result) => {
            let _ = handle.join();
            return Err(match result {
                Err(e) => e.to_string(),
                Ok(()) => "input hook exited during startup".into(),
            });
        }
        Err(RecvTimeoutError::Disconnected) => {
            let _ = handle.join();
            return Err("input hook thread exited early".into());
        }
    }

    tracing::debug!("Input hook running");
    Ok(Box::new(move || {
        // NotRunning only means the hook already exited on its own
        if let Err(e) = hook.stop() {
            tracing::debug!(error = %e, "Input hook stop");
        }
        if handle.join().is_err() {
            tracing::error!("Input hook thread panicked");
        }
        tracing::debug!("Input hook stopped");
    }))
}

/// The one hook both listeners share.
struct HookHub {
    sinks: Arc<RwLock<Sinks>>,
    /// Also serializes attach and detach across the two listeners.
    running: Mutex<Option<Stopper>>,
    spawn: Spawner,
}

impl HookHub {
    fn new(spawn: Spawner) -> Self {
        Self {
            sinks: Arc::new(RwLock::new(Sinks::default())),
            running: Mutex::new(None),
            spawn,
        }
    }

    fn running(&self) -> MutexGuard<'_, Option<Stopper>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_sink(&self, device: Device, sink: Option<Arc<dyn EventSink>>) -> bool {
        let mut sinks = self.sinks.write().unwrap_or_else(PoisonError::into_inner);
        *sinks.slot(device) = sink;
        sinks.is_empty()
    }

    fn attach(&self, device: Device, sink: Arc<dyn EventSink>) -> Result<(), TrackerError> {
        let mut running = self.running();
        self.set_sink(device, Some(sink));

        if running.is_none() {
            match (self.spawn)(Arc::clone(&self.sinks)) {
                Ok(stopper) => *running = Some(stopper),
                Err(reason) => {
                    self.set_sink(device, None);
                    return Err(TrackerError::attach(device.name(), reason));
                }
            }
        }
        Ok(())
    }

    fn detach(&self, device: Device) {
        let mut running = self.running();
        if self.set_sink(device, None) {
            if let Some(stop) = running.take() {
                stop();
            }
        }
    }
}

static HUB: Lazy<Arc<HookHub>> = Lazy::new(|| Arc::new(HookHub::new(spawn_monio_hook)));

/// A keyboard or mouse listener on the shared monio hook.
pub struct MonioListener {
    device: Device,
    hub: Arc<HookHub>,
    attached: bool,
}

impl MonioListener {
    pub fn keyboard() -> Self {
        Self::on(Arc::clone(&HUB), Device::Keyboard)
    }

    pub fn mouse() -> Self {
        Self::on(Arc::clone(&HUB), Device::Mouse)
    }

    fn on(hub: Arc<HookHub>, device: Device) -> Self {
        Self {
            device,
            hub,
            attached: false,
        }
    }
}

impl InputListener for MonioListener {
    fn name(&self) -> &'static str {
        self.device.name()
    }

    fn attach(&mut self, sink: Arc<dyn EventSink>) -> Result<(), TrackerError> {
        if self.attached {
            return Err(TrackerError::attach(self.name(), "already attached"));
        }
        self.hub.attach(self.device, sink)?;
        self.attached = true;
        Ok(())
    }

    fn detach(&mut self) {
        if std::mem::take(&mut self.attached) {
            self.hub.detach(self.device);
        }
    }
}

impl Drop for MonioListener {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{ActivityCounter, DEFAULT_TIME_WINDOW};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static STARTS: AtomicUsize = AtomicUsize::new(0);
    static STOPS: AtomicUsize = AtomicUsize::new(0);

    fn counting_spawn(_sinks: Arc<RwLock<Sinks>>) -> Result<Stopper, String> {
        STARTS.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(|| {
            STOPS.fetch_add(1, Ordering::SeqCst);
        }))
    }

    fn idle_spawn(_sinks: Arc<RwLock<Sinks>>) -> Result<Stopper, String> {
        Ok(Box::new(|| {}))
    }

    fn refusing_spawn(_sinks: Arc<RwLock<Sinks>>) -> Result<Stopper, String> {
        Err("permission denied".into())
    }

    fn listeners_on(hub: &Arc<HookHub>) -> Vec<Box<dyn InputListener>> {
        vec![
            Box::new(MonioListener::on(Arc::clone(hub), Device::Keyboard)),
            Box::new(MonioListener::on(Arc::clone(hub), Device::Mouse)),
        ]
    }

    #[test]
    fn test_classify_counts_presses_and_moves() {
        assert_eq!(classify(EventType::KeyPressed), Some(EventKind::KeyPress));
        assert_eq!(classify(EventType::MouseMoved), Some(EventKind::MouseMove));
        assert_eq!(classify(EventType::MouseDragged), Some(EventKind::MouseMove));
        assert_eq!(classify(EventType::MousePressed), Some(EventKind::MouseClick));

        for ignored in [
            EventType::KeyReleased,
            EventType::KeyTyped,
            EventType::MouseReleased,
            EventType::MouseClicked,
            EventType::MouseWheel,
            EventType::HookEnabled,
        ] {
            assert_eq!(classify(ignored), None, "{ignored:?}");
        }
    }

    #[test]
    fn test_one_hook_serves_both_listeners() {
        let hub = Arc::new(HookHub::new(counting_spawn));
        let counter = ActivityCounter::new(DEFAULT_TIME_WINDOW, listeners_on(&hub));

        counter.start().unwrap();
        assert_eq!(STARTS.load(Ordering::SeqCst), 1);

        counter.stop().unwrap();
        assert_eq!(STOPS.load(Ordering::SeqCst), 1);

        counter.start().unwrap();
        assert_eq!(STARTS.load(Ordering::SeqCst), 2);
        counter.stop().unwrap();
        assert_eq!(STOPS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_events_reach_counter_only_while_attached() {
        let hub = Arc::new(HookHub::new(idle_spawn));
        let counter = ActivityCounter::new(DEFAULT_TIME_WINDOW, listeners_on(&hub));

        counter.start().unwrap();
        dispatch(&hub.sinks, EventType::KeyPressed);
        dispatch(&hub.sinks, EventType::KeyReleased);
        dispatch(&hub.sinks, EventType::MouseDragged);
        dispatch(&hub.sinks, EventType::MousePressed);

        let stats = counter.get_stats();
        assert_eq!(stats.keystrokes_per_minute, 1);
        assert_eq!(stats.mouse_moves_per_minute, 1);
        assert_eq!(stats.mouse_clicks_per_minute, 1);

        counter.stop().unwrap();
        dispatch(&hub.sinks, EventType::KeyPressed);
        assert_eq!(counter.get_stats().keystrokes_per_minute, 1);
    }

    #[test]
    fn test_hook_failure_fails_attach() {
        let hub = Arc::new(HookHub::new(refusing_spawn));
        let counter = ActivityCounter::new(DEFAULT_TIME_WINDOW, listeners_on(&hub));

        let err = counter.start().unwrap_err();
        assert!(matches!(
            err,
            TrackerError::ListenerAttachFailure {
                listener: "keyboard",
                ..
            }
        ));
        assert!(err.to_string().contains("permission denied"));
        assert!(!counter.is_running());
        assert!(hub.sinks.read().unwrap().is_empty());
    }
}
