//! Native keyboard and mouse listeners built on Windows low-level hooks.
//!
//! Each listener owns a thread that installs its hook and pumps messages.
//! Hook callbacks run on that thread in the system input pipeline, so they
//! do nothing but take the counter's short append lock and pass the event
//! down the hook chain.

use once_cell::sync::Lazy;
use std::sync::mpsc;
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, HC_ACTION, WM_KEYDOWN, WM_LBUTTONDOWN, WM_MBUTTONDOWN, WM_MOUSEMOVE,
    WM_RBUTTONDOWN, WM_SYSKEYDOWN,
};

use super::listener::{EventSink, InputListener};
use crate::error::TrackerError;
use crate::tracker::EventKind;
use crate::winapi_utils::{
    current_thread_id, ensure_message_queue, post_quit, run_message_loop, HookGuard, HookType,
};

/// `WM_QUIT` delivery attempts before a hook thread is set aside.
const QUIT_ATTEMPTS: u32 = 5;
const QUIT_RETRY_DELAY: Duration = Duration::from_millis(20);

type SinkSlot = Lazy<RwLock<Option<Arc<dyn EventSink>>>>;

// Hook procedures carry no user data, so each one reads its sink from here.
static KEYBOARD_SINK: SinkSlot = Lazy::new(|| RwLock::new(None));
static MOUSE_SINK: SinkSlot = Lazy::new(|| RwLock::new(None));

fn slot(hook_type: HookType) -> &'static SinkSlot {
    match hook_type {
        HookType::Keyboard => &KEYBOARD_SINK,
        HookType::Mouse => &MOUSE_SINK,
    }
}

fn set_sink(hook_type: HookType, sink: Option<Arc<dyn EventSink>>) {
    *slot(hook_type).write().unwrap_or_else(PoisonError::into_inner) = sink;
}

fn deliver(hook_type: HookType, kind: EventKind) {
    if let Ok(guard) = slot(hook_type).read() {
        if let Some(sink) = guard.as_ref() {
            sink.record_now(kind);
        }
    }
}

/// Low-level keyboard hook callback. Counts key-down events only.
///
/// # Safety
/// Called by Windows on the hook thread's message pump.
unsafe extern "system" fn keyboard_hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 {
        let msg = wparam.0 as u32;
        if msg == WM_KEYDOWN || msg == WM_SYSKEYDOWN {
            deliver(HookType::Keyboard, EventKind::KeyPress);
        }
    }

    CallNextHookEx(None, code, wparam, lparam)
}

/// Low-level mouse hook callback. Counts moves and button presses;
/// releases and wheel events are ignored.
///
/// # Safety
/// Called by Windows on the hook thread's message pump.
unsafe extern "system" fn mouse_hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 {
        match wparam.0 as u32 {
            WM_MOUSEMOVE => deliver(HookType::Mouse, EventKind::MouseMove),
            WM_LBUTTONDOWN | WM_RBUTTONDOWN | WM_MBUTTONDOWN => {
                deliver(HookType::Mouse, EventKind::MouseClick)
            }
            _ => {}
        }
    }

    CallNextHookEx(None, code, wparam, lparam)
}

/// Posts `WM_QUIT` through `post`, retrying a bounded number of times.
fn quit_with_retry(thread_id: u32, post: impl Fn(u32) -> bool) -> bool {
    (0..QUIT_ATTEMPTS).any(|attempt| {
        if attempt > 0 {
            thread::sleep(QUIT_RETRY_DELAY);
        }
        post(thread_id)
    })
}

type HookThread = (u32, JoinHandle<()>);

/// A keyboard or mouse listener backed by a low-level hook.
pub struct HookListener {
    hook_type: HookType,
    /// Hook thread id (for `WM_QUIT`) and its handle while attached.
    thread: Option<HookThread>,
    /// A thread that could not be told to quit on detach. It still owns its
    /// hook, so no new hook is installed until it has been reaped.
    stuck: Option<HookThread>,
}

impl HookListener {
    pub fn keyboard() -> Self {
        Self::new(HookType::Keyboard)
    }

    pub fn mouse() -> Self {
        Self::new(HookType::Mouse)
    }

    fn new(hook_type: HookType) -> Self {
        Self {
            hook_type,
            thread: None,
            stuck: None,
        }
    }

    /// Ends a hook thread and joins it.
    ///
    /// Hands the thread back if `WM_QUIT` could not be delivered and it is
    /// still running.
    fn end_thread(&self, (thread_id, handle): HookThread) -> Option<HookThread> {
        if !quit_with_retry(thread_id, post_quit) && !handle.is_finished() {
            tracing::error!(listener = self.name(), thread_id, "Hook thread unreachable, keeping it for retry");
            return Some((thread_id, handle));
        }

        if handle.join().is_err() {
            tracing::error!(listener = self.name(), "Hook thread panicked");
        }
        None
    }
}

impl InputListener for HookListener {
    fn name(&self) -> &'static str {
        match self.hook_type {
            HookType::Keyboard => "keyboard",
            HookType::Mouse => "mouse",
        }
    }

    fn attach(&mut self, sink: Arc<dyn EventSink>) -> Result<(), TrackerError> {
        if self.thread.is_some() {
            return Err(TrackerError::attach(self.name(), "already attached"));
        }
        if let Some(stuck) = self.stuck.take() {
            self.stuck = self.end_thread(stuck);
            if self.stuck.is_some() {
                return Err(TrackerError::attach(
                    self.name(),
                    "previous hook thread is still running",
                ));
            }
        }

        set_sink(self.hook_type, Some(sink));

        let hook_type = self.hook_type;
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, String>>();

        let spawned = thread::Builder::new()
            .name(format!("{}-hook", self.name()))
            .spawn(move || {
                ensure_message_queue();

                let callback: unsafe extern "system" fn(i32, WPARAM, LPARAM) -> LRESULT = match hook_type {
                    HookType::Keyboard => keyboard_hook_proc,
                    HookType::Mouse => mouse_hook_proc,
                };
                match HookGuard::install(hook_type, Some(callback)) {
                    Ok(guard) => {
                        let _ = ready_tx.send(Ok(current_thread_id()));
                        run_message_loop();
                        drop(guard);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                    }
                }
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                set_sink(self.hook_type, None);
                return Err(TrackerError::attach(self.name(), e));
            }
        };

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => {
                self.thread = Some((thread_id, handle));
                Ok(())
            }
            Ok(Err(reason)) => {
                let _ = handle.join();
                set_sink(self.hook_type, None);
                Err(TrackerError::attach(self.name(), reason))
            }
            Err(_) => {
                let _ = handle.join();
                set_sink(self.hook_type, None);
                Err(TrackerError::attach(self.name(), "hook thread exited early"))
            }
        }
    }

    fn detach(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.stuck = self.end_thread(thread);
        }
        // A stuck hook stays installed but has nothing to deliver to
        set_sink(self.hook_type, None);
    }
}

impl Drop for HookListener {
    fn drop(&mut self) {
        self.detach();
        if let Some(stuck) = self.stuck.take() {
            if self.end_thread(stuck).is_some() {
                tracing::warn!(listener = self.name(), "Abandoning hook thread on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_quit_retries_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let delivered = quit_with_retry(42, |thread_id| {
            assert_eq!(thread_id, 42);
            calls.fetch_add(1, Ordering::SeqCst) >= 2
        });

        assert!(delivered);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_quit_gives_up_after_bounded_attempts() {
        let calls = AtomicU32::new(0);
        let delivered = quit_with_retry(7, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            false
        });

        assert!(!delivered);
        assert_eq!(calls.load(Ordering::SeqCst), QUIT_ATTEMPTS);
    }

    #[test]
    fn test_finished_stuck_thread_is_reaped() {
        let mut listener = HookListener::keyboard();
        // A finished thread whose id no longer accepts messages
        let handle = thread::spawn(|| {});
        while !handle.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
        listener.stuck = Some((0, handle));

        // Finished threads are reaped even though WM_QUIT cannot be posted
        listener.stuck = listener.stuck.take().and_then(|t| listener.end_thread(t));
        assert!(listener.stuck.is_none());
    }
}
