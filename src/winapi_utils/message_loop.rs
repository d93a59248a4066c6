//! Windows message loop utilities.
//!
//! Low-level hooks only fire while the thread that installed them pumps
//! messages, so each hook thread runs its own loop and is stopped by
//! posting `WM_QUIT` to it from another thread.

use windows::Win32::Foundation::{LPARAM, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW, TranslateMessage, MSG,
    PM_NOREMOVE, WM_QUIT,
};

/// Returns the calling thread's id, used as the target for [`post_quit`].
pub fn current_thread_id() -> u32 {
    unsafe { GetCurrentThreadId() }
}

/// Forces creation of the calling thread's message queue.
///
/// `PostThreadMessageW` fails against a thread that has no queue yet, so
/// hook threads call this before reporting their id.
pub fn ensure_message_queue() {
    let mut msg = MSG::default();
    unsafe {
        let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
    }
}

/// Pumps messages on the calling thread until `WM_QUIT` arrives.
pub fn run_message_loop() {
    tracing::debug!(thread_id = current_thread_id(), "Message loop starting");

    let mut msg = MSG::default();

    unsafe {
        // GetMessageW returns 0 on WM_QUIT and -1 on error
        while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    tracing::debug!("Message loop exited");
}

/// Posts `WM_QUIT` to the given thread's message loop.
///
/// Returns `false` if the message could not be posted.
pub fn post_quit(thread_id: u32) -> bool {
    let result = unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) };

    match result {
        Ok(()) => {
            tracing::debug!(thread_id, "Posted quit message");
            true
        }
        Err(e) => {
            tracing::error!(?e, thread_id, "Failed to post quit message");
            false
        }
    }
}
