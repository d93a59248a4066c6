//! Windows hook installation and management.
//!
//! Provides an RAII wrapper for low-level hooks so a hook is always
//! removed by the thread that installed it.

use windows::Win32::UI::WindowsAndMessaging::{
    SetWindowsHookExW, UnhookWindowsHookEx, HHOOK, HOOKPROC, WH_KEYBOARD_LL, WH_MOUSE_LL,
};

/// Which low-level hook to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookType {
    Keyboard,
    Mouse,
}

impl HookType {
    pub fn name(self) -> &'static str {
        match self {
            HookType::Keyboard => "keyboard_ll",
            HookType::Mouse => "mouse_ll",
        }
    }
}

/// Installed hook; calls `UnhookWindowsHookEx` on drop.
///
/// The installing thread must pump messages for the callback to fire.
pub struct HookGuard {
    handle: HHOOK,
    hook_type: HookType,
}

impl HookGuard {
    /// Installs a global low-level hook with the given callback.
    ///
    /// The callback must return quickly and always call `CallNextHookEx`.
    pub fn install(hook_type: HookType, callback: HOOKPROC) -> windows::core::Result<Self> {
        let id = match hook_type {
            HookType::Keyboard => WH_KEYBOARD_LL,
            HookType::Mouse => WH_MOUSE_LL,
        };
        let handle = unsafe { SetWindowsHookExW(id, callback, None, 0)? };
        tracing::info!(hook_type = hook_type.name(), "Hook installed");

        Ok(Self { handle, hook_type })
    }
}

impl Drop for HookGuard {
    fn drop(&mut self) {
        match unsafe { UnhookWindowsHookEx(self.handle) } {
            Ok(_) => tracing::info!(hook_type = self.hook_type.name(), "Hook uninstalled"),
            Err(e) => tracing::error!(
                hook_type = self.hook_type.name(),
                error = ?e,
                "Failed to unhook"
            ),
        }
    }
}
