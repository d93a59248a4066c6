//! Safe wrappers around the Windows hook and message-loop APIs.

pub mod hooks;
pub mod message_loop;

pub use hooks::*;
pub use message_loop::*;
