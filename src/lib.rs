//! FocusPulse - keyboard and mouse activity rates for focus detection.
//!
//! Counts input events over a trailing window and serves the counts to
//! the browser extension over a small HTTP API.

pub mod config;
pub mod error;
pub mod monitor;
pub mod server;
pub mod tracker;
#[cfg(windows)]
pub mod winapi_utils;
