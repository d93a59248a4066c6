//! Runtime configuration.
//!
//! Loaded from `<config_dir>/focuspulse/config.json` when present, then
//! overridden by `FOCUSPULSE_*` environment variables. Nothing here is
//! persisted back.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Where keyboard and mouse events come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// OS-level hooks: Windows low-level hooks, monio on Linux and macOS.
    Native,
    /// Events pushed through an in-process channel (e.g. `POST /api/events`).
    Channel,
}

impl Default for InputSource {
    fn default() -> Self {
        if cfg!(any(windows, target_os = "linux", target_os = "macos")) {
            InputSource::Native
        } else {
            InputSource::Channel
        }
    }
}

impl std::str::FromStr for InputSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(InputSource::Native),
            "channel" => Ok(InputSource::Channel),
            other => Err(ConfigError::Invalid(format!("unknown input source: {other}"))),
        }
    }
}

/// Settings for the periodic JSONL activity log.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActivityLogConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub interval_secs: u64,
}

impl Default for ActivityLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("activity_log.jsonl"),
            interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Trailing window for the per-metric counts.
    pub time_window_secs: u64,
    pub bind_address: IpAddr,
    pub port: u16,
    pub input_source: InputSource,
    /// Start tracking at launch instead of waiting for `POST /api/start`.
    pub auto_start: bool,
    pub activity_log: ActivityLogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_window_secs: 60,
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
            input_source: InputSource::default(),
            auto_start: false,
            activity_log: ActivityLogConfig::default(),
        }
    }
}

impl Config {
    /// Loads the config file (if any) and applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Config::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        tracing::debug!(?config, "Loaded config");
        Ok(config)
    }

    /// Default config file location.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("focuspulse").join("config.json"))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `FOCUSPULSE_*` overrides read through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("FOCUSPULSE_TIME_WINDOW_SECS") {
            self.time_window_secs = parse_var("FOCUSPULSE_TIME_WINDOW_SECS", &v)?;
        }
        if let Some(v) = lookup("FOCUSPULSE_BIND_ADDRESS") {
            self.bind_address = parse_var("FOCUSPULSE_BIND_ADDRESS", &v)?;
        }
        if let Some(v) = lookup("FOCUSPULSE_PORT") {
            self.port = parse_var("FOCUSPULSE_PORT", &v)?;
        }
        if let Some(v) = lookup("FOCUSPULSE_INPUT_SOURCE") {
            self.input_source = v.parse()?;
        }
        if let Some(v) = lookup("FOCUSPULSE_AUTO_START") {
            self.auto_start = parse_var("FOCUSPULSE_AUTO_START", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "time_window_secs must be greater than zero".into(),
            ));
        }
        if self.activity_log.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "activity_log.interval_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn time_window(&self) -> Duration {
        Duration::from_secs(self.time_window_secs)
    }

    pub fn log_interval(&self) -> Duration {
        Duration::from_secs(self.activity_log.interval_secs)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key} has invalid value {value:?}")))
}
