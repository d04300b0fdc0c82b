//! Tailer configuration
//!
//! Defaults work for the game client; a JSON file at
//! `~/.config/poe-log-watcher/config.json` may override any field.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 25;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
pub const DEFAULT_MAX_READ_BYTES: usize = 8 * 1024 * 1024;
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailConfig {
    /// How long to wait before re-checking an unchanged file
    pub poll_interval_ms: u64,
    /// Events buffered between the tailer and the consumer
    pub channel_capacity: usize,
    /// Upper bound for one read; larger growth is read over several steps
    pub max_read_bytes: usize,
    /// Longest unterminated line kept between reads; longer fragments are
    /// dropped
    pub max_line_bytes: usize,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_read_bytes: DEFAULT_MAX_READ_BYTES,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl TailConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Channel bound, at least one
    pub fn event_buffer(&self) -> usize {
        self.channel_capacity.max(1)
    }

    /// Read size cap, at least one byte
    pub fn read_limit(&self) -> u64 {
        self.max_read_bytes.max(1) as u64
    }

    /// Carry-over cap, at least one byte
    pub fn line_limit(&self) -> usize {
        self.max_line_bytes.max(1)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("poe-log-watcher").join("config.json"))
    }

    /// Load the user config file, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }

        match Self::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                Self::default()
            }
        }
    }

    /// Load an explicit config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
}
