//! Configuration for readahead-player
//!
//! Two sources, merged by the binary:
//! 1. **TOML file**: `[buffering]` and `[logging]` sections (see `readahead_common::config`
//!    for path resolution)
//! 2. **Command-line overrides** for the most common pool settings
//!
//! Every value has a built-in default, so an empty or missing file is valid.
//! Water marks default to fractions of the pool capacity instead of fixed
//! frame counts, so they scale with `buffer_count` and `frames_per_buffer`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "READAHEAD_CONFIG";

/// Buffering pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferingConfig {
    /// Number of frame buffers in the pool (at least 2)
    pub buffer_count: usize,

    /// Capacity of each buffer in frames
    pub frames_per_buffer: usize,

    /// Interleaved channel count of decoded data
    pub channels: usize,

    /// Refill starts when look-ahead drops below this many frames
    ///
    /// Default: half the pool capacity
    pub low_water_frames: Option<u64>,

    /// Refill stops once look-ahead reaches this many frames
    ///
    /// Default: the full pool capacity
    pub high_water_frames: Option<u64>,

    /// How often the background worker re-checks buffers when not woken
    pub poll_interval_ms: u64,

    /// Event bus capacity
    pub event_capacity: usize,

    /// Output channel i plays buffer channel `channel_map[i]`
    ///
    /// None means identity mapping with `channels` output channels.
    pub channel_map: Option<Vec<usize>>,
}

impl Default for BufferingConfig {
    fn default() -> Self {
        Self {
            buffer_count: 8,
            frames_per_buffer: 4096,
            channels: 2,
            low_water_frames: None,
            high_water_frames: None,
            poll_interval_ms: 5,
            event_capacity: 256,
            channel_map: None,
        }
    }
}

impl BufferingConfig {
    /// Pool capacity in frames
    pub fn capacity_frames(&self) -> u64 {
        self.buffer_count as u64 * self.frames_per_buffer as u64
    }

    /// Effective low-water mark in frames
    pub fn low_water(&self) -> u64 {
        self.low_water_frames
            .unwrap_or_else(|| self.capacity_frames() / 2)
    }

    /// Effective high-water mark in frames
    pub fn high_water(&self) -> u64 {
        self.high_water_frames
            .unwrap_or_else(|| self.capacity_frames())
    }

    /// Number of channels the render supplier writes per frame
    pub fn output_channels(&self) -> usize {
        self.channel_map
            .as_ref()
            .map(|map| map.len())
            .unwrap_or(self.channels)
    }

    /// Check settings for consistency
    pub fn validate(&self) -> Result<()> {
        if self.buffer_count < 2 {
            return Err(Error::Config(format!(
                "buffer_count must be at least 2 (got {})",
                self.buffer_count
            )));
        }
        if self.frames_per_buffer == 0 {
            return Err(Error::Config("frames_per_buffer must be non-zero".to_string()));
        }
        if self.channels == 0 {
            return Err(Error::Config("channels must be non-zero".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be non-zero".to_string()));
        }

        let low = self.low_water();
        let high = self.high_water();
        if low == 0 {
            return Err(Error::Config("low_water_frames must be non-zero".to_string()));
        }
        if low > high {
            return Err(Error::Config(format!(
                "low_water_frames ({}) exceeds high_water_frames ({})",
                low, high
            )));
        }
        if high > self.capacity_frames() {
            return Err(Error::Config(format!(
                "high_water_frames ({}) exceeds pool capacity ({} frames)",
                high,
                self.capacity_frames()
            )));
        }

        if let Some(map) = &self.channel_map {
            if map.is_empty() {
                return Err(Error::Config("channel_map must not be empty".to_string()));
            }
        }

        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Buffering pipeline settings
    pub buffering: BufferingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Load the config file named on the command line, by `READAHEAD_CONFIG`,
    /// or found in the platform config directory. Falls back to defaults.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let path = readahead_common::config::resolve_config_path(cli_path, CONFIG_ENV_VAR);
        let config: TomlConfig = readahead_common::config::load_or_default(path.as_deref())?;
        Ok(config)
    }
}
