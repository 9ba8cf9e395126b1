//! Configuration management
//!
//! Tuning constants of the interpolation engine, loadable from TOML.
//!
//! ```toml
//! max_offset_ms = 100
//! offset_max_display_frames = 3
//! offset_max_event_frames = 3
//! display_grace_frames = 5
//! event_grace_frames = 10
//! history_capacity = 66
//! average_window = 6
//! anchor_lead_ms = 12
//! ```
//!
//! Every field is optional; missing fields take the defaults shown above.
//!
//! # Latency limits
//!
//! The hard limit (`max_offset_ms`) keeps a transient hiccup in the input
//! stream from leaving the interpolation point stuck far in the past. 40ms
//! would be enough for a 60Hz display, but a 30Hz panel needs more than three
//! frames, so the hard limit is generous and a soft limit derived from the
//! refresh and input rates does the fine-grained clamping.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the interpolation engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpolationConfig {
    /// Hard upper bound for the latency offset (ms)
    #[serde(default = "default_max_offset_ms")]
    pub max_offset_ms: u32,

    /// Soft limit in display frames
    #[serde(default = "default_offset_max_display_frames")]
    pub offset_max_display_frames: u32,

    /// Soft limit in input event intervals
    #[serde(default = "default_offset_max_event_frames")]
    pub offset_max_event_frames: u32,

    /// Idle display frames before a device is considered timed out
    #[serde(default = "default_display_grace_frames")]
    pub display_grace_frames: u32,

    /// Idle input intervals before a device is considered timed out
    #[serde(default = "default_event_grace_frames")]
    pub event_grace_frames: u32,

    /// Maximum number of samples kept per gesture
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Number of newest samples used for the average event interval
    #[serde(default = "default_average_window")]
    pub average_window: usize,

    /// Lead of the synthesized zero-delta anchor before the first sample (ms)
    #[serde(default = "default_anchor_lead_ms")]
    pub anchor_lead_ms: u32,
}

fn default_max_offset_ms() -> u32 {
    100
}
fn default_offset_max_display_frames() -> u32 {
    3
}
fn default_offset_max_event_frames() -> u32 {
    3
}
fn default_display_grace_frames() -> u32 {
    5
}
fn default_event_grace_frames() -> u32 {
    10
}
fn default_history_capacity() -> usize {
    66
}
fn default_average_window() -> usize {
    6
}
fn default_anchor_lead_ms() -> u32 {
    12
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            max_offset_ms: default_max_offset_ms(),
            offset_max_display_frames: default_offset_max_display_frames(),
            offset_max_event_frames: default_offset_max_event_frames(),
            display_grace_frames: default_display_grace_frames(),
            event_grace_frames: default_event_grace_frames(),
            history_capacity: default_history_capacity(),
            average_window: default_average_window(),
            anchor_lead_ms: default_anchor_lead_ms(),
        }
    }
}

impl InterpolationConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: InterpolationConfig =
            toml::from_str(content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_offset_ms == 0 {
            anyhow::bail!("max_offset_ms must be greater than 0");
        }

        if self.offset_max_display_frames == 0 || self.offset_max_event_frames == 0 {
            anyhow::bail!(
                "Soft offset limits must be at least one frame (display={}, event={})",
                self.offset_max_display_frames,
                self.offset_max_event_frames
            );
        }

        if self.display_grace_frames == 0 || self.event_grace_frames == 0 {
            anyhow::bail!(
                "Grace periods must be at least one frame (display={}, event={})",
                self.display_grace_frames,
                self.event_grace_frames
            );
        }

        // An anchor plus at least one real sample must fit
        if self.history_capacity < 2 {
            anyhow::bail!(
                "history_capacity ({}) must be at least 2",
                self.history_capacity
            );
        }

        if self.average_window < 2 || self.average_window > self.history_capacity {
            anyhow::bail!(
                "average_window ({}) must be between 2 and history_capacity ({})",
                self.average_window,
                self.history_capacity
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = InterpolationConfig::default();
        assert_eq!(config.max_offset_ms, 100);
        assert_eq!(config.history_capacity, 66);
        assert_eq!(config.average_window, 6);
        assert_eq!(config.anchor_lead_ms, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = InterpolationConfig::from_toml_str("max_offset_ms = 60\n").unwrap();
        assert_eq!(config.max_offset_ms, 60);
        assert_eq!(config.display_grace_frames, 5);
        assert_eq!(config.history_capacity, 66);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = InterpolationConfig::from_toml_str("").unwrap();
        assert_eq!(config, InterpolationConfig::default());
    }

    #[test]
    fn test_validation_rejects_small_window() {
        let mut config = InterpolationConfig::default();
        config.average_window = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_window_larger_than_capacity() {
        let mut config = InterpolationConfig::default();
        config.history_capacity = 4;
        config.average_window = 6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_grace() {
        let result = InterpolationConfig::from_toml_str("event_grace_frames = 0");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "history_capacity = 32").unwrap();
        writeln!(file, "anchor_lead_ms = 8").unwrap();

        let config = InterpolationConfig::load(file.path()).unwrap();
        assert_eq!(config.history_capacity, 32);
        assert_eq!(config.anchor_lead_ms, 8);
    }

    #[test]
    fn test_load_missing_file() {
        let result = InterpolationConfig::load("/nonexistent/interpolation.toml");
        assert!(result.is_err());
    }
}
