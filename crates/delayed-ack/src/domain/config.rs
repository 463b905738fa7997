//! Subsystem configuration with validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::entities::ShutdownPolicy;
use crate::error::ConfigError;
use crate::DEFAULT_INPUT_NAME;

/// Complete configuration for receiver and scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AckConfig {
    /// Input channel configuration
    pub input: InputConfig,
    /// Delay policy configuration
    pub delay: DelayConfig,
    /// Scheduler loop configuration
    pub scheduler: SchedulerConfig,
}

impl AckConfig {
    /// Minimal delays and a fast tick, for tests.
    pub fn for_testing() -> Self {
        Self {
            delay: DelayConfig {
                low_delay_ms: 1_000,
                high_delay_ms: 35_000,
                slow_window_start: 500,
                slow_window_end: 600,
            },
            scheduler: SchedulerConfig {
                tick_interval_ms: 100,
                disposition_timeout_ms: 500,
                shutdown_policy: ShutdownPolicy::Drain,
            },
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.name.trim().is_empty() {
            return Err(ConfigError::EmptyInputName);
        }

        if self.input.preview_bytes == 0 {
            return Err(ConfigError::ZeroPreview);
        }

        if self.delay.slow_window_start > self.delay.slow_window_end {
            return Err(ConfigError::InvalidSlowWindow {
                start: self.delay.slow_window_start,
                end: self.delay.slow_window_end,
            });
        }

        if self.scheduler.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval(
                "tick_interval_ms cannot be 0".into(),
            ));
        }

        if self.scheduler.disposition_timeout_ms == 0 {
            return Err(ConfigError::InvalidInterval(
                "disposition_timeout_ms cannot be 0".into(),
            ));
        }

        Ok(())
    }
}

/// Input channel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Name of the single input the module listens on
    pub name: String,
    /// Maximum number of payload bytes echoed to the log per message
    pub preview_bytes: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_INPUT_NAME.to_string(),
            preview_bytes: 64,
        }
    }
}

/// Delay policy configuration.
///
/// The slow window is half-open: `[slow_window_start, slow_window_end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    /// Threshold outside the slow window (ms)
    pub low_delay_ms: u64,
    /// Threshold inside the slow window (ms)
    pub high_delay_ms: u64,
    /// First receive count of the slow window
    pub slow_window_start: u64,
    /// First receive count after the slow window
    pub slow_window_end: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            low_delay_ms: 1_000,   // 1 second
            high_delay_ms: 35_000, // 35 seconds
            slow_window_start: 500,
            slow_window_end: 600,
        }
    }
}

/// Scheduler loop configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Polling period (ms)
    pub tick_interval_ms: u64,
    /// Upper bound on a single disposition call (ms)
    pub disposition_timeout_ms: u64,
    /// What to do with pending messages on shutdown
    pub shutdown_policy: ShutdownPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            disposition_timeout_ms: 5_000,
            shutdown_policy: ShutdownPolicy::Drain,
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn disposition_timeout(&self) -> Duration {
        Duration::from_millis(self.disposition_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AckConfig::default();
        assert_eq!(config.input.name, "input");
        assert_eq!(config.input.preview_bytes, 64);
        assert_eq!(config.delay.low_delay_ms, 1_000);
        assert_eq!(config.delay.high_delay_ms, 35_000);
        assert_eq!(config.delay.slow_window_start, 500);
        assert_eq!(config.delay.slow_window_end, 600);
        assert_eq!(config.scheduler.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.scheduler.shutdown_policy, ShutdownPolicy::Drain);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_window() {
        let mut config = AckConfig::default();
        config.delay.slow_window_start = 700;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidSlowWindow {
                start: 700,
                end: 600
            })
        );
    }

    #[test]
    fn test_rejects_zero_tick() {
        let mut config = AckConfig::default();
        config.scheduler.tick_interval_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidInterval(_))
        ));
    }

    #[test]
    fn test_rejects_blank_input_and_zero_preview() {
        let mut config = AckConfig::default();
        config.input.name = "  ".into();
        assert_eq!(config.validate(), Err(ConfigError::EmptyInputName));

        let mut config = AckConfig::default();
        config.input.preview_bytes = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroPreview));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AckConfig = serde_json::from_str(
            r#"{ "delay": { "high_delay_ms": 5000 }, "scheduler": { "shutdown_policy": "abandon" } }"#,
        )
        .unwrap();

        assert_eq!(config.delay.high_delay_ms, 5_000);
        assert_eq!(config.delay.low_delay_ms, 1_000);
        assert_eq!(config.scheduler.shutdown_policy, ShutdownPolicy::Abandon);
        assert_eq!(config.input.name, "input");
    }
}
