//! # Sink Configuration
//!
//! Unified configuration for the receiver, the scheduler and the transport.
//!
//! ## Sources (later wins)
//!
//! 1. Built-in defaults
//! 2. JSON file named by `SINK_CONFIG_FILE`
//! 3. `SINK_*` environment overrides
//!
//! Every section is optional in the file; missing keys keep their defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

use delayed_ack::{AckConfig, ConfigError, DelayConfig, InputConfig, SchedulerConfig};

/// Transport kinds this build can connect to.
pub const LOOPBACK_TRANSPORT: &str = "loopback";

/// Complete sink configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Input channel configuration.
    pub input: InputConfig,
    /// Delay policy configuration.
    pub delay: DelayConfig,
    /// Scheduler loop configuration.
    pub scheduler: SchedulerConfig,
    /// Transport configuration.
    pub transport: TransportConfig,
}

/// Transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Which transport to connect.
    pub kind: String,
    /// Whether the scheduler must pump the transport on every tick.
    pub requires_pump: bool,
    /// Synthetic traffic for the loopback transport.
    pub feed: FeedConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: LOOPBACK_TRANSPORT.to_string(),
            requires_pump: false,
            feed: FeedConfig::default(),
        }
    }
}

/// Synthetic message feed. Disabled when `interval_ms` is 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub interval_ms: u64,
    pub payload: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval_ms: 0,
            payload: "loopback message".to_string(),
        }
    }
}

impl FeedConfig {
    pub fn is_enabled(&self) -> bool {
        self.interval_ms > 0
    }
}

impl SinkConfig {
    /// Defaults, then `SINK_CONFIG_FILE`, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| env::var(key).ok())
    }

    /// [`SinkConfig::load`] against an arbitrary variable lookup.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup("SINK_CONFIG_FILE") {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::File(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| ConfigError::File(format!("{}: {}", path.display(), e)))
    }

    /// Applies `SINK_*` overrides. Unparseable values are errors, not ignored.
    pub fn apply_env(
        &mut self,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(name) = lookup("SINK_INPUT_NAME") {
            self.input.name = name;
        }
        override_parsed(lookup, "SINK_PREVIEW_BYTES", &mut self.input.preview_bytes)?;

        override_parsed(lookup, "SINK_LOW_DELAY_MS", &mut self.delay.low_delay_ms)?;
        override_parsed(lookup, "SINK_HIGH_DELAY_MS", &mut self.delay.high_delay_ms)?;
        override_parsed(
            lookup,
            "SINK_SLOW_WINDOW_START",
            &mut self.delay.slow_window_start,
        )?;
        override_parsed(lookup, "SINK_SLOW_WINDOW_END", &mut self.delay.slow_window_end)?;

        override_parsed(
            lookup,
            "SINK_TICK_INTERVAL_MS",
            &mut self.scheduler.tick_interval_ms,
        )?;
        override_parsed(
            lookup,
            "SINK_DISPOSITION_TIMEOUT_MS",
            &mut self.scheduler.disposition_timeout_ms,
        )?;
        override_parsed(
            lookup,
            "SINK_SHUTDOWN_POLICY",
            &mut self.scheduler.shutdown_policy,
        )?;

        if let Some(kind) = lookup("SINK_TRANSPORT") {
            self.transport.kind = kind;
        }
        if let Some(raw) = lookup("SINK_REQUIRES_PUMP") {
            self.transport.requires_pump = parse_flag("SINK_REQUIRES_PUMP", &raw)?;
        }
        override_parsed(
            lookup,
            "SINK_FEED_INTERVAL_MS",
            &mut self.transport.feed.interval_ms,
        )?;
        if let Some(payload) = lookup("SINK_FEED_PAYLOAD") {
            self.transport.feed.payload = payload;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ack_config().validate()?;

        if self.transport.kind.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "transport.kind".into(),
                value: self.transport.kind.clone(),
            });
        }

        Ok(())
    }

    /// The receiver and scheduler part of the configuration.
    pub fn ack_config(&self) -> AckConfig {
        AckConfig {
            input: self.input.clone(),
            delay: self.delay.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

fn override_parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) -> Result<(), ConfigError> {
    if let Some(raw) = lookup(key) {
        *target = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
        })?;
    }
    Ok(())
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delayed_ack::ShutdownPolicy;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = SinkConfig::load_with(vars(&[])).unwrap();
        assert_eq!(config, SinkConfig::default());
        assert_eq!(config.input.name, "input");
        assert_eq!(config.delay.low_delay_ms, 1_000);
        assert_eq!(config.delay.high_delay_ms, 35_000);
        assert_eq!(config.transport.kind, LOOPBACK_TRANSPORT);
        assert!(!config.transport.feed.is_enabled());
    }

    #[test]
    fn test_env_overrides() {
        let config = SinkConfig::load_with(vars(&[
            ("SINK_INPUT_NAME", "telemetry"),
            ("SINK_PREVIEW_BYTES", "16"),
            ("SINK_LOW_DELAY_MS", "250"),
            ("SINK_SLOW_WINDOW_START", "10"),
            ("SINK_SLOW_WINDOW_END", "20"),
            ("SINK_SHUTDOWN_POLICY", "Abandon"),
            ("SINK_REQUIRES_PUMP", "yes"),
            ("SINK_FEED_INTERVAL_MS", "500"),
        ]))
        .unwrap();

        assert_eq!(config.input.name, "telemetry");
        assert_eq!(config.input.preview_bytes, 16);
        assert_eq!(config.delay.low_delay_ms, 250);
        assert_eq!(config.delay.high_delay_ms, 35_000);
        assert_eq!(config.delay.slow_window_start, 10);
        assert_eq!(config.delay.slow_window_end, 20);
        assert_eq!(config.scheduler.shutdown_policy, ShutdownPolicy::Abandon);
        assert!(config.transport.requires_pump);
        assert!(config.transport.feed.is_enabled());
    }

    #[test]
    fn test_bad_env_value_is_an_error() {
        let err = SinkConfig::load_with(vars(&[("SINK_TICK_INTERVAL_MS", "fast")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "SINK_TICK_INTERVAL_MS".into(),
                value: "fast".into(),
            }
        );

        let err = SinkConfig::load_with(vars(&[("SINK_REQUIRES_PUMP", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validation_runs_after_overrides() {
        let err = SinkConfig::load_with(vars(&[
            ("SINK_SLOW_WINDOW_START", "700"),
            ("SINK_SLOW_WINDOW_END", "600"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidSlowWindow { start: 700, end: 600 });

        let err = SinkConfig::load_with(vars(&[("SINK_TRANSPORT", " ")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_file_then_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "input": {{ "name": "from-file" }},
                "delay": {{ "high_delay_ms": 5000 }},
                "transport": {{ "feed": {{ "interval_ms": 100 }} }}
            }}"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let config = SinkConfig::load_with(vars(&[
            ("SINK_CONFIG_FILE", &path),
            ("SINK_HIGH_DELAY_MS", "6000"),
        ]))
        .unwrap();

        assert_eq!(config.input.name, "from-file");
        assert_eq!(config.input.preview_bytes, 64);
        assert_eq!(config.delay.high_delay_ms, 6_000);
        assert_eq!(config.transport.feed.interval_ms, 100);
        assert_eq!(config.transport.feed.payload, "loopback message");
    }

    #[test]
    fn test_unreadable_file() {
        let err = SinkConfig::from_file("/nonexistent/sink.json").unwrap_err();
        assert!(matches!(err, ConfigError::File(_)));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            SinkConfig::from_file(file.path()),
            Err(ConfigError::File(_))
        ));
    }

    #[test]
    fn test_ack_config_projection() {
        let mut config = SinkConfig::default();
        config.delay.low_delay_ms = 42;
        let ack = config.ack_config();
        assert_eq!(ack.delay.low_delay_ms, 42);
        assert_eq!(ack.input, config.input);
    }
}
