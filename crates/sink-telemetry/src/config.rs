//! Telemetry configuration from environment variables.

use serde::Serialize;
use std::env;

/// Configuration for logging and metrics export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryConfig {
    /// Service name attached to startup and shutdown logs
    pub service_name: String,

    /// Default level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Verbose transport tracing: forces the default level to `trace`
    pub trace: bool,

    /// JSON formatted logs instead of ANSI text
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "edge-sink".to_string(),
            log_level: "info".to_string(),
            trace: false,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SINK_SERVICE_NAME`: Service name (default: edge-sink)
    /// - `SINK_LOG_LEVEL`: Log level (default: info)
    /// - `SINK_TRACE`: Force trace level (default: false)
    /// - `SINK_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    ///
    /// `RUST_LOG` is not read here; it is honoured directly by the filter.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let is_container = lookup("KUBERNETES_SERVICE_HOST").is_some()
            || lookup("DOCKER_CONTAINER").is_some()
            || lookup("IOTEDGE_MODULEID").is_some();
        let defaults = Self::default();

        Self {
            service_name: lookup("SINK_SERVICE_NAME").unwrap_or(defaults.service_name),

            log_level: lookup("SINK_LOG_LEVEL").unwrap_or(defaults.log_level),

            trace: lookup("SINK_TRACE").map(|v| is_truthy(&v)).unwrap_or(false),

            json_logs: lookup("SINK_JSON_LOGS")
                .map(|v| is_truthy(&v))
                .unwrap_or(is_container),
        }
    }

    /// The level used when `RUST_LOG` is unset.
    pub fn effective_level(&self) -> &str {
        if self.trace {
            "trace"
        } else {
            &self.log_level
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
