//! Structured logging.
//!
//! JSON output carries `timestamp`, `level`, `target`, the message and every
//! structured field (`sequence`, `age_ms`, `delay_ms`, ...), which log
//! shippers can index without parsing the text.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Handle describing the installed subscriber.
#[derive(Debug)]
pub struct LoggingHandle {
    filter: String,
    json: bool,
}

impl LoggingHandle {
    /// The filter directive in effect.
    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn is_json(&self) -> bool {
        self.json
    }
}

/// `RUST_LOG` when set, otherwise the configured level.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directive = config.effective_level();
    EnvFilter::try_new(directive).map_err(|e| TelemetryError::InvalidFilter {
        directive: directive.to_string(),
        reason: e.to_string(),
    })
}

/// Installs the global `tracing` subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_logging(config: &TelemetryConfig) -> Result<LoggingHandle, TelemetryError> {
    let env_filter = build_filter(config)?;
    let filter = env_filter.to_string();

    if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;
    }

    Ok(LoggingHandle {
        filter,
        json: config.json_logs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_rejected() {
        // Only meaningful when RUST_LOG is not driving the filter.
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = TelemetryConfig {
            log_level: "sink=loud".into(),
            ..TelemetryConfig::default()
        };
        assert!(matches!(
            build_filter(&config),
            Err(TelemetryError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_trace_filter() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = TelemetryConfig {
            trace: true,
            ..TelemetryConfig::default()
        };
        assert_eq!(build_filter(&config).unwrap().to_string(), "trace");
    }

    #[test]
    fn test_second_init_fails() {
        let config = TelemetryConfig::default();
        let first = init_logging(&config);
        let second = init_logging(&config);
        // Whichever test installed the global subscriber first, the second
        // attempt in this process cannot succeed.
        assert!(first.is_err() || second.is_err());
        assert!(matches!(second, Err(TelemetryError::SubscriberInit(_))));
    }
}
