//! Prometheus text export.
//!
//! Metrics are registered by their owning crates on the default registry;
//! this module only gathers and encodes them.

use prometheus::{Encoder, TextEncoder};

use crate::TelemetryError;

/// Encode all registered metrics as Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsEncode(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsEncode(e.to_string()))
}

/// Names of every metric family currently registered.
pub fn metric_family_names() -> Vec<String> {
    prometheus::gather()
        .iter()
        .map(|family| family.get_name().to_string())
        .collect()
}
