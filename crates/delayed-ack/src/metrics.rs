//! # Delayed Ack Metrics
//!
//! Prometheus metrics for the pending queue and its settlements.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! delayed-ack = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `sink_messages_received_total` - Counter of messages received on the input
//! - `sink_messages_acknowledged_total` - Counter of messages acknowledged
//! - `sink_messages_discarded_total` - Counter of messages discarded (by reason)
//! - `sink_pending_messages` - Gauge of messages awaiting disposition
//! - `sink_ack_age_seconds` - Histogram of pending duration at settlement

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    exponential_buckets, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, Histogram, IntCounter, IntCounterVec, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total messages received
    pub static ref MESSAGES_RECEIVED: IntCounter = register_int_counter!(
        "sink_messages_received_total",
        "Total number of messages received on the input"
    )
    .expect("Failed to create MESSAGES_RECEIVED metric");

    /// Total messages acknowledged
    pub static ref MESSAGES_ACKNOWLEDGED: IntCounter = register_int_counter!(
        "sink_messages_acknowledged_total",
        "Total number of messages acknowledged"
    )
    .expect("Failed to create MESSAGES_ACKNOWLEDGED metric");

    /// Total messages discarded, labeled by reason
    pub static ref MESSAGES_DISCARDED: IntCounterVec = register_int_counter_vec!(
        "sink_messages_discarded_total",
        "Total number of messages discarded without acknowledgement",
        &["reason"]
    )
    .expect("Failed to create MESSAGES_DISCARDED metric");

    /// Messages currently pending
    pub static ref PENDING_MESSAGES: IntGauge = register_int_gauge!(
        "sink_pending_messages",
        "Number of messages awaiting disposition"
    )
    .expect("Failed to create PENDING_MESSAGES metric");

    /// Pending duration at settlement
    pub static ref ACK_AGE: Histogram = register_histogram!(
        "sink_ack_age_seconds",
        "Time a message spent pending before settlement",
        exponential_buckets(0.1, 2.0, 12).expect("valid buckets")
    )
    .expect("Failed to create ACK_AGE metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a message received
#[cfg(feature = "metrics")]
pub fn record_message_received() {
    MESSAGES_RECEIVED.inc();
}

/// Record a message acknowledged after `age_ms` of pendency
#[cfg(feature = "metrics")]
pub fn record_acknowledged(age_ms: u64) {
    MESSAGES_ACKNOWLEDGED.inc();
    ACK_AGE.observe(age_ms as f64 / 1000.0);
}

/// Record a message discarded with reason
#[cfg(feature = "metrics")]
pub fn record_discarded(reason: &str) {
    MESSAGES_DISCARDED.with_label_values(&[reason]).inc();
}

/// Update pending gauge
#[cfg(feature = "metrics")]
pub fn set_pending(count: usize) {
    PENDING_MESSAGES.set(count as i64);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_message_received() {}

#[cfg(not(feature = "metrics"))]
pub fn record_acknowledged(_age_ms: u64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_discarded(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn set_pending(_count: usize) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_callable_in_any_build() {
        record_message_received();
        record_acknowledged(1_500);
        record_discarded("timed_out");
        set_pending(3);
    }
}
