//! Counter-dependent acknowledgement delay.
//!
//! A step function of the total number of messages received: inside the
//! slow window the consumer pretends to be slow, everywhere else it acks
//! promptly.

use super::config::DelayConfig;

/// Computes the minimum pending duration before a message may be acked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelayPolicy {
    low_delay_ms: u64,
    high_delay_ms: u64,
    slow_window_start: u64,
    slow_window_end: u64,
}

impl DelayPolicy {
    pub fn new(config: &DelayConfig) -> Self {
        Self {
            low_delay_ms: config.low_delay_ms,
            high_delay_ms: config.high_delay_ms,
            slow_window_start: config.slow_window_start,
            slow_window_end: config.slow_window_end,
        }
    }

    /// True when `received_total` falls in `[start, end)`.
    pub fn in_slow_window(&self, received_total: u64) -> bool {
        (self.slow_window_start..self.slow_window_end).contains(&received_total)
    }

    /// Threshold in milliseconds for the given receive counter.
    pub fn threshold(&self, received_total: u64) -> u64 {
        if self.in_slow_window(received_total) {
            self.high_delay_ms
        } else {
            self.low_delay_ms
        }
    }
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self::new(&DelayConfig::default())
    }
}
