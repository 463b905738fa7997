//! Core domain entities.

use serde::{Deserialize, Serialize};

/// Timestamp in milliseconds since UNIX epoch.
pub type Timestamp = u64;

/// Terminal outcome reported back to the transport for a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Message processed, broker may forget it.
    Accepted,
    /// Message refused, broker should not redeliver.
    Rejected,
    /// Message given up, broker should redeliver.
    Abandoned,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Abandoned => "abandoned",
        }
    }
}

/// What the receive callback tells the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackDisposition {
    /// Settled synchronously with the given disposition.
    Completed(Disposition),
    /// Disposition follows later through an explicit disposition call.
    AsyncAck,
}

/// A received message awaiting disposition.
///
/// Owns the transport handle until it is settled. Never mutated after
/// creation.
#[derive(Debug)]
pub struct PendingMessage<M> {
    /// Receive counter value at arrival (0-based).
    pub sequence: u64,
    /// The transport-owned message.
    pub message: M,
    /// When the message was received (ms).
    pub arrival_time: Timestamp,
}

impl<M> PendingMessage<M> {
    pub fn new(sequence: u64, message: M, arrival_time: Timestamp) -> Self {
        Self {
            sequence,
            message,
            arrival_time,
        }
    }

    /// Milliseconds spent pending as of `now`. A clock stepping backwards
    /// yields 0 rather than wrapping.
    pub fn age(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.arrival_time)
    }

    /// Ack once pending duration >= threshold.
    pub fn is_eligible(&self, now: Timestamp, threshold_ms: u64) -> bool {
        self.age(now) >= threshold_ms
    }
}

/// Why a message left the queue without being acknowledged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscardReason {
    /// The transport refused the disposition; the handle was destroyed locally.
    TransportRejected(String),
    /// The broker did not confirm before the deadline; the handle was
    /// destroyed locally.
    TimedOut,
    /// Not attempted: an earlier disposition in the same pass timed out.
    /// The handle was destroyed locally.
    TransportStalled,
    /// Released at shutdown without acknowledgement.
    Abandoned,
}

impl DiscardReason {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TransportRejected(_) => "transport_rejected",
            Self::TimedOut => "timed_out",
            Self::TransportStalled => "transport_stalled",
            Self::Abandoned => "abandoned",
        }
    }
}

/// Terminal state of a pending message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settlement {
    Acknowledged,
    Discarded(DiscardReason),
}

impl Settlement {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, Self::Acknowledged)
    }
}

/// A message that reached a terminal state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettledMessage {
    pub sequence: u64,
    /// Pending duration at the time it was detached (ms).
    pub age_ms: u64,
    pub settlement: Settlement,
}

/// Outcome of one scheduler tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Messages settled during this tick, in arrival order.
    pub settled: Vec<SettledMessage>,
    /// Messages left in the queue after the scan.
    pub still_pending: usize,
    /// Threshold applied during the scan (ms).
    pub threshold_ms: u64,
}

impl TickReport {
    pub fn acknowledged(&self) -> impl Iterator<Item = u64> + '_ {
        self.settled
            .iter()
            .filter(|s| s.settlement.is_acknowledged())
            .map(|s| s.sequence)
    }

    pub fn discarded(&self) -> impl Iterator<Item = u64> + '_ {
        self.settled
            .iter()
            .filter(|s| !s.settlement.is_acknowledged())
            .map(|s| s.sequence)
    }

    pub fn acknowledged_count(&self) -> usize {
        self.acknowledged().count()
    }

    pub fn discarded_count(&self) -> usize {
        self.discarded().count()
    }
}

/// What happens to messages still pending when the scheduler stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownPolicy {
    /// Acknowledge everything still pending, regardless of age.
    #[default]
    Drain,
    /// Abandon everything still pending so the broker redelivers it.
    Abandon,
}

impl std::str::FromStr for ShutdownPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drain" => Ok(Self::Drain),
            "abandon" => Ok(Self::Abandon),
            other => Err(format!("unknown shutdown policy '{}'", other)),
        }
    }
}

/// Outcome of the scheduler's final pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShutdownReport {
    pub policy: ShutdownPolicy,
    /// Ticks run before the stop signal.
    pub ticks: u64,
    /// Messages settled by the final pass, in arrival order.
    pub settled: Vec<SettledMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_saturates_on_clock_skew() {
        let pending = PendingMessage::new(0, (), 5_000);
        assert_eq!(pending.age(4_000), 0);
        assert_eq!(pending.age(6_500), 1_500);
    }

    #[test]
    fn test_eligible_at_exact_threshold() {
        let pending = PendingMessage::new(0, (), 1_000);

        assert!(!pending.is_eligible(1_999, 1_000));
        assert!(pending.is_eligible(2_000, 1_000));
        assert!(pending.is_eligible(9_000, 1_000));
    }

    #[test]
    fn test_younger_message_is_not_eligible() {
        // Only messages at least as old as the threshold qualify.
        let pending = PendingMessage::new(0, (), 10_000);
        assert!(!pending.is_eligible(10_500, 35_000));
    }

    #[test]
    fn test_tick_report_partitions_settlements() {
        let report = TickReport {
            settled: vec![
                SettledMessage {
                    sequence: 0,
                    age_ms: 1_000,
                    settlement: Settlement::Acknowledged,
                },
                SettledMessage {
                    sequence: 1,
                    age_ms: 1_000,
                    settlement: Settlement::Discarded(DiscardReason::TimedOut),
                },
                SettledMessage {
                    sequence: 2,
                    age_ms: 1_000,
                    settlement: Settlement::Acknowledged,
                },
            ],
            still_pending: 4,
            threshold_ms: 1_000,
        };

        assert_eq!(report.acknowledged().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(report.discarded().collect::<Vec<_>>(), vec![1]);
        assert_eq!(report.acknowledged_count(), 2);
        assert_eq!(report.discarded_count(), 1);
    }

    #[test]
    fn test_shutdown_policy_parse() {
        assert_eq!("drain".parse::<ShutdownPolicy>(), Ok(ShutdownPolicy::Drain));
        assert_eq!(
            " ABANDON ".parse::<ShutdownPolicy>(),
            Ok(ShutdownPolicy::Abandon)
        );
        assert!("retry".parse::<ShutdownPolicy>().is_err());
    }

    #[test]
    fn test_discard_reason_labels() {
        assert_eq!(
            DiscardReason::TransportRejected("x".into()).label(),
            "transport_rejected"
        );
        assert_eq!(DiscardReason::TimedOut.label(), "timed_out");
        assert_eq!(
            DiscardReason::TransportStalled.label(),
            "transport_stalled"
        );
        assert_eq!(DiscardReason::Abandoned.label(), "abandoned");
    }
}
