//! Pending message queue.
//!
//! FIFO of received-but-unsettled messages plus the global receive counter.
//! Both live behind one lock so the scheduler never sees a counter that
//! disagrees with the queue contents.
//!
//! Access pattern:
//! - Receiver: append only (`enqueue`)
//! - Scheduler: remove only (`detach_eligible`, `drain`)

use parking_lot::Mutex;
use std::collections::VecDeque;

use super::entities::{PendingMessage, Timestamp};
use super::policy::DelayPolicy;

/// Ordered set of pending messages, oldest first.
#[derive(Debug)]
pub struct PendingQueue<M> {
    entries: VecDeque<PendingMessage<M>>,
    received_total: u64,
}

impl<M> PendingQueue<M> {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            received_total: 0,
        }
    }

    /// Appends a message at the tail and bumps the receive counter.
    ///
    /// Returns the sequence number assigned to the message.
    pub fn push(&mut self, message: M, arrival_time: Timestamp) -> u64 {
        let sequence = self.received_total;
        self.entries
            .push_back(PendingMessage::new(sequence, message, arrival_time));
        self.received_total = self.received_total.saturating_add(1);
        sequence
    }

    /// Removes every entry old enough under `policy` and returns them in
    /// arrival order. Younger entries keep their relative order.
    pub fn detach_eligible(&mut self, now: Timestamp, policy: &DelayPolicy) -> Detached<M> {
        let threshold_ms = policy.threshold(self.received_total);

        let (eligible, waiting): (VecDeque<_>, VecDeque<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| entry.is_eligible(now, threshold_ms));
        self.entries = waiting;

        Detached {
            entries: Vec::from(eligible),
            threshold_ms,
            received_total: self.received_total,
            remaining: self.entries.len(),
        }
    }

    /// Removes every entry regardless of age.
    pub fn drain(&mut self) -> Vec<PendingMessage<M>> {
        self.entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn received_total(&self) -> u64 {
        self.received_total
    }

    /// Sequences currently pending, oldest first.
    pub fn sequences(&self) -> Vec<u64> {
        self.entries.iter().map(|e| e.sequence).collect()
    }
}

impl<M> Default for PendingQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a scan: entries removed from the queue, now owned by the caller.
#[derive(Debug)]
pub struct Detached<M> {
    pub entries: Vec<PendingMessage<M>>,
    /// Threshold the scan used (ms).
    pub threshold_ms: u64,
    /// Receive counter observed by the scan.
    pub received_total: u64,
    /// Entries left behind.
    pub remaining: usize,
}

/// Shared state between the receive callback and the scheduler.
///
/// Replaces process-wide globals: both sides hold an `Arc<SinkContext>`.
#[derive(Debug)]
pub struct SinkContext<M> {
    queue: Mutex<PendingQueue<M>>,
}

impl<M> SinkContext<M> {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(PendingQueue::new()),
        }
    }

    /// Appends a message; see [`PendingQueue::push`].
    pub fn enqueue(&self, message: M, arrival_time: Timestamp) -> u64 {
        self.queue.lock().push(message, arrival_time)
    }

    /// Scans and detaches eligible entries under a single lock acquisition.
    pub fn detach_eligible(&self, now: Timestamp, policy: &DelayPolicy) -> Detached<M> {
        self.queue.lock().detach_eligible(now, policy)
    }

    pub fn drain(&self) -> Vec<PendingMessage<M>> {
        self.queue.lock().drain()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn received_total(&self) -> u64 {
        self.queue.lock().received_total()
    }

    pub fn pending_sequences(&self) -> Vec<u64> {
        self.queue.lock().sequences()
    }
}

impl<M> Default for SinkContext<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::DelayConfig;
    use std::sync::Arc;

    fn policy(low: u64, high: u64, start: u64, end: u64) -> DelayPolicy {
        DelayPolicy::new(&DelayConfig {
            low_delay_ms: low,
            high_delay_ms: high,
            slow_window_start: start,
            slow_window_end: end,
        })
    }

    #[test]
    fn test_push_assigns_sequences_in_order() {
        let mut queue = PendingQueue::new();
        assert_eq!(queue.push("a", 0), 0);
        assert_eq!(queue.push("b", 0), 1);
        assert_eq!(queue.push("c", 10), 2);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.received_total(), 3);
        assert_eq!(queue.sequences(), vec![0, 1, 2]);
    }

    #[test]
    fn test_detach_only_old_enough() {
        let mut queue = PendingQueue::new();
        queue.push("old", 0);
        queue.push("mid", 500);
        queue.push("new", 900);

        let detached = queue.detach_eligible(1_000, &policy(500, 0, 0, 0));

        let messages: Vec<_> = detached.entries.iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["old", "mid"]);
        assert_eq!(detached.threshold_ms, 500);
        assert_eq!(detached.remaining, 1);
        assert_eq!(queue.sequences(), vec![2]);
    }

    #[test]
    fn test_detach_keeps_order_of_skipped_entries() {
        // Arrival times out of order (clock stepped back) must not reorder the survivors.
        let mut queue = PendingQueue::new();
        queue.push(0, 2_000);
        queue.push(1, 0);
        queue.push(2, 2_500);
        queue.push(3, 100);

        let detached = queue.detach_eligible(1_500, &policy(1_000, 0, 0, 0));

        let sequences: Vec<_> = detached.entries.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 3]);
        assert_eq!(queue.sequences(), vec![0, 2]);
    }

    #[test]
    fn test_threshold_follows_counter() {
        let mut queue = PendingQueue::new();
        for _ in 0..3 {
            queue.push((), 0);
        }

        // Counter = 3 sits inside [3, 5): slow threshold applies.
        let detached = queue.detach_eligible(1_000, &policy(100, 5_000, 3, 5));
        assert!(detached.entries.is_empty());
        assert_eq!(detached.threshold_ms, 5_000);
        assert_eq!(detached.received_total, 3);

        queue.push((), 0);
        queue.push((), 0);

        // Counter = 5 leaves the window: everything is old enough.
        let detached = queue.detach_eligible(1_000, &policy(100, 5_000, 3, 5));
        assert_eq!(detached.entries.len(), 5);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_detached_entries_never_come_back() {
        let mut queue = PendingQueue::new();
        queue.push((), 0);

        assert_eq!(queue.detach_eligible(10, &policy(0, 0, 0, 0)).entries.len(), 1);
        assert_eq!(queue.detach_eligible(10, &policy(0, 0, 0, 0)).entries.len(), 0);
        assert_eq!(queue.received_total(), 1);
    }

    #[test]
    fn test_drain_empties_queue() {
        let mut queue = PendingQueue::new();
        queue.push('a', 0);
        queue.push('b', 0);

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.received_total(), 2);
    }

    #[test]
    fn test_context_concurrent_enqueue() {
        let context = Arc::new(SinkContext::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let context = Arc::clone(&context);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        context.enqueue((t, i), 0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(context.received_total(), 2_000);
        assert_eq!(context.pending_count(), 2_000);

        let mut sequences = context.pending_sequences();
        sequences.dedup();
        assert_eq!(sequences, (0..2_000).collect::<Vec<_>>());
    }
}
