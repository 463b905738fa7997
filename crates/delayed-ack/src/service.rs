//! Ack Scheduler - polls the pending queue and settles messages that have
//! waited long enough.
//!
//! ## Tick
//!
//! 1. Read `now` from the injected clock.
//! 2. Under the queue lock, detach every entry with `age >= threshold(counter)`.
//! 3. Outside the lock, send `Accepted` for each detached entry, oldest first,
//!    each call given `disposition_timeout` as its deadline.
//!    - success: ownership goes back to the transport
//!    - failure or timeout: the handle comes back and is destroyed locally
//!
//! A message is attempted at most once; there is no retry. Once a call in a
//! pass times out the transport is treated as stalled: the rest of that pass
//! is destroyed without an attempt, so a pass never waits on more than one
//! deadline.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::{
    AckConfig, DelayPolicy, DiscardReason, Disposition, PendingMessage, SettledMessage,
    Settlement, ShutdownPolicy, ShutdownReport, SinkContext, TickReport, Timestamp,
};
use crate::error::TransportError;
use crate::metrics;
use crate::ports::{ModuleTransport, Ticker, TimeSource};

/// Delayed acknowledgement scheduler.
pub struct AckScheduler<T, C>
where
    T: ModuleTransport,
    C: TimeSource,
{
    context: Arc<SinkContext<T::Message>>,
    transport: Arc<T>,
    clock: Arc<C>,
    policy: DelayPolicy,
    disposition_timeout: Duration,
    shutdown_policy: ShutdownPolicy,
}

impl<T, C> AckScheduler<T, C>
where
    T: ModuleTransport,
    C: TimeSource,
{
    pub fn new(
        context: Arc<SinkContext<T::Message>>,
        transport: Arc<T>,
        clock: Arc<C>,
        config: &AckConfig,
    ) -> Self {
        Self {
            context,
            transport,
            clock,
            policy: DelayPolicy::new(&config.delay),
            disposition_timeout: config.scheduler.disposition_timeout(),
            shutdown_policy: config.scheduler.shutdown_policy,
        }
    }

    pub fn policy(&self) -> &DelayPolicy {
        &self.policy
    }

    pub fn pending_count(&self) -> usize {
        self.context.pending_count()
    }

    /// Runs one scan of the pending queue.
    pub async fn run_tick(&self) -> TickReport {
        let now = self.clock.now();
        let detached = self.context.detach_eligible(now, &self.policy);
        metrics::set_pending(detached.remaining);

        if !detached.entries.is_empty() {
            debug!(
                eligible = detached.entries.len(),
                remaining = detached.remaining,
                received_total = detached.received_total,
                delay_ms = detached.threshold_ms,
                "Settling eligible messages"
            );
        }

        let settled = self
            .settle_all(detached.entries, Disposition::Accepted, now)
            .await;

        TickReport {
            settled,
            still_pending: detached.remaining,
            threshold_ms: detached.threshold_ms,
        }
    }

    /// Polls until the ticker ends or `shutdown` flips to `true` (or its
    /// sender is dropped), then applies the shutdown policy.
    ///
    /// Queued ticks take priority over the shutdown signal.
    pub async fn run<K: Ticker>(
        &self,
        mut ticker: K,
        mut shutdown: watch::Receiver<bool>,
    ) -> ShutdownReport {
        info!(
            policy = ?self.policy,
            shutdown_policy = ?self.shutdown_policy,
            "Waiting for incoming messages"
        );
        let mut ticks = 0u64;

        loop {
            if *shutdown.borrow() {
                info!("Shutdown signal received");
                break;
            }

            tokio::select! {
                biased;
                more = ticker.tick() => {
                    if !more {
                        debug!("Tick source exhausted");
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!("Shutdown sender dropped");
                        break;
                    }
                    continue;
                }
            }

            if self.transport.requires_pump() {
                self.transport.do_work();
            }
            self.run_tick().await;
            ticks += 1;
        }

        self.shutdown(ticks).await
    }

    /// Settles everything still queued according to the shutdown policy.
    async fn shutdown(&self, ticks: u64) -> ShutdownReport {
        let remaining = self.context.drain();
        let disposition = match self.shutdown_policy {
            ShutdownPolicy::Drain => Disposition::Accepted,
            ShutdownPolicy::Abandon => Disposition::Abandoned,
        };

        info!(
            pending = remaining.len(),
            policy = ?self.shutdown_policy,
            ticks,
            "Settling pending messages before exit"
        );

        let now = self.clock.now();
        let settled = self.settle_all(remaining, disposition, now).await;
        metrics::set_pending(self.context.pending_count());

        ShutdownReport {
            policy: self.shutdown_policy,
            ticks,
            settled,
        }
    }

    /// Settles `entries` in order, destroying whatever is left once the
    /// transport has missed a deadline.
    async fn settle_all(
        &self,
        entries: Vec<PendingMessage<T::Message>>,
        disposition: Disposition,
        now: Timestamp,
    ) -> Vec<SettledMessage> {
        let mut settled = Vec::with_capacity(entries.len());
        let mut stalled = false;

        for entry in entries {
            let outcome = if stalled {
                self.release(entry, DiscardReason::TransportStalled, now)
            } else {
                self.settle(entry, disposition, now).await
            };
            if outcome.settlement == Settlement::Discarded(DiscardReason::TimedOut) {
                stalled = true;
            }
            settled.push(outcome);
        }

        let stalled_reason = Settlement::Discarded(DiscardReason::TransportStalled);
        let skipped = settled
            .iter()
            .filter(|s| s.settlement == stalled_reason)
            .count();
        if skipped > 0 {
            warn!(
                skipped,
                "Transport stalled, destroyed remaining messages without disposition"
            );
        }

        settled
    }

    async fn settle(
        &self,
        entry: PendingMessage<T::Message>,
        disposition: Disposition,
        now: Timestamp,
    ) -> SettledMessage {
        let PendingMessage {
            sequence,
            message,
            arrival_time,
        } = entry;
        let age_ms = now.saturating_sub(arrival_time);

        let settlement = match self
            .transport
            .send_disposition(message, disposition, self.disposition_timeout)
            .await
        {
            Ok(()) if disposition == Disposition::Accepted => {
                info!(sequence, age_ms, "Acknowledged message");
                Settlement::Acknowledged
            }
            Ok(()) => {
                info!(sequence, age_ms, disposition = disposition.as_str(), "Released message");
                Settlement::Discarded(DiscardReason::Abandoned)
            }
            Err(failure) => {
                warn!(
                    sequence,
                    error = %failure.error,
                    "Disposition failed, destroying message"
                );
                self.transport.destroy(failure.message);
                let reason = match failure.error {
                    TransportError::TimedOut { .. } => DiscardReason::TimedOut,
                    other => DiscardReason::TransportRejected(other.to_string()),
                };
                Settlement::Discarded(reason)
            }
        };

        record(&settlement, age_ms);
        SettledMessage {
            sequence,
            age_ms,
            settlement,
        }
    }

    /// Destroys a message without contacting the broker.
    fn release(
        &self,
        entry: PendingMessage<T::Message>,
        reason: DiscardReason,
        now: Timestamp,
    ) -> SettledMessage {
        let age_ms = entry.age(now);
        let sequence = entry.sequence;
        self.transport.destroy(entry.message);

        let settlement = Settlement::Discarded(reason);
        record(&settlement, age_ms);
        SettledMessage {
            sequence,
            age_ms,
            settlement,
        }
    }
}

fn record(settlement: &Settlement, age_ms: u64) {
    match settlement {
        Settlement::Acknowledged => metrics::record_acknowledged(age_ms),
        Settlement::Discarded(reason) => metrics::record_discarded(reason.label()),
    }
}
