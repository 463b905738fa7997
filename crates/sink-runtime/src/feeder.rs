//! Synthetic traffic for the loopback transport.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use delayed_ack::{InMemoryTransport, TransportError};

use crate::container::FeedConfig;

/// Delivers one message per `interval_ms` until shutdown or until the
/// transport closes. Returns the number of messages delivered.
pub async fn run_feeder(
    transport: Arc<InMemoryTransport>,
    config: FeedConfig,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let mut interval = tokio::time::interval(Duration::from_millis(config.interval_ms.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut delivered = 0u64;

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = interval.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }

        let body = format!("{} #{}", config.payload, delivered);
        match transport.deliver(body) {
            Ok(_) => delivered += 1,
            Err(TransportError::Closed) => break,
            Err(e) => warn!(error = %e, "Feeder delivery failed"),
        }
    }

    debug!(delivered, "Feeder stopped");
    delivered
}
