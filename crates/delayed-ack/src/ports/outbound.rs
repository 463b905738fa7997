//! Outbound (Driven) ports.
//!
//! These traits define what the scheduler needs from the outside world: a
//! messaging transport, a clock and a tick source. All three are injected so
//! tests can drive time deterministically.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

use super::inbound::InputHandler;
use crate::domain::{Disposition, Timestamp};
use crate::error::{DispositionFailure, PayloadError, TransportError};

/// A message handle owned by the transport.
///
/// Move-only: whoever holds it is responsible for handing it back through
/// exactly one of [`ModuleTransport::send_disposition`] or
/// [`ModuleTransport::destroy`].
pub trait InboundMessage: Send + 'static {
    /// Raw payload bytes.
    fn body(&self) -> Result<&[u8], PayloadError>;
}

/// Messaging session for a module with a single input.
#[async_trait]
pub trait ModuleTransport: Send + Sync + 'static {
    /// Message handle type delivered to the input handler.
    type Message: InboundMessage;

    /// Registers the receive callback for `input_name`.
    ///
    /// # Errors
    /// - `InputAlreadyRegistered`: a different input is already bound
    /// - `Closed`: the session is gone
    fn register_input(
        &self,
        input_name: &str,
        handler: Arc<dyn InputHandler<Self::Message>>,
    ) -> Result<(), TransportError>;

    /// Reports the disposition of a message.
    ///
    /// On success the transport owns the message again. On failure the
    /// message is returned inside [`DispositionFailure`] and must be
    /// released with [`destroy`](Self::destroy).
    ///
    /// Implementations must resolve within `deadline`. A broker that has not
    /// confirmed by then yields `TransportError::TimedOut` with the message
    /// handed back, never a dropped handle.
    async fn send_disposition(
        &self,
        message: Self::Message,
        disposition: Disposition,
        deadline: Duration,
    ) -> Result<(), DispositionFailure<Self::Message>>;

    /// Releases a message locally without telling the broker.
    fn destroy(&self, message: Self::Message);

    /// Whether [`do_work`](Self::do_work) must be called on every tick.
    fn requires_pump(&self) -> bool {
        false
    }

    /// Cooperative pump for transports without their own worker thread.
    fn do_work(&self) {}

    /// Tears down the session.
    async fn close(&self);
}

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Manually driven time source for tests and simulations.
#[derive(Debug, Default)]
pub struct MockTimeSource {
    time: AtomicU64,
}

impl MockTimeSource {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.time.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, time: Timestamp) {
        self.time.store(time, Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.time.load(Ordering::SeqCst)
    }
}

/// Source of scheduler wake-ups.
#[async_trait]
pub trait Ticker: Send {
    /// Waits for the next tick. Returns `false` once no more ticks will come.
    async fn tick(&mut self) -> bool;
}

/// Fixed-period ticker backed by `tokio::time::interval`.
///
/// Missed ticks are skipped rather than bursted. Must be created inside a
/// Tokio runtime.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Ticker fired explicitly through a [`TickHandle`].
///
/// Ends once every handle is dropped and queued ticks are consumed.
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

/// Sending half of a [`ManualTicker`].
#[derive(Clone)]
pub struct TickHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl ManualTicker {
    pub fn new() -> (Self, TickHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, TickHandle { tx })
    }
}

impl TickHandle {
    /// Queues one tick. Returns `false` if the ticker is gone.
    pub fn fire(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}
