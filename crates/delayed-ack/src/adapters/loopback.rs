//! In-process loopback transport.
//!
//! Stands in for a broker session: messages are injected with `deliver()`
//! and every disposition/destroy call is recorded. Failures and latency can
//! be injected to exercise the scheduler's fallback paths.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{CallbackDisposition, Disposition};
use crate::error::{DispositionFailure, PayloadError, TransportError};
use crate::ports::{InboundMessage, InputHandler, ModuleTransport};

/// Message handle produced by [`InMemoryTransport`].
#[derive(Debug, PartialEq, Eq)]
pub struct LoopbackMessage {
    id: Uuid,
    body: Option<Vec<u8>>,
}

impl LoopbackMessage {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            body: Some(body.into()),
        }
    }

    /// A message whose payload cannot be extracted.
    pub fn without_body() -> Self {
        Self {
            id: Uuid::new_v4(),
            body: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl InboundMessage for LoopbackMessage {
    fn body(&self) -> Result<&[u8], PayloadError> {
        self.body.as_deref().ok_or(PayloadError::Empty)
    }
}

type Input = (String, Arc<dyn InputHandler<LoopbackMessage>>);

/// In-memory module transport.
pub struct InMemoryTransport {
    /// Registered input name and its handler.
    input: RwLock<Option<Input>>,
    /// Successful dispositions, in call order.
    dispositions: Mutex<Vec<(Uuid, Disposition)>>,
    /// Handles released through `destroy`.
    destroyed: Mutex<Vec<Uuid>>,
    /// Injected failures still to hand out.
    failures_pending: AtomicU64,
    /// Fail every disposition while set.
    fail_all: AtomicBool,
    /// Artificial delay before each disposition completes.
    latency: Mutex<Option<Duration>>,
    requires_pump: AtomicBool,
    pumps: AtomicU64,
    delivered: AtomicU64,
    closed: AtomicBool,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            input: RwLock::new(None),
            dispositions: Mutex::new(Vec::new()),
            destroyed: Mutex::new(Vec::new()),
            failures_pending: AtomicU64::new(0),
            fail_all: AtomicBool::new(false),
            latency: Mutex::new(None),
            requires_pump: AtomicBool::new(false),
            pumps: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Delivers a payload to the registered input.
    pub fn deliver(&self, body: impl Into<Vec<u8>>) -> Result<CallbackDisposition, TransportError> {
        self.deliver_message(LoopbackMessage::new(body))
    }

    /// Delivers a prepared message to the registered input.
    ///
    /// The handler runs on the caller's thread under the input read guard,
    /// so `close` waits for every delivery already past the closed check.
    pub fn deliver_message(
        &self,
        message: LoopbackMessage,
    ) -> Result<CallbackDisposition, TransportError> {
        let input = self.input.read();
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let handler = match input.as_ref() {
            Some((_, handler)) => handler,
            None => return Err(TransportError::NoInputRegistered),
        };

        self.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(handler.on_message_received(message))
    }

    /// Makes the next `count` dispositions fail.
    pub fn fail_next_dispositions(&self, count: u64) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    /// Makes every disposition fail while `enabled`.
    pub fn fail_all_dispositions(&self, enabled: bool) {
        self.fail_all.store(enabled, Ordering::SeqCst);
    }

    pub fn set_disposition_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    pub fn set_requires_pump(&self, required: bool) {
        self.requires_pump.store(required, Ordering::SeqCst);
    }

    pub fn dispositions(&self) -> Vec<(Uuid, Disposition)> {
        self.dispositions.lock().clone()
    }

    pub fn destroyed(&self) -> Vec<Uuid> {
        self.destroyed.lock().clone()
    }

    pub fn pump_count(&self) -> u64 {
        self.pumps.load(Ordering::Relaxed)
    }

    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn input_name(&self) -> Option<String> {
        self.input.read().as_ref().map(|(name, _)| name.clone())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn take_injected_failure(&self) -> bool {
        if self.fail_all.load(Ordering::SeqCst) {
            return true;
        }
        self.failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModuleTransport for InMemoryTransport {
    type Message = LoopbackMessage;

    fn register_input(
        &self,
        input_name: &str,
        handler: Arc<dyn InputHandler<LoopbackMessage>>,
    ) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let mut input = self.input.write();
        if let Some((existing, _)) = input.as_ref() {
            if existing != input_name {
                return Err(TransportError::InputAlreadyRegistered {
                    existing: existing.clone(),
                    requested: input_name.to_string(),
                });
            }
        }

        *input = Some((input_name.to_string(), handler));
        debug!(input = input_name, "Input handler registered");
        Ok(())
    }

    async fn send_disposition(
        &self,
        message: LoopbackMessage,
        disposition: Disposition,
        deadline: Duration,
    ) -> Result<(), DispositionFailure<LoopbackMessage>> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            if tokio::time::timeout(deadline, tokio::time::sleep(latency))
                .await
                .is_err()
            {
                let deadline_ms = deadline.as_millis() as u64;
                return Err(DispositionFailure::new(
                    message,
                    TransportError::TimedOut { deadline_ms },
                ));
            }
        }

        if self.closed.load(Ordering::SeqCst) {
            return Err(DispositionFailure::new(message, TransportError::Closed));
        }

        if self.take_injected_failure() {
            return Err(DispositionFailure::new(
                message,
                TransportError::DispositionRejected("injected failure".into()),
            ));
        }

        self.dispositions.lock().push((message.id, disposition));
        Ok(())
    }

    fn destroy(&self, message: LoopbackMessage) {
        self.destroyed.lock().push(message.id);
    }

    fn requires_pump(&self) -> bool {
        self.requires_pump.load(Ordering::SeqCst)
    }

    fn do_work(&self) {
        self.pumps.fetch_add(1, Ordering::Relaxed);
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            // Blocks until in-flight deliveries have enqueued.
            self.input.write().take();
            info!(
                delivered = self.delivered_count(),
                dispositions = self.dispositions.lock().len(),
                destroyed = self.destroyed.lock().len(),
                "Loopback transport closed"
            );
        }
    }
}
