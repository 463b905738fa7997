//! Receive side: stamps incoming messages and parks them in the pending queue.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{CallbackDisposition, InputConfig, SinkContext};
use crate::metrics;
use crate::ports::{InboundMessage, InputHandler, TimeSource};

/// Input callback that queues every message for delayed acknowledgement.
pub struct MessageReceiver<M, C> {
    context: Arc<SinkContext<M>>,
    clock: Arc<C>,
    preview_bytes: usize,
}

impl<M, C> MessageReceiver<M, C>
where
    M: InboundMessage,
    C: TimeSource,
{
    pub fn new(context: Arc<SinkContext<M>>, clock: Arc<C>, config: &InputConfig) -> Self {
        Self {
            context,
            clock,
            preview_bytes: config.preview_bytes,
        }
    }
}

impl<M, C> InputHandler<M> for MessageReceiver<M, C>
where
    M: InboundMessage,
    C: TimeSource,
{
    fn on_message_received(&self, message: M) -> CallbackDisposition {
        // Preview is computed before the handle moves into the queue.
        let preview = message
            .body()
            .map(|body| (payload_preview(body, self.preview_bytes), body.len()));

        let arrival_time = self.clock.now();
        let sequence = self.context.enqueue(message, arrival_time);
        metrics::record_message_received();

        match preview {
            Ok((data, size)) => {
                info!(sequence, size, data = %data, "Received message");
            }
            Err(e) => {
                warn!(sequence, error = %e, "Received message with unreadable payload, queued anyway");
            }
        }

        CallbackDisposition::AsyncAck
    }
}

/// Lossy UTF-8 rendering of at most `limit` bytes of `body`.
pub fn payload_preview(body: &[u8], limit: usize) -> String {
    let end = body.len().min(limit);
    let mut preview = String::from_utf8_lossy(&body[..end]).into_owned();
    if body.len() > limit {
        preview.push('…');
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PayloadError;
    use crate::ports::MockTimeSource;

    struct TestMessage(Option<Vec<u8>>);

    impl InboundMessage for TestMessage {
        fn body(&self) -> Result<&[u8], PayloadError> {
            self.0.as_deref().ok_or(PayloadError::Empty)
        }
    }

    fn receiver(
        clock: Arc<MockTimeSource>,
    ) -> (
        MessageReceiver<TestMessage, MockTimeSource>,
        Arc<SinkContext<TestMessage>>,
    ) {
        let context = Arc::new(SinkContext::new());
        let config = InputConfig {
            preview_bytes: 5,
            ..InputConfig::default()
        };
        (MessageReceiver::new(context.clone(), clock, &config), context)
    }

    #[test]
    fn test_always_async_ack() {
        let clock = Arc::new(MockTimeSource::new(0));
        let (receiver, _) = receiver(clock);

        let result = receiver.on_message_received(TestMessage(Some(b"hello".to_vec())));
        assert_eq!(result, CallbackDisposition::AsyncAck);
    }

    #[test]
    fn test_stamps_arrival_and_counts() {
        let clock = Arc::new(MockTimeSource::new(7_000));
        let (receiver, context) = receiver(clock.clone());

        receiver.on_message_received(TestMessage(Some(b"one".to_vec())));
        clock.advance(250);
        receiver.on_message_received(TestMessage(Some(b"two".to_vec())));

        assert_eq!(context.received_total(), 2);
        assert_eq!(context.pending_sequences(), vec![0, 1]);

        let drained = context.drain();
        assert_eq!(drained[0].arrival_time, 7_000);
        assert_eq!(drained[1].arrival_time, 7_250);
    }

    #[test]
    fn test_unreadable_payload_still_queued() {
        let clock = Arc::new(MockTimeSource::new(0));
        let (receiver, context) = receiver(clock);

        let result = receiver.on_message_received(TestMessage(None));

        assert_eq!(result, CallbackDisposition::AsyncAck);
        assert_eq!(context.pending_count(), 1);
        assert_eq!(context.received_total(), 1);
    }

    #[test]
    fn test_payload_preview_is_bounded() {
        assert_eq!(payload_preview(b"hello world", 5), "hello…");
        assert_eq!(payload_preview(b"hi", 5), "hi");
        assert_eq!(payload_preview(b"", 5), "");
    }

    #[test]
    fn test_payload_preview_invalid_utf8() {
        let preview = payload_preview(&[0xff, 0xfe, b'a'], 64);
        assert!(preview.ends_with('a'));
        assert!(preview.contains('\u{FFFD}'));
    }
}
