//! # Inbound Port - InputHandler
//!
//! The callback a transport invokes for every message arriving on the
//! registered input.

use crate::domain::CallbackDisposition;

/// Receive callback for one named input.
///
/// Implementations must return promptly: the transport calls this from its
/// own delivery thread or event loop.
pub trait InputHandler<M>: Send + Sync {
    /// Takes ownership of `message` and reports how it will be settled.
    fn on_message_received(&self, message: M) -> CallbackDisposition;
}
