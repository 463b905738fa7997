//! Adapters layer.
//!
//! Transport implementations of the outbound ports.

pub mod loopback;

pub use loopback::{InMemoryTransport, LoopbackMessage};
