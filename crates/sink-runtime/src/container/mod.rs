//! # Sink Container
//!
//! Configuration and transport wiring for the sink process.

pub mod config;

pub use config::{FeedConfig, SinkConfig, TransportConfig};
