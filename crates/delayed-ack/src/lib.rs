//! # Delayed Acknowledgement
//!
//! Buffers messages received on a single named input and acknowledges them
//! once they have been pending for a counter-dependent delay. Used to exercise
//! a broker's at-least-once delivery and backpressure handling when the
//! consumer acknowledges slowly.
//!
//! ## Message Lifecycle
//!
//! ```text
//!                       age >= threshold, ACK ok
//! [RECEIVED] ──enqueue──→ [PENDING] ─────────────────────────→ [ACKNOWLEDGED]
//!                             │
//!                             └── ACK rejected / timed out ──→ [DISCARDED]
//! ```
//!
//! Both transitions out of `PENDING` are terminal. An entry is detached from
//! the pending queue before its disposition is sent, so it can never be
//! disposed twice.
//!
//! ## Delay Policy
//!
//! | Received counter | Threshold |
//! |------------------|-----------|
//! | inside `[slow_window_start, slow_window_end)` | `high_delay_ms` (default 35 s) |
//! | otherwise | `low_delay_ms` (default 1 s) |
//!
//! ## Module Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/loopback.rs - InMemoryTransport (in-process broker)   │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - InputHandler (receive callback)            │
//! │  ports/outbound.rs - ModuleTransport, TimeSource, Ticker        │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  receiver.rs - MessageReceiver        service.rs - AckScheduler │
//! │  domain/     - PendingQueue, DelayPolicy, AckConfig, reports    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! let transport = Arc::new(InMemoryTransport::new());
//! let clock = Arc::new(SystemTimeSource);
//! let context = Arc::new(SinkContext::new());
//!
//! let receiver = MessageReceiver::new(context.clone(), clock.clone(), &config.input);
//! transport.register_input(&config.input.name, Arc::new(receiver))?;
//!
//! let scheduler = AckScheduler::new(context, transport, clock, &config);
//! let report = scheduler.run(IntervalTicker::new(config.scheduler.tick_interval()), shutdown_rx).await;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod receiver;
pub mod service;

pub use adapters::{InMemoryTransport, LoopbackMessage};
pub use domain::*;
pub use error::{ConfigError, DispositionFailure, PayloadError, TransportError};
pub use ports::*;
pub use receiver::MessageReceiver;
pub use service::AckScheduler;

/// Input name the module listens on unless configured otherwise.
pub const DEFAULT_INPUT_NAME: &str = "input";
