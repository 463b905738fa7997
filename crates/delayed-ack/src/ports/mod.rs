//! Ports layer.
//!
//! - Inbound (Driving) ports: the receive callback the transport invokes
//! - Outbound (Driven) ports: the transport, the clock and the tick source

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
