//! # Domain Layer
//!
//! - `entities`: PendingMessage, dispositions, settlement outcomes, reports
//! - `policy`: DelayPolicy (counter-dependent threshold)
//! - `queue`: PendingQueue and the shared SinkContext
//! - `config`: AckConfig and its sections

pub mod config;
pub mod entities;
pub mod policy;
pub mod queue;

pub use config::*;
pub use entities::*;
pub use policy::*;
pub use queue::*;
