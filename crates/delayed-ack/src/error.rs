//! Error types for the delayed acknowledgement subsystem.

use thiserror::Error;

/// Failures reported by the messaging transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Session could not be established.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A handler is already registered for a different input.
    #[error("Input '{existing}' already registered, cannot register '{requested}'")]
    InputAlreadyRegistered { existing: String, requested: String },

    /// A message arrived but nobody listens on the input.
    #[error("No handler registered for input")]
    NoInputRegistered,

    /// The session was closed.
    #[error("Transport session closed")]
    Closed,

    /// The broker refused the disposition.
    #[error("Disposition rejected by transport: {0}")]
    DispositionRejected(String),

    /// The broker did not answer before the disposition deadline.
    #[error("Disposition not confirmed within {deadline_ms}ms")]
    TimedOut { deadline_ms: u64 },
}

/// A disposition call that did not go through.
///
/// Hands the message back to the caller, who is now responsible for
/// releasing it.
#[derive(Debug)]
pub struct DispositionFailure<M> {
    /// The message the disposition was attempted for.
    pub message: M,
    /// Why the transport refused it.
    pub error: TransportError,
}

impl<M> DispositionFailure<M> {
    pub fn new(message: M, error: TransportError) -> Self {
        Self { message, error }
    }
}

/// Payload extraction errors. Never fatal to receipt bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("Message has no body")]
    Empty,

    #[error("Message body unreadable: {0}")]
    Unreadable(String),
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Input name cannot be empty")]
    EmptyInputName,

    #[error("Payload preview length cannot be 0")]
    ZeroPreview,

    #[error("Slow window is empty or inverted: [{start}, {end})")]
    InvalidSlowWindow { start: u64, end: u64 },

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Failed to load configuration file: {0}")]
    File(String),
}
