//! Error types for the tuner controller

use tea5767_protocol::{DomainError, TransportError};
use thiserror::Error;

/// Errors that can occur while driving the tuner
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TunerError {
    /// Bus transaction failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Request cannot be expressed in the device registers
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Device did not raise its ready flag in time
    #[error("device not ready after {waited_ms}ms")]
    TimedOut { waited_ms: u64 },
}
