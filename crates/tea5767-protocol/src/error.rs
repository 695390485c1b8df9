//! Error types for TEA5767 register encoding and bus access

use thiserror::Error;

/// Errors raised when a requested configuration cannot be represented
/// in the device registers
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Station frequency outside the 87.5 - 107.9 MHz tuning band
    #[error("frequency {mhz:.1} MHz is outside the 87.5-107.9 MHz band")]
    FrequencyOutOfBand { mhz: f64 },

    /// Register contents that the device does not allow
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Crystal frequency with no clock-select encoding
    #[error("unsupported crystal frequency: {0} Hz")]
    UnsupportedCrystal(u32),
}

/// Errors reported by a bus transport while moving register bytes
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No device acknowledged the address
    #[error("no acknowledge from device at 0x{0:02X}")]
    NoAcknowledge(u8),

    /// Another bus master won arbitration
    #[error("bus arbitration lost")]
    ArbitrationLoss,

    /// The transaction did not complete in time
    #[error("bus transaction timed out")]
    Timeout,

    /// Any other bus failure
    #[error("bus error: {0}")]
    Bus(String),
}
