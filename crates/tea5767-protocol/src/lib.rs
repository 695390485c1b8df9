//! TEA5767 Register Protocol
//!
//! This crate maps between the TEA5767 FM receiver's 5-byte bus
//! transactions and typed Rust values:
//!
//! - **Codec**: [`DeviceConfig`] to write registers, read registers to
//!   [`DeviceStatus`] (plus the reverse directions for device-side code)
//! - **Frequency**: station frequency to and from the 14-bit PLL word
//! - **Transport**: the [`BusTransport`] capability the driver is written
//!   against
//!
//! Everything here is pure; no function performs I/O.
//!
//! # Example
//!
//! ```rust
//! use tea5767_protocol::{codec, Crystal, DeviceConfig};
//!
//! let config = DeviceConfig::new(Crystal::Khz32768)
//!     .with_frequency(95.5)
//!     .unwrap()
//!     .with_mute(false);
//!
//! let bytes = codec::encode(&config);
//! assert_eq!(bytes[0] & 0x3F, config.pll_word().upper());
//! assert_eq!(bytes[1], config.pll_word().lower());
//! ```

pub mod codec;
pub mod display;
pub mod error;
pub mod frequency;
pub mod registers;
pub mod status;
pub mod transport;

pub use codec::{decode, decode_control, encode, encode_status, TRANSACTION_LEN};
pub use error::{DomainError, TransportError};
pub use frequency::{Crystal, InjectionSide, PllWord, BAND_MAX_MHZ, BAND_MIN_MHZ};
pub use registers::{DeviceConfig, SearchDirection, SearchStopLevel};
#[cfg(feature = "serde")]
pub use registers::StoredConfig;
pub use status::DeviceStatus;
pub use transport::{BusTransport, DEVICE_ADDRESS};
