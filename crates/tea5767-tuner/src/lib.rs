//! TEA5767 Tuner Control
//!
//! Blocking controller for the TEA5767 FM receiver built on top of the
//! register codec in `tea5767-protocol`.
//!
//! # Architecture
//!
//! - [`TunerController`] owns a [`BusTransport`](tea5767_protocol::BusTransport),
//!   a delay provider and the cached register image. Power, tuning and mute
//!   operations go through it.
//! - [`StationSearch`] runs hardware searches and software band scans on a
//!   controller, checking a [`CancelToken`] between transactions.
//! - Every transaction and state change is recorded as a [`TunerEvent`].
//! - [`HalTransport`] adapts any `embedded-hal` I2C bus.
//!
//! # Example
//!
//! ```rust
//! use tea5767_protocol::{DeviceConfig, SearchDirection};
//! use tea5767_sim::{VirtualStation, VirtualTuner};
//! use tea5767_tuner::{CancelToken, SimulatedDelay, StationSearch, TunerController};
//!
//! let mut radio = VirtualTuner::new("Bench");
//! radio.add_station(VirtualStation::new(96.3, 12, true));
//!
//! let mut tuner = TunerController::new(radio, SimulatedDelay::new(), DeviceConfig::default());
//! tuner.tune(95.0).unwrap();
//!
//! let outcome = StationSearch::default()
//!     .search(&mut tuner, SearchDirection::Up, &CancelToken::new())
//!     .unwrap();
//! assert_eq!(outcome.frequency_mhz(), Some(96.3));
//! ```

pub mod cancel;
pub mod controller;
pub mod delay;
pub mod error;
pub mod events;
pub mod hal;
pub mod search;

pub use embedded_hal;

pub use cancel::CancelToken;
pub use controller::{TunerController, TunerReading, TunerSettings};
pub use delay::{SimulatedDelay, StdDelay};
pub use error::TunerError;
pub use events::TunerEvent;
pub use hal::HalTransport;
pub use search::{
    ScanOutcome, SearchOutcome, SearchSettings, StationObservation, StationSearch,
};
