//! TEA5767 Simulation Library
//!
//! This crate provides a simulated receiver for testing the tuner driver
//! without hardware. It includes:
//!
//! - **VirtualTuner**: Answers 5-byte bus transactions like the real chip,
//!   with a configurable band of stations, hardware search emulation and
//!   fault injection
//!
//! # Example
//!
//! ```rust
//! use tea5767_protocol::{codec, BusTransport, DeviceConfig, DEVICE_ADDRESS};
//! use tea5767_sim::{VirtualStation, VirtualTuner};
//!
//! let mut tuner = VirtualTuner::new("bench");
//! tuner.add_station(VirtualStation::new(95.5, 12, true));
//!
//! let config = DeviceConfig::default().with_frequency(95.5).unwrap();
//! tuner.write(DEVICE_ADDRESS, &codec::encode(&config)).unwrap();
//!
//! let status = codec::decode(&tuner.read(DEVICE_ADDRESS).unwrap());
//! assert!(status.ready);
//! assert_eq!(status.signal_level, 12);
//! ```

pub mod tuner;

pub use tuner::{Transaction, VirtualStation, VirtualTuner, VirtualTunerConfig};
