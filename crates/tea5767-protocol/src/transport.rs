//! Bus transport capability
//!
//! The driver never talks to hardware directly. Anything that can move five
//! bytes to and from a bus address can stand in for the device: an I2C
//! peripheral, a USB bridge, or a simulator.

use crate::codec::TRANSACTION_LEN;
use crate::error::TransportError;

/// Fixed 7-bit bus address of the tuner
pub const DEVICE_ADDRESS: u8 = 0x60;

/// One write or read transaction against a bus device
pub trait BusTransport {
    /// Send the five write registers
    fn write(&mut self, address: u8, bytes: &[u8; TRANSACTION_LEN]) -> Result<(), TransportError>;

    /// Fetch the five read registers
    fn read(&mut self, address: u8) -> Result<[u8; TRANSACTION_LEN], TransportError>;
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    fn write(&mut self, address: u8, bytes: &[u8; TRANSACTION_LEN]) -> Result<(), TransportError> {
        (**self).write(address, bytes)
    }

    fn read(&mut self, address: u8) -> Result<[u8; TRANSACTION_LEN], TransportError> {
        (**self).read(address)
    }
}

impl<T: BusTransport + ?Sized> BusTransport for Box<T> {
    fn write(&mut self, address: u8, bytes: &[u8; TRANSACTION_LEN]) -> Result<(), TransportError> {
        (**self).write(address, bytes)
    }

    fn read(&mut self, address: u8) -> Result<[u8; TRANSACTION_LEN], TransportError> {
        (**self).read(address)
    }
}
