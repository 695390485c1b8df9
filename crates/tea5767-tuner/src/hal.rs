//! `embedded-hal` I2C adapter
//!
//! Wraps any blocking `embedded_hal::i2c::I2c` implementation so the
//! controller can drive real hardware.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use tea5767_protocol::{BusTransport, TransportError, TRANSACTION_LEN};
use tracing::trace;

/// Bus transport backed by an I2C peripheral
#[derive(Debug)]
pub struct HalTransport<I> {
    i2c: I,
}

impl<I: I2c> HalTransport<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Give the peripheral back
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> BusTransport for HalTransport<I> {
    fn write(&mut self, address: u8, bytes: &[u8; TRANSACTION_LEN]) -> Result<(), TransportError> {
        trace!("i2c write 0x{:02X}: {:02X?}", address, bytes);
        self.i2c
            .write(address, bytes)
            .map_err(|e| map_kind(address, e.kind()))
    }

    fn read(&mut self, address: u8) -> Result<[u8; TRANSACTION_LEN], TransportError> {
        let mut buf = [0u8; TRANSACTION_LEN];
        self.i2c
            .read(address, &mut buf)
            .map_err(|e| map_kind(address, e.kind()))?;
        trace!("i2c read 0x{:02X}: {:02X?}", address, buf);
        Ok(buf)
    }
}

fn map_kind(address: u8, kind: ErrorKind) -> TransportError {
    match kind {
        ErrorKind::NoAcknowledge(_) => TransportError::NoAcknowledge(address),
        ErrorKind::ArbitrationLoss => TransportError::ArbitrationLoss,
        other => TransportError::Bus(format!("{:?}", other)),
    }
}
