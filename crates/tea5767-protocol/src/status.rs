//! Read-side register model

use crate::frequency::{self, Crystal, InjectionSide, PllWord};

/// Read register bit masks
pub mod flags {
    /// Byte 0: station found or band limit reached
    pub const READY: u8 = 0x80;
    /// Byte 0: band limit reached during search
    pub const BAND_LIMIT: u8 = 0x40;
    /// Byte 2: stereo reception
    pub const STEREO: u8 = 0x80;
    /// Byte 2: IF counter result
    pub const IF_COUNTER_MASK: u8 = 0x7F;
    /// Byte 3: level ADC output shift
    pub const LEVEL_SHIFT: u8 = 4;
    /// Byte 3: chip identification bits
    pub const CHIP_ID_MASK: u8 = 0x0E;
}

/// Snapshot decoded from one 5-byte read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceStatus {
    /// Station found or band limit reached
    pub ready: bool,
    /// Search hit a band edge
    pub band_limit_reached: bool,
    /// Tuned PLL word
    pub pll_word: PllWord,
    /// Stereo pilot detected
    pub stereo: bool,
    /// IF counter result (7 bits)
    pub if_counter: u8,
    /// Level ADC output (0..=15)
    pub signal_level: u8,
    /// Chip identification (bits 3..1, shifted down)
    pub chip_id: u8,
}

impl DeviceStatus {
    /// Station frequency for the crystal that produced this reading
    pub fn frequency_mhz(&self, crystal: Crystal) -> f64 {
        frequency::from_register(self.pll_word, crystal)
    }

    /// Station frequency for a given crystal and injection side
    pub fn frequency_mhz_for(&self, crystal: Crystal, side: InjectionSide) -> f64 {
        frequency::from_register_for(self.pll_word, crystal, side)
    }
}
