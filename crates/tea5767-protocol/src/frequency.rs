//! Station frequency to PLL word arithmetic
//!
//! The tuner synthesizes its local oscillator with a PLL whose 14-bit
//! divisor is split across the first two write registers. For high side
//! injection the oscillator sits one IF above the station:
//!
//! ```text
//! N = 4 * (f_rf + f_if) / f_ref
//! ```
//!
//! `f_ref` is the PLL reference: the 32.768 kHz watch crystal directly, or
//! 50 kHz divided down from a 6.5 MHz or 13 MHz clock.

use crate::error::DomainError;

/// Lower edge of the tuning band (MHz)
pub const BAND_MIN_MHZ: f64 = 87.5;

/// Upper edge of the tuning band (MHz)
pub const BAND_MAX_MHZ: f64 = 107.9;

/// Channel raster used by scanning (MHz)
pub const CHANNEL_STEP_MHZ: f64 = 0.1;

/// Number of 100 kHz channels between the band edges, inclusive
pub const CHANNEL_COUNT: usize = 205;

/// Intermediate frequency (Hz)
pub const IF_HZ: f64 = 225_000.0;

const BAND_EPSILON: f64 = 1e-6;

/// Reference oscillator fitted to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Crystal {
    /// 32.768 kHz watch crystal
    #[default]
    Khz32768,
    /// 6.5 MHz external clock
    Mhz6_5,
    /// 13 MHz external clock
    Mhz13,
}

impl Crystal {
    /// Crystal frequency in Hz
    pub fn hz(self) -> u32 {
        match self {
            Crystal::Khz32768 => 32_768,
            Crystal::Mhz6_5 => 6_500_000,
            Crystal::Mhz13 => 13_000_000,
        }
    }

    /// PLL reference frequency in Hz
    pub fn reference_hz(self) -> u32 {
        match self {
            Crystal::Khz32768 => 32_768,
            Crystal::Mhz6_5 | Crystal::Mhz13 => 50_000,
        }
    }

    /// XTAL bit (byte 3, bit 4)
    pub fn xtal_select(self) -> bool {
        matches!(self, Crystal::Khz32768)
    }

    /// PLLREF bit (byte 4, bit 7)
    pub fn pll_ref_select(self) -> bool {
        matches!(self, Crystal::Mhz6_5)
    }

    /// Recover the crystal from its clock-select bits
    pub fn from_select_bits(xtal: bool, pll_ref: bool) -> Result<Self, DomainError> {
        match (pll_ref, xtal) {
            (false, false) => Ok(Crystal::Mhz13),
            (false, true) => Ok(Crystal::Khz32768),
            (true, false) => Ok(Crystal::Mhz6_5),
            (true, true) => Err(DomainError::InvalidConfig(
                "XTAL and PLLREF must not both be set".to_string(),
            )),
        }
    }
}

impl TryFrom<u32> for Crystal {
    type Error = DomainError;

    fn try_from(hz: u32) -> Result<Self, Self::Error> {
        match hz {
            32_768 => Ok(Crystal::Khz32768),
            6_500_000 => Ok(Crystal::Mhz6_5),
            13_000_000 => Ok(Crystal::Mhz13),
            other => Err(DomainError::UnsupportedCrystal(other)),
        }
    }
}

/// Local oscillator placement relative to the station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InjectionSide {
    /// Oscillator above the station (HLSI = 1)
    #[default]
    High,
    /// Oscillator below the station (HLSI = 0)
    Low,
}

/// 14-bit PLL divisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PllWord(u16);

impl PllWord {
    /// Largest value the register pair can hold
    pub const MAX: u16 = 0x3FFF;

    /// Create a PLL word, discarding bits above bit 13
    pub fn new(value: u16) -> Self {
        Self(value & Self::MAX)
    }

    /// Rebuild the word from its register halves
    pub fn from_bytes(upper: u8, lower: u8) -> Self {
        Self::new((((upper & 0x3F) as u16) << 8) | lower as u16)
    }

    /// Raw divisor value
    pub fn value(self) -> u16 {
        self.0
    }

    /// Upper 6 bits (byte 0, bits 5..0)
    pub fn upper(self) -> u8 {
        ((self.0 >> 8) & 0x3F) as u8
    }

    /// Lower 8 bits (byte 1)
    pub fn lower(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

/// Whether a frequency lies inside the tuning band, edges included
pub fn in_band(mhz: f64) -> bool {
    mhz >= BAND_MIN_MHZ - BAND_EPSILON && mhz <= BAND_MAX_MHZ + BAND_EPSILON
}

/// Reject frequencies outside the tuning band
pub fn validate_band(mhz: f64) -> Result<f64, DomainError> {
    if in_band(mhz) {
        Ok(mhz)
    } else {
        Err(DomainError::FrequencyOutOfBand { mhz })
    }
}

/// Round a frequency to the 100 kHz raster
pub fn round_to_channel(mhz: f64) -> f64 {
    (mhz * 10.0).round() / 10.0
}

/// Frequency of the n-th channel counted up from the lower band edge
pub fn channel_frequency(index: usize) -> f64 {
    (875 + index) as f64 / 10.0
}

/// Convert a station frequency to the PLL word (high side injection)
pub fn to_register(mhz: f64, crystal: Crystal) -> PllWord {
    to_register_for(mhz, crystal, InjectionSide::High)
}

/// Convert a station frequency to the PLL word for the given injection side
pub fn to_register_for(mhz: f64, crystal: Crystal, side: InjectionSide) -> PllWord {
    let rf_hz = mhz * 1_000_000.0;
    let lo_hz = match side {
        InjectionSide::High => rf_hz + IF_HZ,
        InjectionSide::Low => rf_hz - IF_HZ,
    };
    let divisor = (4.0 * lo_hz / crystal.reference_hz() as f64).round();
    PllWord::new(divisor.clamp(0.0, PllWord::MAX as f64) as u16)
}

/// Convert a PLL word back to a station frequency (high side injection)
pub fn from_register(word: PllWord, crystal: Crystal) -> f64 {
    from_register_for(word, crystal, InjectionSide::High)
}

/// Convert a PLL word back to a station frequency, rounded to 0.1 MHz
pub fn from_register_for(word: PllWord, crystal: Crystal, side: InjectionSide) -> f64 {
    let lo_hz = word.value() as f64 * crystal.reference_hz() as f64 / 4.0;
    let rf_hz = match side {
        InjectionSide::High => lo_hz - IF_HZ,
        InjectionSide::Low => lo_hz + IF_HZ,
    };
    round_to_channel(rf_hz / 1_000_000.0)
}
