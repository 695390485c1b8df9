//! Write-side register model
//!
//! [`DeviceConfig`] is an immutable value. Every `with_*` method returns a new
//! configuration, so a caller can build the next state, validate it, and only
//! then swap it in.

use crate::error::DomainError;
use crate::frequency::{self, Crystal, InjectionSide, PllWord};

/// Write register bit masks
pub mod control {
    /// Byte 0: audio muted
    pub const MUTE: u8 = 0x80;
    /// Byte 0: search mode
    pub const SEARCH_MODE: u8 = 0x40;
    /// Byte 0: upper PLL bits
    pub const PLL_HIGH_MASK: u8 = 0x3F;

    /// Byte 2: search up
    pub const SEARCH_UP: u8 = 0x80;
    /// Byte 2: search stop level field
    pub const SEARCH_STOP_MASK: u8 = 0x60;
    /// Byte 2: search stop level shift
    pub const SEARCH_STOP_SHIFT: u8 = 5;
    /// Byte 2: high side LO injection
    pub const HLSI: u8 = 0x10;
    /// Byte 2: forced mono
    pub const MONO: u8 = 0x08;
    /// Byte 2: right channel muted
    pub const MUTE_RIGHT: u8 = 0x04;
    /// Byte 2: left channel muted
    pub const MUTE_LEFT: u8 = 0x02;
    /// Byte 2: software port 1 high
    pub const SWP1: u8 = 0x01;

    /// Byte 3: software port 2 high
    pub const SWP2: u8 = 0x80;
    /// Byte 3: standby
    pub const STANDBY: u8 = 0x40;
    /// Byte 3: Japanese band limits
    pub const JAPAN_BAND: u8 = 0x20;
    /// Byte 3: 32.768 kHz crystal
    pub const XTAL: u8 = 0x10;
    /// Byte 3: soft mute
    pub const SOFT_MUTE: u8 = 0x08;
    /// Byte 3: high cut control
    pub const HCC: u8 = 0x04;
    /// Byte 3: stereo noise canceling
    pub const SNC: u8 = 0x02;
    /// Byte 3: SWPORT1 used as ready flag output
    pub const SEARCH_INDICATOR: u8 = 0x01;

    /// Byte 4: 6.5 MHz PLL reference
    pub const PLL_REF: u8 = 0x80;
    /// Byte 4: 75 us de-emphasis
    pub const DTC: u8 = 0x40;
}

/// Hardware search direction (SUD bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchDirection {
    /// Towards the upper band edge
    #[default]
    Up,
    /// Towards the lower band edge
    Down,
}

impl SearchDirection {
    /// Channel step sign for this direction
    pub fn sign(self) -> f64 {
        match self {
            SearchDirection::Up => 1.0,
            SearchDirection::Down => -1.0,
        }
    }
}

impl std::str::FromStr for SearchDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "1" => Ok(SearchDirection::Up),
            "down" | "0" => Ok(SearchDirection::Down),
            other => Err(DomainError::InvalidConfig(format!(
                "unknown search direction: {}",
                other
            ))),
        }
    }
}

/// Signal level at which a hardware search stops (SSL bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchStopLevel {
    /// Level ADC output 5
    #[default]
    Low = 1,
    /// Level ADC output 7
    Mid = 2,
    /// Level ADC output 10
    High = 3,
}

impl SearchStopLevel {
    /// 2-bit register code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Level ADC reading at which the search stops
    pub fn adc_threshold(self) -> u8 {
        match self {
            SearchStopLevel::Low => 5,
            SearchStopLevel::Mid => 7,
            SearchStopLevel::High => 10,
        }
    }
}

impl TryFrom<u8> for SearchStopLevel {
    type Error = DomainError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(SearchStopLevel::Low),
            2 => Ok(SearchStopLevel::Mid),
            3 => Ok(SearchStopLevel::High),
            0 => Err(DomainError::InvalidConfig(
                "search stop level 0 is not allowed".to_string(),
            )),
            other => Err(DomainError::InvalidConfig(format!(
                "search stop level {} does not fit in 2 bits",
                other
            ))),
        }
    }
}

/// Complete contents of the five write registers
///
/// The crystal, injection side, station and PLL word are private: the
/// `with_*` methods are the only way to change them, and each keeps the PLL
/// word in step with the station.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "StoredConfig", into = "StoredConfig")
)]
pub struct DeviceConfig {
    pub mute: bool,
    pub search_mode: bool,
    pub search_direction: SearchDirection,
    pub search_stop_level: SearchStopLevel,
    injection_side: InjectionSide,
    pub forced_mono: bool,
    pub mute_left: bool,
    pub mute_right: bool,
    pub software_port1: bool,
    pub software_port2: bool,
    /// SWPORT1 reports the ready flag instead of being a plain output
    pub port1_ready_output: bool,
    pub standby: bool,
    pub japanese_band: bool,
    crystal: Crystal,
    pub soft_mute: bool,
    pub high_cut_control: bool,
    pub stereo_noise_canceling: bool,
    pub de_emphasis_75us: bool,
    station_frequency_mhz: f64,
    pll_word: PllWord,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::new(Crystal::default())
    }
}

impl DeviceConfig {
    /// Station tuned when nothing else has been requested
    pub const DEFAULT_STATION_MHZ: f64 = 88.1;

    /// Power-on register defaults: muted, search up, low stop level,
    /// high side injection
    pub fn new(crystal: Crystal) -> Self {
        let station = Self::DEFAULT_STATION_MHZ;
        Self {
            mute: true,
            search_mode: false,
            search_direction: SearchDirection::Up,
            search_stop_level: SearchStopLevel::Low,
            injection_side: InjectionSide::High,
            forced_mono: false,
            mute_left: false,
            mute_right: false,
            software_port1: false,
            software_port2: false,
            port1_ready_output: false,
            standby: false,
            japanese_band: false,
            crystal,
            soft_mute: false,
            high_cut_control: false,
            stereo_noise_canceling: false,
            de_emphasis_75us: false,
            station_frequency_mhz: station,
            pll_word: frequency::to_register_for(station, crystal, InjectionSide::High),
        }
    }

    /// Build from a crystal frequency in Hz
    pub fn with_crystal_hz(hz: u32) -> Result<Self, DomainError> {
        Crystal::try_from(hz).map(Self::new)
    }

    /// Tuned station in MHz
    pub fn station_frequency_mhz(&self) -> f64 {
        self.station_frequency_mhz
    }

    /// PLL word written to bytes 0 and 1
    pub fn pll_word(&self) -> PllWord {
        self.pll_word
    }

    pub fn crystal(&self) -> Crystal {
        self.crystal
    }

    pub fn injection_side(&self) -> InjectionSide {
        self.injection_side
    }

    /// Retune to a station inside the band
    pub fn with_frequency(self, mhz: f64) -> Result<Self, DomainError> {
        let mhz = frequency::validate_band(mhz)?;
        Ok(Self {
            station_frequency_mhz: mhz,
            pll_word: frequency::to_register_for(mhz, self.crystal, self.injection_side),
            ..self
        })
    }

    /// Adopt a PLL word reported by the device
    ///
    /// The device may report a word outside the band while it is searching,
    /// so this does not validate.
    pub fn with_pll_word(self, word: PllWord) -> Self {
        Self {
            station_frequency_mhz: frequency::from_register_for(
                word,
                self.crystal,
                self.injection_side,
            ),
            pll_word: word,
            ..self
        }
    }

    /// Change the injection side, keeping the station
    pub fn with_injection_side(self, side: InjectionSide) -> Self {
        Self {
            injection_side: side,
            pll_word: frequency::to_register_for(self.station_frequency_mhz, self.crystal, side),
            ..self
        }
    }

    /// Change the crystal, keeping the station
    pub fn with_crystal(self, crystal: Crystal) -> Self {
        Self {
            crystal,
            pll_word: frequency::to_register_for(
                self.station_frequency_mhz,
                crystal,
                self.injection_side,
            ),
            ..self
        }
    }

    pub fn with_mute(self, mute: bool) -> Self {
        Self { mute, ..self }
    }

    pub fn with_standby(self, standby: bool) -> Self {
        Self { standby, ..self }
    }

    pub fn with_forced_mono(self, forced_mono: bool) -> Self {
        Self { forced_mono, ..self }
    }

    pub fn with_soft_mute(self, soft_mute: bool) -> Self {
        Self { soft_mute, ..self }
    }

    pub fn with_high_cut_control(self, high_cut_control: bool) -> Self {
        Self {
            high_cut_control,
            ..self
        }
    }

    pub fn with_stereo_noise_canceling(self, stereo_noise_canceling: bool) -> Self {
        Self {
            stereo_noise_canceling,
            ..self
        }
    }

    pub fn with_search_stop_level(self, search_stop_level: SearchStopLevel) -> Self {
        Self {
            search_stop_level,
            ..self
        }
    }

    /// Start a hardware search: muted, search mode set, direction chosen
    pub fn with_search(self, direction: SearchDirection) -> Self {
        Self {
            search_mode: true,
            mute: true,
            search_direction: direction,
            ..self
        }
    }

    /// Leave search mode
    pub fn without_search(self) -> Self {
        Self {
            search_mode: false,
            ..self
        }
    }
}

/// Serialized form of a [`DeviceConfig`]
///
/// Carries the station rather than the PLL word. Loading goes through
/// [`DeviceConfig::with_frequency`], so a stored image outside the band is
/// rejected instead of being written to the device.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StoredConfig {
    pub mute: bool,
    pub search_mode: bool,
    pub search_direction: SearchDirection,
    pub search_stop_level: SearchStopLevel,
    pub injection_side: InjectionSide,
    pub forced_mono: bool,
    pub mute_left: bool,
    pub mute_right: bool,
    pub software_port1: bool,
    pub software_port2: bool,
    pub port1_ready_output: bool,
    pub standby: bool,
    pub japanese_band: bool,
    pub crystal: Crystal,
    pub soft_mute: bool,
    pub high_cut_control: bool,
    pub stereo_noise_canceling: bool,
    pub de_emphasis_75us: bool,
    pub station_frequency_mhz: f64,
}

#[cfg(feature = "serde")]
impl From<DeviceConfig> for StoredConfig {
    fn from(config: DeviceConfig) -> Self {
        Self {
            mute: config.mute,
            search_mode: config.search_mode,
            search_direction: config.search_direction,
            search_stop_level: config.search_stop_level,
            injection_side: config.injection_side,
            forced_mono: config.forced_mono,
            mute_left: config.mute_left,
            mute_right: config.mute_right,
            software_port1: config.software_port1,
            software_port2: config.software_port2,
            port1_ready_output: config.port1_ready_output,
            standby: config.standby,
            japanese_band: config.japanese_band,
            crystal: config.crystal,
            soft_mute: config.soft_mute,
            high_cut_control: config.high_cut_control,
            stereo_noise_canceling: config.stereo_noise_canceling,
            de_emphasis_75us: config.de_emphasis_75us,
            station_frequency_mhz: config.station_frequency_mhz,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<StoredConfig> for DeviceConfig {
    type Error = DomainError;

    fn try_from(stored: StoredConfig) -> Result<Self, Self::Error> {
        let tuned = DeviceConfig::new(stored.crystal)
            .with_injection_side(stored.injection_side)
            .with_frequency(stored.station_frequency_mhz)?;
        Ok(Self {
            mute: stored.mute,
            search_mode: stored.search_mode,
            search_direction: stored.search_direction,
            search_stop_level: stored.search_stop_level,
            forced_mono: stored.forced_mono,
            mute_left: stored.mute_left,
            mute_right: stored.mute_right,
            software_port1: stored.software_port1,
            software_port2: stored.software_port2,
            port1_ready_output: stored.port1_ready_output,
            standby: stored.standby,
            japanese_band: stored.japanese_band,
            soft_mute: stored.soft_mute,
            high_cut_control: stored.high_cut_control,
            stereo_noise_canceling: stored.stereo_noise_canceling,
            de_emphasis_75us: stored.de_emphasis_75us,
            ..tuned
        })
    }
}
