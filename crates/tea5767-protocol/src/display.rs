//! Human-readable formatting for register traffic

use std::fmt;

use crate::codec::{self, TRANSACTION_LEN};
use crate::frequency::Crystal;
use crate::registers::{DeviceConfig, SearchDirection};
use crate::status::DeviceStatus;

/// Format a frequency in MHz for display
pub fn format_frequency(mhz: f64) -> String {
    format!("{:.1} MHz", mhz)
}

/// Dump each register as bits, most significant first
///
/// ```
/// use tea5767_protocol::display::format_bits;
///
/// assert_eq!(format_bits(&[0x80, 0x01]), "B0 1000_0000\nB1 0000_0001");
/// ```
pub fn format_bits(bytes: &[u8]) -> String {
    bytes
        .iter()
        .enumerate()
        .map(|(i, byte)| format!("B{} {:04b}_{:04b}", i, byte >> 4, byte & 0x0F))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One-line summary of a write transaction
pub fn annotate_control(bytes: &[u8; TRANSACTION_LEN]) -> String {
    match codec::decode_control(bytes) {
        Ok(config) => summarize_config(&config),
        Err(e) => format!("{:02X?} (invalid: {})", bytes, e),
    }
}

/// One-line summary of a read transaction
pub fn annotate_status(bytes: &[u8; TRANSACTION_LEN], crystal: Crystal) -> String {
    let status = codec::decode(bytes);
    format!(
        "{} {}",
        format_frequency(status.frequency_mhz(crystal)),
        status
    )
}

fn summarize_config(config: &DeviceConfig) -> String {
    let mut parts = vec![format_frequency(config.station_frequency_mhz())];
    if config.standby {
        parts.push("STANDBY".to_string());
    }
    if config.mute {
        parts.push("MUTE".to_string());
    }
    if config.search_mode {
        parts.push(format!(
            "SEARCH {} ({:?})",
            config.search_direction, config.search_stop_level
        ));
    }
    if config.forced_mono {
        parts.push("MONO".to_string());
    }
    if config.soft_mute {
        parts.push("SMUTE".to_string());
    }
    if config.high_cut_control {
        parts.push("HCC".to_string());
    }
    if config.stereo_noise_canceling {
        parts.push("SNC".to_string());
    }
    parts.join(" ")
}

impl fmt::Display for SearchDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchDirection::Up => write!(f, "up"),
            SearchDirection::Down => write!(f, "down"),
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}{}{}] level {}/15 IF 0x{:02X} chip {}",
            if self.ready { "ready" } else { "busy" },
            if self.band_limit_reached {
                ", band limit"
            } else {
                ""
            },
            if self.stereo { ", stereo" } else { ", mono" },
            self.signal_level,
            self.if_counter,
            self.chip_id
        )
    }
}
