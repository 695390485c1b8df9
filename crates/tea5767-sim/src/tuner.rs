//! Virtual TEA5767 receiver
//!
//! Answers bus transactions the way the real chip does: write transactions
//! retune or start a hardware search, read transactions report the tuned
//! PLL word, signal level and flags for the simulated band.

use serde::{Deserialize, Serialize};
use tea5767_protocol::{
    codec,
    display::{annotate_control, format_frequency},
    frequency::{self, BAND_MAX_MHZ, BAND_MIN_MHZ, CHANNEL_STEP_MHZ},
    BusTransport, Crystal, DeviceConfig, DeviceStatus, SearchDirection, TransportError,
    DEVICE_ADDRESS, TRANSACTION_LEN,
};
use tracing::{debug, trace, warn};

/// IF counter reported while sitting on a station
const STATION_IF_COUNT: u8 = 0x37;

/// A transmitter audible in the simulated band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualStation {
    /// Carrier frequency in MHz
    pub frequency_mhz: f64,
    /// Level ADC reading when tuned (0..=15)
    pub signal_level: u8,
    /// Stereo pilot present
    pub stereo: bool,
}

impl VirtualStation {
    pub fn new(frequency_mhz: f64, signal_level: u8, stereo: bool) -> Self {
        Self {
            frequency_mhz,
            signal_level: signal_level.min(15),
            stereo,
        }
    }
}

/// Configuration for creating a virtual tuner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualTunerConfig {
    /// Display name/identifier
    pub id: String,
    /// Stations in the simulated band
    #[serde(default)]
    pub stations: Vec<VirtualStation>,
    /// Level reported between stations
    #[serde(default)]
    pub noise_floor: u8,
    /// Reads after a retune before the ready flag rises
    #[serde(default = "default_reads_until_ready")]
    pub reads_until_ready: u32,
    /// Chip identification reported in byte 3
    #[serde(default)]
    pub chip_id: u8,
}

fn default_reads_until_ready() -> u32 {
    1
}

impl Default for VirtualTunerConfig {
    fn default() -> Self {
        Self {
            id: "Virtual TEA5767".to_string(),
            stations: vec![
                VirtualStation::new(89.1, 9, true),
                VirtualStation::new(95.5, 12, true),
                VirtualStation::new(101.1, 6, false),
                VirtualStation::new(104.3, 11, true),
            ],
            noise_floor: 1,
            reads_until_ready: 1,
            chip_id: 0,
        }
    }
}

/// One bus transaction seen by the virtual tuner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    /// Control registers written by the host
    Write([u8; TRANSACTION_LEN]),
    /// Status registers returned to the host
    Read([u8; TRANSACTION_LEN]),
}

#[derive(Debug, Clone, Copy)]
struct ActiveSearch {
    direction: SearchDirection,
    threshold: u8,
}

/// A simulated receiver answering at [`DEVICE_ADDRESS`]
#[derive(Debug)]
pub struct VirtualTuner {
    id: String,
    stations: Vec<VirtualStation>,
    noise_floor: u8,
    reads_until_ready: u32,
    chip_id: u8,
    never_ready: bool,
    /// Last control registers written
    control: Option<DeviceConfig>,
    /// Channel the synthesizer sits on
    channel_mhz: f64,
    search: Option<ActiveSearch>,
    ready: bool,
    band_limit: bool,
    reads_since_tune: u32,
    pending_fault: Option<TransportError>,
    log: Vec<Transaction>,
}

impl VirtualTuner {
    /// Create a virtual tuner with an empty band
    pub fn new(id: impl Into<String>) -> Self {
        Self::from_config(VirtualTunerConfig {
            id: id.into(),
            stations: Vec::new(),
            noise_floor: 0,
            ..Default::default()
        })
    }

    /// Create a virtual tuner from configuration
    pub fn from_config(config: VirtualTunerConfig) -> Self {
        Self {
            id: config.id,
            stations: config.stations,
            noise_floor: config.noise_floor.min(15),
            reads_until_ready: config.reads_until_ready,
            chip_id: config.chip_id & 0x07,
            never_ready: false,
            control: None,
            channel_mhz: DeviceConfig::DEFAULT_STATION_MHZ,
            search: None,
            ready: false,
            band_limit: false,
            reads_since_tune: 0,
            pending_fault: None,
            log: Vec::new(),
        }
    }

    /// Get the tuner's identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Add a station to the band
    pub fn add_station(&mut self, station: VirtualStation) {
        self.stations.push(station);
    }

    /// Stations in the band
    pub fn stations(&self) -> &[VirtualStation] {
        &self.stations
    }

    /// Keep the ready flag low forever (a device that never locks)
    pub fn set_never_ready(&mut self, never_ready: bool) {
        self.never_ready = never_ready;
    }

    /// Fail the next transaction with the given error
    pub fn inject_fault(&mut self, fault: TransportError) {
        self.pending_fault = Some(fault);
    }

    /// Channel the synthesizer currently sits on
    pub fn frequency_mhz(&self) -> f64 {
        self.channel_mhz
    }

    /// Last configuration written by the host
    pub fn control(&self) -> Option<&DeviceConfig> {
        self.control.as_ref()
    }

    /// Whether a hardware search is in progress
    pub fn is_searching(&self) -> bool {
        self.search.is_some()
    }

    /// Whether the audio output is muted
    pub fn is_muted(&self) -> bool {
        self.control.map(|c| c.mute).unwrap_or(true)
    }

    /// Whether the chip is in standby
    pub fn is_standby(&self) -> bool {
        self.control.map(|c| c.standby).unwrap_or(false)
    }

    /// Every transaction seen so far
    pub fn transactions(&self) -> &[Transaction] {
        &self.log
    }

    /// Number of write transactions seen
    pub fn write_count(&self) -> usize {
        self.log
            .iter()
            .filter(|t| matches!(t, Transaction::Write(_)))
            .count()
    }

    /// Number of read transactions seen
    pub fn read_count(&self) -> usize {
        self.log
            .iter()
            .filter(|t| matches!(t, Transaction::Read(_)))
            .count()
    }

    /// Forget logged transactions
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Get a summary of current state
    pub fn state_summary(&self) -> String {
        let mut summary = format!("{} - {}", self.id, format_frequency(self.channel_mhz));
        if self.is_standby() {
            summary.push_str(" [STANDBY]");
        }
        if self.is_muted() {
            summary.push_str(" [MUTE]");
        }
        if self.is_searching() {
            summary.push_str(" [SEARCH]");
        }
        summary
    }

    fn station_at(&self, mhz: f64) -> Option<&VirtualStation> {
        self.stations
            .iter()
            .filter(|s| (s.frequency_mhz - mhz).abs() < CHANNEL_STEP_MHZ / 2.0)
            .max_by_key(|s| s.signal_level)
    }

    fn level_at(&self, mhz: f64) -> u8 {
        self.station_at(mhz)
            .map(|s| s.signal_level.max(self.noise_floor))
            .unwrap_or(self.noise_floor)
    }

    fn check_address(&mut self, address: u8) -> Result<(), TransportError> {
        if address != DEVICE_ADDRESS {
            return Err(TransportError::NoAcknowledge(address));
        }
        match self.pending_fault.take() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    fn apply_control(&mut self, config: DeviceConfig) {
        self.channel_mhz = config.station_frequency_mhz();
        self.reads_since_tune = 0;
        self.ready = false;
        self.band_limit = false;
        self.search = if config.search_mode && !config.standby {
            debug!(
                "{}: search {} from {}",
                self.id,
                config.search_direction,
                format_frequency(self.channel_mhz)
            );
            Some(ActiveSearch {
                direction: config.search_direction,
                threshold: config.search_stop_level.adc_threshold(),
            })
        } else {
            None
        };
        self.control = Some(config);
    }

    /// Advance a running search by one channel
    fn step_search(&mut self, search: ActiveSearch) {
        let next = frequency::round_to_channel(
            self.channel_mhz + search.direction.sign() * CHANNEL_STEP_MHZ,
        );

        let at_edge = match search.direction {
            SearchDirection::Up => next >= BAND_MAX_MHZ,
            SearchDirection::Down => next <= BAND_MIN_MHZ,
        };

        if at_edge {
            self.channel_mhz = next.clamp(BAND_MIN_MHZ, BAND_MAX_MHZ);
            self.band_limit = true;
            self.ready = !self.never_ready;
            self.search = None;
            debug!("{}: search hit band limit", self.id);
        } else if self.level_at(next) >= search.threshold {
            self.channel_mhz = next;
            self.ready = !self.never_ready;
            self.search = None;
            debug!("{}: search stopped at {}", self.id, format_frequency(next));
        } else {
            self.channel_mhz = next;
        }
    }

    fn current_status(&mut self) -> DeviceStatus {
        let Some(config) = self.control else {
            return DeviceStatus {
                pll_word: frequency::to_register(self.channel_mhz, Crystal::default()),
                chip_id: self.chip_id,
                ..Default::default()
            };
        };

        if config.standby {
            return DeviceStatus {
                pll_word: config.pll_word(),
                chip_id: self.chip_id,
                ..Default::default()
            };
        }

        match self.search {
            Some(search) => self.step_search(search),
            None => {
                self.reads_since_tune = self.reads_since_tune.saturating_add(1);
                if !self.never_ready && self.reads_since_tune >= self.reads_until_ready {
                    self.ready = true;
                }
            }
        }

        let channel = self.channel_mhz;
        let level = self.level_at(channel);
        let station = self.station_at(channel);

        DeviceStatus {
            ready: self.ready,
            band_limit_reached: self.band_limit,
            pll_word: frequency::to_register_for(channel, config.crystal(), config.injection_side()),
            stereo: station.is_some_and(|s| s.stereo) && !config.forced_mono,
            if_counter: if station.is_some() {
                STATION_IF_COUNT
            } else {
                0
            },
            signal_level: level,
            chip_id: self.chip_id,
        }
    }

    /// Crystal of the last written configuration
    pub fn crystal(&self) -> Crystal {
        self.control.map(|c| c.crystal()).unwrap_or_default()
    }
}

impl BusTransport for VirtualTuner {
    fn write(&mut self, address: u8, bytes: &[u8; TRANSACTION_LEN]) -> Result<(), TransportError> {
        self.check_address(address)?;
        self.log.push(Transaction::Write(*bytes));
        trace!("{}: write {}", self.id, annotate_control(bytes));

        match codec::decode_control(bytes) {
            Ok(config) => self.apply_control(config),
            Err(e) => warn!("{}: ignoring control registers {:02X?}: {}", self.id, bytes, e),
        }
        Ok(())
    }

    fn read(&mut self, address: u8) -> Result<[u8; TRANSACTION_LEN], TransportError> {
        self.check_address(address)?;
        let status = self.current_status();
        let bytes = codec::encode_status(&status);
        self.log.push(Transaction::Read(bytes));
        trace!("{}: read {:02X?}", self.id, bytes);
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(tuner: &mut VirtualTuner, config: &DeviceConfig) {
        tuner.write(DEVICE_ADDRESS, &codec::encode(config)).unwrap();
    }

    fn read_status(tuner: &mut VirtualTuner) -> DeviceStatus {
        codec::decode(&tuner.read(DEVICE_ADDRESS).unwrap())
    }

    fn tuner_with_stations() -> VirtualTuner {
        let mut tuner = VirtualTuner::new("Test");
        tuner.add_station(VirtualStation::new(90.0, 8, true));
        tuner.add_station(VirtualStation::new(100.0, 5, false));
        tuner
    }

    #[test]
    fn test_create_virtual_tuner() {
        let tuner = VirtualTuner::new("Test Tuner");
        assert_eq!(tuner.id(), "Test Tuner");
        assert!(tuner.stations().is_empty());
        assert!(tuner.control().is_none());
        assert!(tuner.is_muted());
    }

    #[test]
    fn test_read_before_any_write_reports_power_on_channel() {
        let mut tuner = VirtualTuner::new("Test");
        let status = read_status(&mut tuner);
        assert!(!status.ready);
        assert_eq!(
            status.frequency_mhz(Crystal::Khz32768),
            DeviceConfig::DEFAULT_STATION_MHZ
        );
    }

    #[test]
    fn test_wrong_address_is_not_acknowledged() {
        let mut tuner = VirtualTuner::new("Test");
        assert_eq!(
            tuner.read(0x42),
            Err(TransportError::NoAcknowledge(0x42))
        );
        assert!(tuner.transactions().is_empty());
    }

    #[test]
    fn test_tuned_station_reports_level_and_stereo() {
        let mut tuner = tuner_with_stations();
        let config = DeviceConfig::default().with_frequency(90.0).unwrap();
        write_config(&mut tuner, &config);

        let status = read_status(&mut tuner);
        assert!(status.ready);
        assert!(status.stereo);
        assert_eq!(status.signal_level, 8);
        assert_eq!(status.if_counter, STATION_IF_COUNT);
        assert_eq!(status.frequency_mhz(Crystal::Khz32768), 90.0);
    }

    #[test]
    fn test_forced_mono_clears_stereo() {
        let mut tuner = tuner_with_stations();
        let config = DeviceConfig::default()
            .with_frequency(90.0)
            .unwrap()
            .with_forced_mono(true);
        write_config(&mut tuner, &config);
        assert!(!read_status(&mut tuner).stereo);
    }

    #[test]
    fn test_empty_channel_reports_noise_floor() {
        let mut tuner = tuner_with_stations();
        write_config(&mut tuner, &DeviceConfig::default().with_frequency(95.0).unwrap());
        let status = read_status(&mut tuner);
        assert_eq!(status.signal_level, 0);
        assert_eq!(status.if_counter, 0);
    }

    #[test]
    fn test_ready_after_configured_reads() {
        let mut tuner = VirtualTuner::from_config(VirtualTunerConfig {
            reads_until_ready: 3,
            ..Default::default()
        });
        write_config(&mut tuner, &DeviceConfig::default());
        assert!(!read_status(&mut tuner).ready);
        assert!(!read_status(&mut tuner).ready);
        assert!(read_status(&mut tuner).ready);
    }

    #[test]
    fn test_standby_never_ready() {
        let mut tuner = tuner_with_stations();
        write_config(&mut tuner, &DeviceConfig::default().with_standby(true));
        let status = read_status(&mut tuner);
        assert!(!status.ready);
        assert_eq!(status.signal_level, 0);
        assert!(tuner.is_standby());
    }

    #[test]
    fn test_search_up_stops_on_station() {
        let mut tuner = tuner_with_stations();
        let config = DeviceConfig::default()
            .with_frequency(88.0)
            .unwrap()
            .with_search(SearchDirection::Up);
        write_config(&mut tuner, &config);
        assert!(tuner.is_searching());

        let mut reads = 0;
        let status = loop {
            let status = read_status(&mut tuner);
            reads += 1;
            if status.ready {
                break status;
            }
        };

        // 88.1 .. 90.0 is twenty channels
        assert_eq!(reads, 20);
        assert!(!status.band_limit_reached);
        assert_eq!(status.frequency_mhz(Crystal::Khz32768), 90.0);
        assert!(!tuner.is_searching());
    }

    #[test]
    fn test_search_respects_stop_level() {
        let mut tuner = tuner_with_stations();
        let config = DeviceConfig::default()
            .with_frequency(99.5)
            .unwrap()
            .with_search_stop_level(tea5767_protocol::SearchStopLevel::High)
            .with_search(SearchDirection::Up);
        write_config(&mut tuner, &config);

        // The 100.0 MHz station (level 5) is below the high threshold
        let status = loop {
            let status = read_status(&mut tuner);
            if status.ready {
                break status;
            }
        };
        assert!(status.band_limit_reached);
        assert_eq!(tuner.frequency_mhz(), BAND_MAX_MHZ);
    }

    #[test]
    fn test_search_down_hits_lower_edge() {
        let mut tuner = VirtualTuner::new("Empty");
        let config = DeviceConfig::default()
            .with_frequency(87.7)
            .unwrap()
            .with_search(SearchDirection::Down);
        write_config(&mut tuner, &config);

        assert!(!read_status(&mut tuner).ready);
        let status = read_status(&mut tuner);
        assert!(status.ready);
        assert!(status.band_limit_reached);
        assert_eq!(tuner.frequency_mhz(), BAND_MIN_MHZ);
    }

    #[test]
    fn test_never_ready_still_flags_band_limit() {
        let mut tuner = VirtualTuner::new("Stuck");
        tuner.set_never_ready(true);
        let config = DeviceConfig::default()
            .with_frequency(107.8)
            .unwrap()
            .with_search(SearchDirection::Up);
        write_config(&mut tuner, &config);

        let status = read_status(&mut tuner);
        assert!(!status.ready);
        assert!(status.band_limit_reached);
    }

    #[test]
    fn test_injected_fault_fails_once() {
        let mut tuner = VirtualTuner::new("Flaky");
        tuner.inject_fault(TransportError::ArbitrationLoss);
        assert_eq!(
            tuner.write(DEVICE_ADDRESS, &codec::encode(&DeviceConfig::default())),
            Err(TransportError::ArbitrationLoss)
        );
        assert!(tuner
            .write(DEVICE_ADDRESS, &codec::encode(&DeviceConfig::default()))
            .is_ok());
        assert_eq!(tuner.write_count(), 1);
    }

    #[test]
    fn test_invalid_control_is_logged_but_ignored() {
        let mut tuner = VirtualTuner::new("Test");
        tuner
            .write(DEVICE_ADDRESS, &[0x00, 0x00, 0x00, 0x10, 0x80])
            .unwrap();
        assert!(tuner.control().is_none());
        assert_eq!(tuner.write_count(), 1);
    }

    #[test]
    fn test_transaction_log() {
        let mut tuner = tuner_with_stations();
        write_config(&mut tuner, &DeviceConfig::default());
        read_status(&mut tuner);
        read_status(&mut tuner);
        assert_eq!(tuner.write_count(), 1);
        assert_eq!(tuner.read_count(), 2);
        assert!(matches!(tuner.transactions()[0], Transaction::Write(_)));
        tuner.clear_log();
        assert!(tuner.transactions().is_empty());
    }

    #[test]
    fn test_state_summary() {
        let mut tuner = tuner_with_stations();
        let config = DeviceConfig::default().with_frequency(90.0).unwrap();
        write_config(&mut tuner, &config);
        assert_eq!(tuner.state_summary(), "Test - 90.0 MHz [MUTE]");
    }

    #[test]
    fn test_default_config_has_a_populated_band() {
        let tuner = VirtualTuner::from_config(VirtualTunerConfig::default());
        assert_eq!(tuner.stations().len(), 4);
        assert!(tuner
            .stations()
            .iter()
            .all(|s| frequency::in_band(s.frequency_mhz)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn tuned_channel_reads_back(channel in 0usize..frequency::CHANNEL_COUNT) {
                let mhz = frequency::channel_frequency(channel);
                let mut tuner = VirtualTuner::new("Prop");
                write_config(&mut tuner, &DeviceConfig::default().with_frequency(mhz).unwrap());
                let status = read_status(&mut tuner);
                prop_assert_eq!(status.frequency_mhz(Crystal::Khz32768), mhz);
                prop_assert!(!status.band_limit_reached);
            }
        }
    }
}
