//! Blocking tuner controller
//!
//! Owns a bus transport, a delay provider and the current register image.
//! Every operation builds a new [`DeviceConfig`], writes it, and only adopts
//! it once the write succeeded, so the cached image always matches what the
//! device last accepted.

use std::time::Duration;

use embedded_hal::delay::DelayNs;
use serde::{Deserialize, Serialize};
use tea5767_protocol::{
    codec,
    display::{annotate_control, format_frequency},
    BusTransport, DeviceConfig, DeviceStatus, DEVICE_ADDRESS,
};
use tracing::{debug, info, warn};

use crate::error::TunerError;
use crate::events::TunerEvent;

/// Timing knobs for the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerSettings {
    /// Interval between status polls while waiting for ready
    pub poll_interval_ms: u64,
    /// Bus address of the device
    pub address: u8,
}

impl Default for TunerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            address: DEVICE_ADDRESS,
        }
    }
}

/// One status read together with the station it resolves to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TunerReading {
    pub status: DeviceStatus,
    pub frequency_mhz: f64,
}

/// Drives one TEA5767 over a bus transport
///
/// Not thread safe: operations issue several transactions that must not
/// interleave with another caller's. Wrap it in a mutex or hand it to a
/// single worker thread when sharing.
pub struct TunerController<T, D> {
    transport: T,
    delay: D,
    config: DeviceConfig,
    settings: TunerSettings,
    events: Vec<TunerEvent>,
}

impl<T: BusTransport, D: DelayNs> TunerController<T, D> {
    /// Create a controller with default timing
    ///
    /// Nothing is written until the first operation.
    pub fn new(transport: T, delay: D, config: DeviceConfig) -> Self {
        Self::with_settings(transport, delay, config, TunerSettings::default())
    }

    pub fn with_settings(
        transport: T,
        delay: D,
        config: DeviceConfig,
        settings: TunerSettings,
    ) -> Self {
        Self {
            transport,
            delay,
            config,
            settings,
            events: Vec::new(),
        }
    }

    /// Register image last accepted by the device
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn settings(&self) -> &TunerSettings {
        &self.settings
    }

    /// Station the controller believes is tuned
    pub fn frequency_mhz(&self) -> f64 {
        self.config.station_frequency_mhz()
    }

    pub fn is_muted(&self) -> bool {
        self.config.mute
    }

    pub fn is_standby(&self) -> bool {
        self.config.standby
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Take back the transport and delay
    pub fn into_parts(self) -> (T, D) {
        (self.transport, self.delay)
    }

    /// Remove and return everything recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<TunerEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: TunerEvent) {
        self.events.push(event);
    }

    /// Adopt `config` without writing it, after a restore write has failed
    pub(crate) fn assume_config(&mut self, config: DeviceConfig) {
        self.config = config;
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Write a full register image and adopt it on success
    ///
    /// On failure the cached image is left as it was.
    pub fn commit(&mut self, config: DeviceConfig) -> Result<(), TunerError> {
        let bytes = codec::encode(&config);
        debug!("write {}", annotate_control(&bytes));
        self.transport.write(self.settings.address, &bytes)?;
        self.events.push(TunerEvent::BusWrite { bytes });
        self.config = config;
        Ok(())
    }

    /// Read and decode the status registers
    ///
    /// The reported PLL word is adopted into the cached image so a later
    /// write keeps the station the device actually sits on.
    pub fn read_status(&mut self) -> Result<TunerReading, TunerError> {
        let bytes = self.transport.read(self.settings.address)?;
        self.events.push(TunerEvent::BusRead { bytes });
        let status = codec::decode(&bytes);
        self.config = self.config.with_pll_word(status.pll_word);
        let frequency_mhz = self.config.station_frequency_mhz();
        debug!("read {} at {}", status, format_frequency(frequency_mhz));
        Ok(TunerReading {
            status,
            frequency_mhz,
        })
    }

    /// Block for the given number of milliseconds
    pub fn pause_ms(&mut self, ms: u64) {
        self.delay.delay_ms(u32::try_from(ms).unwrap_or(u32::MAX));
    }

    /// Apply a transformation to the cached image and write it
    pub fn reconfigure<F>(&mut self, change: F) -> Result<(), TunerError>
    where
        F: FnOnce(DeviceConfig) -> Result<DeviceConfig, TunerError>,
    {
        let config = change(self.config)?;
        self.commit(config)?;
        self.events.push(TunerEvent::Reconfigured);
        Ok(())
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Leave standby, unmute, and wait for the ready flag
    ///
    /// Polls every `poll_interval_ms` until ready or until `timeout` has been
    /// spent waiting.
    pub fn power_on(&mut self, timeout: Duration) -> Result<TunerReading, TunerError> {
        let config = self
            .config
            .with_standby(false)
            .with_mute(false)
            .with_high_cut_control(true)
            .with_stereo_noise_canceling(true);
        self.commit(config)?;
        info!("Radio on at {}", format_frequency(self.frequency_mhz()));

        let interval = self.settings.poll_interval_ms.max(1);
        let budget = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let mut waited_ms = 0u64;
        loop {
            let reading = self.read_status()?;
            if reading.status.ready {
                self.events.push(TunerEvent::PoweredOn {
                    frequency_mhz: reading.frequency_mhz,
                });
                return Ok(reading);
            }
            if waited_ms >= budget {
                warn!("Device not ready after {}ms", waited_ms);
                return Err(TunerError::TimedOut { waited_ms });
            }
            self.pause_ms(interval);
            waited_ms += interval;
        }
    }

    /// Enter standby
    pub fn power_off(&mut self) -> Result<(), TunerError> {
        self.commit(self.config.with_standby(true))?;
        info!("Radio off");
        self.events.push(TunerEvent::PoweredOff);
        Ok(())
    }

    /// Tune to a station inside the band
    ///
    /// Out-of-band requests fail before anything reaches the bus.
    pub fn tune(&mut self, mhz: f64) -> Result<(), TunerError> {
        let config = self.config.with_frequency(mhz)?;
        self.commit(config)?;
        let frequency_mhz = self.frequency_mhz();
        info!("Tuned to {}", format_frequency(frequency_mhz));
        self.events.push(TunerEvent::Tuned { frequency_mhz });
        Ok(())
    }

    pub fn set_mute(&mut self, muted: bool) -> Result<(), TunerError> {
        self.commit(self.config.with_mute(muted))?;
        info!("{}", if muted { "Muted" } else { "Unmuted" });
        self.events.push(TunerEvent::MuteChanged { muted });
        Ok(())
    }

    /// Flip the mute flag, returning the new state
    pub fn toggle_mute(&mut self) -> Result<bool, TunerError> {
        let muted = !self.config.mute;
        self.set_mute(muted)?;
        Ok(muted)
    }

    pub fn set_standby(&mut self, standby: bool) -> Result<(), TunerError> {
        if standby {
            return self.power_off();
        }
        self.reconfigure(|c| Ok(c.with_standby(false)))
    }

    pub fn set_forced_mono(&mut self, forced_mono: bool) -> Result<(), TunerError> {
        self.reconfigure(|c| Ok(c.with_forced_mono(forced_mono)))
    }

    pub fn set_soft_mute(&mut self, soft_mute: bool) -> Result<(), TunerError> {
        self.reconfigure(|c| Ok(c.with_soft_mute(soft_mute)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use crate::delay::SimulatedDelay;
    use tea5767_protocol::{
        codec::encode_status, frequency, Crystal, DomainError, PllWord, TransportError,
        TRANSACTION_LEN,
    };

    /// Transport that records writes and replays canned reads
    #[derive(Default)]
    struct ScriptedBus {
        writes: Vec<[u8; TRANSACTION_LEN]>,
        reads: VecDeque<[u8; TRANSACTION_LEN]>,
        reads_taken: usize,
        fail_writes: bool,
    }

    impl ScriptedBus {
        fn answering(statuses: &[DeviceStatus]) -> Self {
            Self {
                reads: statuses.iter().map(encode_status).collect(),
                ..Default::default()
            }
        }
    }

    impl BusTransport for ScriptedBus {
        fn write(
            &mut self,
            _address: u8,
            bytes: &[u8; TRANSACTION_LEN],
        ) -> Result<(), TransportError> {
            if self.fail_writes {
                return Err(TransportError::Timeout);
            }
            self.writes.push(*bytes);
            Ok(())
        }

        fn read(&mut self, _address: u8) -> Result<[u8; TRANSACTION_LEN], TransportError> {
            self.reads_taken += 1;
            self.reads.pop_front().ok_or(TransportError::Timeout)
        }
    }

    fn status_at(mhz: f64, ready: bool) -> DeviceStatus {
        DeviceStatus {
            ready,
            pll_word: frequency::to_register(mhz, Crystal::Khz32768),
            signal_level: 9,
            ..Default::default()
        }
    }

    fn controller(bus: ScriptedBus) -> TunerController<ScriptedBus, SimulatedDelay> {
        TunerController::new(bus, SimulatedDelay::new(), DeviceConfig::default())
    }

    #[test]
    fn test_power_on_writes_then_polls() {
        let bus = ScriptedBus::answering(&[status_at(88.1, false), status_at(88.1, true)]);
        let mut tuner = controller(bus);

        let reading = tuner.power_on(Duration::from_millis(2000)).unwrap();
        assert!(reading.status.ready);
        assert_eq!(reading.frequency_mhz, 88.1);

        let written = codec::decode_control(&tuner.transport().writes[0]).unwrap();
        assert!(!written.standby);
        assert!(!written.mute);
        assert!(written.high_cut_control);
        assert!(written.stereo_noise_canceling);
        assert_eq!(tuner.transport().reads_taken, 2);
        assert_eq!(tuner.delay().elapsed(), Duration::from_millis(250));
    }

    #[test]
    fn test_power_on_times_out() {
        let never: Vec<_> = (0..10).map(|_| status_at(88.1, false)).collect();
        let mut tuner = controller(ScriptedBus::answering(&never));

        let err = tuner.power_on(Duration::from_millis(500)).unwrap_err();
        assert_eq!(err, TunerError::TimedOut { waited_ms: 500 });
        // Initial read plus one per interval
        assert_eq!(tuner.transport().reads_taken, 3);
    }

    #[test]
    fn test_tune_rejects_out_of_band_without_traffic() {
        let mut tuner = controller(ScriptedBus::default());
        let before = *tuner.config();

        for mhz in [87.4, 108.0, 0.0, -1.0] {
            let err = tuner.tune(mhz).unwrap_err();
            assert!(matches!(
                err,
                TunerError::Domain(DomainError::FrequencyOutOfBand { .. })
            ));
        }
        assert!(tuner.transport().writes.is_empty());
        assert_eq!(*tuner.config(), before);
    }

    #[test]
    fn test_tune_writes_pll_word() {
        let mut tuner = controller(ScriptedBus::default());
        tuner.tune(95.5).unwrap();
        let bytes = tuner.transport().writes[0];
        assert_eq!(PllWord::from_bytes(bytes[0], bytes[1]).value(), 0x2DA5);
        assert_eq!(tuner.frequency_mhz(), 95.5);
    }

    #[test]
    fn test_failed_write_keeps_config() {
        let mut tuner = controller(ScriptedBus {
            fail_writes: true,
            ..Default::default()
        });
        let before = *tuner.config();

        let err = tuner.tune(101.1).unwrap_err();
        assert_eq!(err, TunerError::Transport(TransportError::Timeout));
        assert_eq!(*tuner.config(), before);
        assert!(tuner.drain_events().is_empty());
    }

    #[test]
    fn test_toggle_mute_flips_state() {
        let mut tuner = controller(ScriptedBus::default());
        assert!(tuner.is_muted());
        assert!(!tuner.toggle_mute().unwrap());
        assert!(tuner.toggle_mute().unwrap());
        assert_eq!(tuner.transport().writes[0][0] & 0x80, 0);
        assert_eq!(tuner.transport().writes[1][0] & 0x80, 0x80);
    }

    #[test]
    fn test_read_status_adopts_reported_station() {
        let mut tuner = controller(ScriptedBus::answering(&[status_at(104.3, true)]));
        let reading = tuner.read_status().unwrap();
        assert_eq!(reading.frequency_mhz, 104.3);
        assert_eq!(tuner.frequency_mhz(), 104.3);
    }

    #[test]
    fn test_power_off_sets_standby() {
        let mut tuner = controller(ScriptedBus::default());
        tuner.power_off().unwrap();
        assert!(tuner.is_standby());
        let written = codec::decode_control(&tuner.transport().writes[0]).unwrap();
        assert!(written.standby);
    }

    #[test]
    fn test_events_record_traffic_and_state() {
        let mut tuner = controller(ScriptedBus::default());
        tuner.tune(90.0).unwrap();
        tuner.set_forced_mono(true).unwrap();

        let events = tuner.drain_events();
        assert_eq!(events.len(), 4);
        assert!(events[0].is_traffic());
        assert_eq!(events[1], TunerEvent::Tuned { frequency_mhz: 90.0 });
        assert!(events[2].is_traffic());
        assert_eq!(events[3], TunerEvent::Reconfigured);
        assert!(tuner.drain_events().is_empty());
    }

    #[test]
    fn test_reconfigure_error_skips_write() {
        let mut tuner = controller(ScriptedBus::default());
        let err = tuner
            .reconfigure(|c| Ok(c.with_frequency(120.0)?))
            .unwrap_err();
        assert!(matches!(err, TunerError::Domain(_)));
        assert!(tuner.transport().writes.is_empty());
    }
}
