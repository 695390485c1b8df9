//! Station search and band scan
//!
//! Two strategies:
//!
//! - **Hardware search** puts the device in search mode and polls until it
//!   stops on a station or runs into a band edge.
//! - **Software scan** steps through every 100 kHz channel, tuning and
//!   sampling the signal level at each one, and collects every channel above
//!   a threshold.
//!
//! Both check a [`CancelToken`] between bus transactions and leave the
//! device on a known configuration when they return.

use embedded_hal::delay::DelayNs;
use serde::{Deserialize, Serialize};
use tea5767_protocol::{
    display::format_frequency,
    frequency::{self, CHANNEL_COUNT, CHANNEL_STEP_MHZ},
    BusTransport, DeviceConfig, DeviceStatus, SearchDirection,
};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::controller::TunerController;
use crate::error::TunerError;
use crate::events::TunerEvent;

/// Timing and threshold knobs for search and scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Wait between status polls during a hardware search
    pub search_step_ms: u64,
    /// Wait after restoring the previous station when a search fails
    pub search_settle_ms: u64,
    /// Wait after tuning each channel during a scan
    pub scan_settle_ms: u64,
    /// A scanned channel is kept when its level is strictly above this
    pub signal_threshold: u8,
    /// Upper bound on polls for one hardware search
    pub max_search_polls: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            search_step_ms: 500,
            search_settle_ms: 100,
            scan_settle_ms: 200,
            signal_threshold: 4,
            max_search_polls: 2 * CHANNEL_COUNT as u32,
        }
    }
}

/// A channel heard during a scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationObservation {
    pub frequency_mhz: f64,
    pub signal_level: u8,
    pub stereo: bool,
}

/// Result of a hardware search
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Device stopped on a station and has been unmuted there
    Found {
        frequency_mhz: f64,
        status: DeviceStatus,
    },
    /// Search ran off the band; previous station restored
    NotFound,
    /// Cancel requested; previous station restored
    Cancelled,
    /// Device kept searching past the poll budget; previous station restored
    TimedOut,
}

impl SearchOutcome {
    /// Station the search stopped on, if any
    pub fn frequency_mhz(&self) -> Option<f64> {
        match self {
            SearchOutcome::Found { frequency_mhz, .. } => Some(*frequency_mhz),
            _ => None,
        }
    }
}

/// Result of a software scan
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Every channel was visited
    Completed(Vec<StationObservation>),
    /// Cancel requested part way; holds what was heard so far
    Cancelled(Vec<StationObservation>),
}

impl ScanOutcome {
    /// Stations heard, in scan order
    pub fn observations(&self) -> &[StationObservation] {
        match self {
            ScanOutcome::Completed(found) | ScanOutcome::Cancelled(found) => found,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ScanOutcome::Completed(_))
    }

    pub fn into_observations(self) -> Vec<StationObservation> {
        match self {
            ScanOutcome::Completed(found) | ScanOutcome::Cancelled(found) => found,
        }
    }
}

/// Progress of one scan across the band
#[derive(Debug)]
struct SearchSession {
    direction: SearchDirection,
    step_mhz: f64,
    visited: usize,
    current_mhz: Option<f64>,
    observations: Vec<StationObservation>,
    finished: bool,
}

impl SearchSession {
    fn new(direction: SearchDirection) -> Self {
        Self {
            direction,
            step_mhz: direction.sign() * CHANNEL_STEP_MHZ,
            visited: 0,
            current_mhz: None,
            observations: Vec::new(),
            finished: false,
        }
    }

    /// Advance to the next channel, or finish at the far band edge
    fn advance(&mut self) -> Option<f64> {
        if self.visited >= CHANNEL_COUNT {
            self.finished = true;
            return None;
        }
        let index = match self.direction {
            SearchDirection::Up => self.visited,
            SearchDirection::Down => CHANNEL_COUNT - 1 - self.visited,
        };
        self.visited += 1;
        let mhz = frequency::channel_frequency(index);
        self.current_mhz = Some(mhz);
        Some(mhz)
    }

    fn record(&mut self, observation: StationObservation) {
        self.observations.push(observation);
    }
}

/// Runs hardware searches and software scans on a controller
#[derive(Debug, Clone, Default)]
pub struct StationSearch {
    settings: SearchSettings,
}

impl StationSearch {
    pub fn new(settings: SearchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Let the device search for the next station in `direction`
    ///
    /// The device is muted while searching. On success it is left unmuted on
    /// the station found. On every other outcome, a bus error included, the
    /// station and mute state from before the search are written back.
    pub fn search<T: BusTransport, D: DelayNs>(
        &self,
        tuner: &mut TunerController<T, D>,
        direction: SearchDirection,
        cancel: &CancelToken,
    ) -> Result<SearchOutcome, TunerError> {
        let origin = *tuner.config();
        let from_mhz = origin.station_frequency_mhz();
        tuner.commit(origin.with_search(direction))?;
        info!("Searching {} from {}", direction, format_frequency(from_mhz));
        tuner.push_event(TunerEvent::SearchStarted {
            direction,
            from_mhz,
        });

        self.poll_search(tuner, origin, cancel).inspect_err(|err| {
            warn!("Search failed: {}", err);
            self.recover(tuner, origin.without_search());
            tuner.push_event(TunerEvent::SearchAbandoned {
                reason: "bus error",
            });
        })
    }

    fn poll_search<T: BusTransport, D: DelayNs>(
        &self,
        tuner: &mut TunerController<T, D>,
        origin: DeviceConfig,
        cancel: &CancelToken,
    ) -> Result<SearchOutcome, TunerError> {
        let mut polls = 0u32;
        loop {
            if cancel.is_cancelled() {
                warn!("Search cancelled");
                self.abandon(tuner, origin, "cancelled")?;
                return Ok(SearchOutcome::Cancelled);
            }
            if polls >= self.settings.max_search_polls {
                warn!("Search still running after {} polls", polls);
                self.abandon(tuner, origin, "poll budget spent")?;
                return Ok(SearchOutcome::TimedOut);
            }

            tuner.pause_ms(self.settings.search_step_ms);
            let reading = tuner.read_status()?;
            polls += 1;
            debug!("Search at {}", format_frequency(reading.frequency_mhz));

            if reading.status.band_limit_reached || !frequency::in_band(reading.frequency_mhz) {
                info!("End of band reached, no station found");
                self.abandon(tuner, origin, "band limit")?;
                tuner.pause_ms(self.settings.search_settle_ms);
                return Ok(SearchOutcome::NotFound);
            }

            if reading.status.ready {
                tuner.commit(tuner.config().without_search().with_mute(false))?;
                info!(
                    "Station found at {} ({})",
                    format_frequency(reading.frequency_mhz),
                    reading.status
                );
                tuner.push_event(TunerEvent::StationFound {
                    frequency_mhz: reading.frequency_mhz,
                    signal_level: reading.status.signal_level,
                    stereo: reading.status.stereo,
                });
                return Ok(SearchOutcome::Found {
                    frequency_mhz: reading.frequency_mhz,
                    status: reading.status,
                });
            }
        }
    }

    /// Step through every channel and collect those above the threshold
    ///
    /// Channels are visited in ascending order for `Up` and descending for
    /// `Down`. The configuration from before the scan is written back when
    /// the scan completes, is cancelled, or stops on a bus error.
    pub fn scan<T: BusTransport, D: DelayNs>(
        &self,
        tuner: &mut TunerController<T, D>,
        direction: SearchDirection,
        cancel: &CancelToken,
    ) -> Result<ScanOutcome, TunerError> {
        let origin = *tuner.config();
        let mut session = SearchSession::new(direction);
        info!(
            "Scanning band {} in {} MHz steps",
            direction, session.step_mhz
        );
        tuner.push_event(TunerEvent::ScanStarted { direction });

        if let Err(err) = self.sweep(tuner, &mut session, cancel) {
            warn!(
                "Scan failed at {}: {}",
                session
                    .current_mhz
                    .map(format_frequency)
                    .unwrap_or_else(|| "start".to_string()),
                err
            );
            self.recover(tuner, origin);
            return Err(err);
        }

        tuner.commit(origin)?;
        let stations = session.observations.len();
        tuner.push_event(TunerEvent::ScanFinished {
            stations,
            cancelled: !session.finished,
        });
        info!("Scan finished, {} stations", stations);

        Ok(if session.finished {
            ScanOutcome::Completed(session.observations)
        } else {
            ScanOutcome::Cancelled(session.observations)
        })
    }

    fn sweep<T: BusTransport, D: DelayNs>(
        &self,
        tuner: &mut TunerController<T, D>,
        session: &mut SearchSession,
        cancel: &CancelToken,
    ) -> Result<(), TunerError> {
        while !session.finished {
            if cancel.is_cancelled() {
                warn!(
                    "Scan cancelled at {}",
                    session
                        .current_mhz
                        .map(format_frequency)
                        .unwrap_or_else(|| "start".to_string())
                );
                break;
            }
            let Some(mhz) = session.advance() else {
                break;
            };

            tuner.commit(tuner.config().with_frequency(mhz)?)?;
            tuner.pause_ms(self.settings.scan_settle_ms);
            let reading = tuner.read_status()?;

            if reading.status.signal_level > self.settings.signal_threshold {
                info!(
                    "Station at {} level {}{}",
                    format_frequency(mhz),
                    reading.status.signal_level,
                    if reading.status.stereo { " stereo" } else { "" }
                );
                session.record(StationObservation {
                    frequency_mhz: mhz,
                    signal_level: reading.status.signal_level,
                    stereo: reading.status.stereo,
                });
            }
        }
        Ok(())
    }

    fn abandon<T: BusTransport, D: DelayNs>(
        &self,
        tuner: &mut TunerController<T, D>,
        origin: DeviceConfig,
        reason: &'static str,
    ) -> Result<(), TunerError> {
        tuner.commit(origin.without_search())?;
        tuner.push_event(TunerEvent::SearchAbandoned { reason });
        Ok(())
    }

    /// Write `config` back after a failure, keeping it cached even when the
    /// write fails too
    fn recover<T: BusTransport, D: DelayNs>(
        &self,
        tuner: &mut TunerController<T, D>,
        config: DeviceConfig,
    ) {
        if let Err(err) = tuner.commit(config) {
            warn!(
                "Failed to restore {}: {}",
                format_frequency(config.station_frequency_mhz()),
                err
            );
            tuner.assume_config(config);
        }
    }
}
