//! Runs one command against the receiver

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tea5767_protocol::{
    display::{format_bits, format_frequency},
    frequency, BusTransport, Crystal, DeviceConfig,
};
use tea5767_sim::VirtualTuner;
use tea5767_tuner::embedded_hal::delay::DelayNs;
use tea5767_tuner::{
    CancelToken, ScanOutcome, SearchOutcome, StationObservation, StationSearch, TunerController,
    TunerEvent, TunerReading,
};
use tracing::{debug, info, trace, warn};

use crate::command::Command;
use crate::settings::Settings;

/// Tuner plus everything a command needs to run against it
pub struct Radio<T, D> {
    tuner: TunerController<T, D>,
    search: StationSearch,
    default_frequency_mhz: f64,
    power_on_timeout: Duration,
}

impl<D: DelayNs> Radio<VirtualTuner, D> {
    /// Open the simulated receiver described by the settings
    ///
    /// Registers saved by the previous run are written back first, the way
    /// a real chip keeps them while powered.
    pub fn simulated(settings: &Settings, delay: D) -> Result<Self> {
        let crystal = Crystal::try_from(settings.crystal_hz)
            .with_context(|| format!("Unsupported crystal {} Hz", settings.crystal_hz))?;
        let receiver = VirtualTuner::from_config(settings.virtual_tuner.clone());
        info!("Using simulated receiver \"{}\"", receiver.id());

        let mut radio = Self::new(receiver, delay, DeviceConfig::new(crystal), settings);
        match settings.last_state.map(|saved| saved.with_crystal(crystal)) {
            Some(saved) if frequency::in_band(saved.station_frequency_mhz()) => {
                radio
                    .tuner
                    .commit(saved)
                    .context("Failed to restore saved registers")?;
                debug!(
                    "Restored registers at {}",
                    format_frequency(radio.tuner.frequency_mhz())
                );
            }
            Some(saved) => warn!(
                "Ignoring saved registers at {}, outside the band",
                format_frequency(saved.station_frequency_mhz())
            ),
            None => {}
        }
        Ok(radio)
    }
}

impl<T: BusTransport, D: DelayNs> Radio<T, D> {
    pub fn new(transport: T, delay: D, config: DeviceConfig, settings: &Settings) -> Self {
        Self {
            tuner: TunerController::with_settings(
                transport,
                delay,
                config,
                settings.tuner.clone(),
            ),
            search: StationSearch::new(settings.search.clone()),
            default_frequency_mhz: settings.default_frequency_mhz,
            power_on_timeout: Duration::from_millis(settings.power_on_timeout_ms),
        }
    }

    /// Registers the device holds now
    pub fn config(&self) -> DeviceConfig {
        *self.tuner.config()
    }

    #[cfg(test)]
    pub fn tuner(&self) -> &TunerController<T, D> {
        &self.tuner
    }

    /// Run a command, returning the lines to show the user
    pub fn execute(
        &mut self,
        command: Command,
        cancel: &CancelToken,
        scan_log: Option<&Path>,
    ) -> Result<Vec<String>> {
        let lines = match command {
            Command::Start => {
                self.tuner.tune(self.default_frequency_mhz)?;
                let reading = self.tuner.power_on(self.power_on_timeout)?;
                vec!["Radio on".to_string(), self.describe(&reading)]
            }
            Command::On => {
                let reading = self.tuner.power_on(self.power_on_timeout)?;
                vec!["Radio on".to_string(), self.describe(&reading)]
            }
            Command::Off => {
                self.tuner.power_off()?;
                vec!["Radio off".to_string()]
            }
            Command::Mute => {
                let muted = self.tuner.toggle_mute()?;
                vec![(if muted { "Muted" } else { "Unmuted" }).to_string()]
            }
            Command::Status => {
                let reading = self.tuner.read_status()?;
                vec![self.describe(&reading)]
            }
            Command::Tune(mhz) => {
                self.tuner.tune(mhz)?;
                let reading = self.tuner.read_status()?;
                vec![self.describe(&reading)]
            }
            Command::Search(direction) => {
                match self.search.search(&mut self.tuner, direction, cancel)? {
                    SearchOutcome::Found { .. } => {
                        let reading = self.tuner.read_status()?;
                        vec![format!("Station found: {}", self.describe(&reading))]
                    }
                    SearchOutcome::NotFound => vec![format!(
                        "End of band, no station found. Back on {}",
                        format_frequency(self.tuner.frequency_mhz())
                    )],
                    SearchOutcome::Cancelled => vec!["Search cancelled".to_string()],
                    SearchOutcome::TimedOut => vec!["Search gave up".to_string()],
                }
            }
            Command::Scan(direction) => {
                let outcome = self.search.scan(&mut self.tuner, direction, cancel)?;
                let mut lines: Vec<String> =
                    outcome.observations().iter().map(describe_station).collect();
                lines.push(match &outcome {
                    ScanOutcome::Completed(found) => format!("{} stations", found.len()),
                    ScanOutcome::Cancelled(found) => {
                        format!("Scan cancelled, {} stations so far", found.len())
                    }
                });
                if let Some(path) = scan_log {
                    append_scan_log(path, outcome.observations())?;
                }
                lines
            }
            Command::Help => Vec::new(),
        };

        self.log_traffic();
        Ok(lines)
    }

    fn describe(&self, reading: &TunerReading) -> String {
        let mut line = format!(
            "{} {}",
            format_frequency(reading.frequency_mhz),
            reading.status
        );
        if self.tuner.is_standby() {
            line.push_str(" [STANDBY]");
        }
        if self.tuner.is_muted() {
            line.push_str(" [MUTE]");
        }
        line
    }

    fn log_traffic(&mut self) {
        for event in self.tuner.drain_events() {
            match event {
                TunerEvent::BusWrite { bytes } => trace!("write\n{}", format_bits(&bytes)),
                TunerEvent::BusRead { bytes } => trace!("read\n{}", format_bits(&bytes)),
                other => debug!("{:?}", other),
            }
        }
    }
}

fn describe_station(station: &StationObservation) -> String {
    format!(
        "{:>9}  level {:>2}/15{}",
        format_frequency(station.frequency_mhz),
        station.signal_level,
        if station.stereo { "  stereo" } else { "" }
    )
}

fn append_scan_log(path: &Path, stations: &[StationObservation]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open scan log {}", path.display()))?;
    for station in stations {
        writeln!(
            file,
            "{:.1} {} {}",
            station.frequency_mhz,
            station.signal_level,
            if station.stereo { "stereo" } else { "mono" }
        )
        .with_context(|| format!("Failed to write scan log {}", path.display()))?;
    }
    info!("Logged {} stations to {}", stations.len(), path.display());
    Ok(())
}
