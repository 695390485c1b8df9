//! Application settings

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tea5767_protocol::{frequency, DeviceConfig};
use tea5767_sim::VirtualTunerConfig;
use tea5767_tuner::{SearchSettings, TunerSettings};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Reference crystal in Hz (32768, 6500000 or 13000000)
    pub crystal_hz: u32,
    /// Station tuned by `start`
    pub default_frequency_mhz: f64,
    /// How long `start` and `on` wait for the ready flag
    pub power_on_timeout_ms: u64,
    /// Controller timing
    #[serde(default)]
    pub tuner: TunerSettings,
    /// Search and scan timing
    #[serde(default)]
    pub search: SearchSettings,
    /// Simulated receiver the front end drives
    #[serde(default)]
    pub virtual_tuner: VirtualTunerConfig,
    /// Append scan results to this file
    #[serde(default)]
    pub scan_log: Option<PathBuf>,
    /// Registers last written, restored on the next run
    #[serde(default)]
    pub last_state: Option<DeviceConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            crystal_hz: 32_768,
            default_frequency_mhz: 95.5,
            power_on_timeout_ms: 2000,
            tuner: TunerSettings::default(),
            search: SearchSettings::default(),
            virtual_tuner: VirtualTunerConfig::default(),
            scan_log: None,
            last_state: None,
        }
    }
}

impl Settings {
    /// Get the XDG config directory for fm-radio
    /// Uses $XDG_CONFIG_HOME/fm-radio, falls back to ~/.config/fm-radio
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("fm-radio"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("fm-radio"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::settings_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Load settings from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Keep `config` as the registers to restore next run
    ///
    /// A register image caught off the band (a search read past the edge) is
    /// not kept, since loading it would be rejected.
    pub fn remember(&mut self, config: DeviceConfig) {
        if frequency::in_band(config.station_frequency_mhz()) {
            self.last_state = Some(config);
        } else {
            tracing::warn!(
                "Not saving registers at {} MHz, outside the band",
                config.station_frequency_mhz()
            );
        }
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::settings_path().context("Could not determine settings path")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;

        Ok(())
    }
}
