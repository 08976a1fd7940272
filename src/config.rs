//! Configuration management for the sound engine
//!
//! This module provides runtime configuration loading from JSON files so bus
//! levels, fade timings and asset locations can be tuned without
//! recompilation. Every section falls back to defaults field by field.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::assets::SoundKind;

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    pub gains: GainConfig,
    pub timing: TimingConfig,
    pub assets: AssetConfig,
    pub preferences: PreferenceConfig,
    pub output: OutputConfig,
}

/// Fixed sub-bus levels
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GainConfig {
    /// Ambient bus level once a fade-in completes
    pub ambient_bus: f32,
    /// One-shot cue bus level
    pub cue_bus: f32,
}

impl Default for GainConfig {
    fn default() -> Self {
        Self {
            ambient_bus: 0.5,
            cue_bus: 0.3,
        }
    }
}

/// Fade and ramp durations, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Default total crossfade between ambient beds
    pub crossfade_ms: u64,
    /// Default fade-out for an explicit ambient stop
    pub stop_fade_ms: u64,
    /// Fade-out applied to the ambient bed when sound is disabled
    pub disable_fade_ms: u64,
    /// Master ramp on enable/disable
    pub mute_ramp_ms: u64,
    /// Master ramp on volume change
    pub volume_ramp_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            crossfade_ms: 2000,
            stop_fade_ms: 1000,
            disable_fade_ms: 500,
            mute_ramp_ms: 300,
            volume_ramp_ms: 100,
        }
    }
}

impl TimingConfig {
    pub fn crossfade(&self) -> Duration {
        Duration::from_millis(self.crossfade_ms)
    }

    pub fn stop_fade(&self) -> Duration {
        Duration::from_millis(self.stop_fade_ms)
    }

    pub fn disable_fade(&self) -> Duration {
        Duration::from_millis(self.disable_fade_ms)
    }

    pub fn mute_ramp(&self) -> Duration {
        Duration::from_millis(self.mute_ramp_ms)
    }

    pub fn volume_ramp(&self) -> Duration {
        Duration::from_millis(self.volume_ramp_ms)
    }
}

/// Where sound assets live
///
/// URLs are built as `{base_url}/{dir}/{name}.{extension}`. `base_url` may be
/// an `http(s)://` origin, a site-relative path, or a filesystem directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub base_url: String,
    pub ambient_dir: String,
    pub cue_dir: String,
    pub extension: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            base_url: "/sounds".to_string(),
            ambient_dir: "ambient".to_string(),
            cue_dir: "ui".to_string(),
            extension: "wav".to_string(),
        }
    }
}

impl AssetConfig {
    /// Build the asset URL for a sound kind
    pub fn url_for(&self, kind: SoundKind) -> String {
        let dir = match kind {
            SoundKind::Ambient(_) => &self.ambient_dir,
            SoundKind::Cue(_) => &self.cue_dir,
        };
        format!(
            "{}/{}/{}.{}",
            self.base_url.trim_end_matches('/'),
            dir,
            kind.name(),
            self.extension
        )
    }
}

/// Preference persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceConfig {
    /// Key under which the preference blob is stored
    pub storage_key: String,
    /// JSON file backing the key-value store (CLI only)
    pub storage_path: Option<PathBuf>,
    pub default_enabled: bool,
    pub default_volume: f32,
}

impl Default for PreferenceConfig {
    fn default() -> Self {
        Self {
            storage_key: "sound-preferences".to_string(),
            storage_path: None,
            default_enabled: false,
            default_volume: 0.7,
        }
    }
}

/// Output format used by the offline backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

impl SoundConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file is missing or
    /// malformed. Never fails.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file("assets/sound_config.json")
    }
}
