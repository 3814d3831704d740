//! Simulation configuration.
//!
//! Read from `skirmish.toml`. Every field has a default, so a partial file
//! (or none at all) is fine.

use serde::{Deserialize, Serialize};
use skirmish_common::{ConfigError, ConfigResult};
use skirmish_gameplay::{CueTiming, WaveConfig, DEFAULT_PROFILE_PATH};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "skirmish.toml";

/// Simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Timing ===
    /// Fixed ticks per simulated second
    pub tick_rate: u32,
    /// Give up on a wave after this many simulated seconds
    pub wave_time_limit: f32,

    // === Run ===
    /// RNG seed for every combat roll
    pub seed: u64,
    /// Waves to play before stopping
    pub waves: u32,

    // === Content ===
    /// Directory holding profile TOML files
    pub profile_dir: PathBuf,
    /// Archetype the player spawns as
    pub player_archetype: String,
    /// Archetypes enemy waves cycle through
    pub enemy_archetypes: Vec<String>,

    // === Tuning ===
    /// Wave size and scaling
    pub wave: WaveConfig,
    /// Attack cue delays
    pub cues: CueTiming,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: 30,
            wave_time_limit: 90.0,

            seed: 0x5EED,
            waves: 3,

            profile_dir: PathBuf::from(DEFAULT_PROFILE_PATH),
            player_archetype: "ranger".to_string(),
            enemy_archetypes: vec!["grunt".to_string(), "brute".to_string()],

            wave: WaveConfig::default(),
            cues: CueTiming::default(),
        }
    }
}

impl SimConfig {
    /// Loads `path`, falling back to defaults when it is missing or broken.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::try_load_from(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(ConfigError::NotFound(_)) => {
                info!("Config file not found, using defaults");
                Self::default()
            },
            Err(e) => {
                warn!("Failed to load config file: {e}");
                Self::default()
            },
        }
    }

    /// Loads and validates `path`.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Clamps soft values and rejects ones the run cannot start with.
    pub fn validate(&mut self) -> ConfigResult<()> {
        if self.enemy_archetypes.is_empty() {
            return Err(ConfigError::invalid("enemy_archetypes", "at least one is required"));
        }
        if self.player_archetype.is_empty() {
            return Err(ConfigError::invalid("player_archetype", "must not be empty"));
        }
        self.tick_rate = self.tick_rate.clamp(1, 240);
        self.wave_time_limit = self.wave_time_limit.max(1.0);
        self.cues.effect_delay = self.cues.effect_delay.max(0.0);
        self.cues.end_delay = self.cues.end_delay.max(self.cues.effect_delay);
        self.wave.base_size = self.wave.base_size.max(1);
        Ok(())
    }

    /// Seconds per tick.
    #[must_use]
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Enemy archetype of wave `wave` (1-based).
    #[must_use]
    pub fn enemy_archetype_for(&self, wave: u32) -> &str {
        let index = wave.saturating_sub(1) as usize % self.enemy_archetypes.len().max(1);
        self.enemy_archetypes
            .get(index)
            .map_or("", String::as_str)
    }
}
