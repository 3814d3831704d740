//! Stat archetypes and their TOML loader.
//!
//! This module provides:
//! - `StatProfile`, the immutable per-archetype numbers
//! - `BehaviorTuning`, the timing and distance knobs of the state machines
//! - Loading profiles from assets/profiles/*.toml with validation on load
//! - A registry with lookup by archetype id and name

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use skirmish_common::{ArchetypeId, ConfigError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default asset path for profiles.
pub const DEFAULT_PROFILE_PATH: &str = "assets/profiles";

/// Range used when a profile leaves `attack_range` unset or zero.
pub const DEFAULT_ATTACK_RANGE: f32 = 2.0;

/// Errors that can occur during profile loading.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Underlying file or parse failure.
    #[error("Profile config error: {0}")]
    Config(#[from] ConfigError),

    /// Validation error.
    #[error("Profile `{name}` is invalid: {reason}")]
    Invalid {
        /// Profile name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Duplicate archetype ID.
    #[error("Duplicate archetype ID: {0:?}")]
    DuplicateId(ArchetypeId),

    /// Duplicate archetype name.
    #[error("Duplicate archetype name: {0}")]
    DuplicateName(String),

    /// No profile registered under that name.
    #[error("Unknown archetype: {0}")]
    Unknown(String),
}

impl From<std::io::Error> for ProfileError {
    fn from(e: std::io::Error) -> Self {
        Self::Config(ConfigError::Io(e))
    }
}

impl From<toml::de::Error> for ProfileError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(ConfigError::Parse(e))
    }
}

/// Result type for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Timing and distance knobs consumed by the entity states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorTuning {
    /// Distance at which an idle AI notices its target.
    pub detection_range: f32,
    /// Maximum distance from home an AI will chase.
    pub leash_range: f32,
    /// Distance from home that counts as "arrived".
    pub home_tolerance: f32,
    /// Time spent staggered after a landed hit.
    pub hurt_recovery_seconds: f32,
    /// Time a corpse lingers before removal.
    pub decay_seconds: f32,
    /// Length of a roll.
    pub roll_seconds: f32,
    /// Move-speed multiplier while rolling.
    pub roll_speed_multiplier: f32,
    /// Minimum time between rolls.
    pub roll_cooldown_seconds: f32,
    /// Wind-up of a charged attack.
    pub charge_seconds: f32,
    /// Damage multiplier of a charged attack.
    pub charged_damage_multiplier: f32,
    /// Time after a charged blow lands before the attack ends.
    pub charge_recovery_seconds: f32,
    /// Knockback impulse applied to a defender that took damage.
    pub knockback: f32,
    /// Experience dropped on death.
    pub experience_reward: u32,
}

impl Default for BehaviorTuning {
    fn default() -> Self {
        Self {
            detection_range: 12.0,
            leash_range: 25.0,
            home_tolerance: 0.5,
            hurt_recovery_seconds: 0.4,
            decay_seconds: 2.0,
            roll_seconds: 0.5,
            roll_speed_multiplier: 2.5,
            roll_cooldown_seconds: 1.0,
            charge_seconds: 1.0,
            charged_damage_multiplier: 2.5,
            charge_recovery_seconds: 0.25,
            knockback: 2.0,
            experience_reward: 10,
        }
    }
}

/// Immutable per-archetype numbers.
///
/// Shared between every entity spawned from the archetype; each entity works
/// on its own [`RuntimeStats`](crate::stats::RuntimeStats) copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatProfile {
    /// Archetype identifier.
    pub id: ArchetypeId,
    /// Archetype name.
    pub name: String,
    /// Maximum health.
    pub max_health: f32,
    /// Ground speed in units per second.
    pub move_speed: f32,
    /// Turn speed in radians per second.
    #[serde(default = "default_turn_speed")]
    pub turn_speed: f32,
    /// Damage of a basic attack.
    pub attack_damage: f32,
    /// Reach of a basic attack.
    #[serde(default)]
    pub attack_range: f32,
    /// Radius of the hit volume at the end of the reach.
    #[serde(default)]
    pub attack_radius: f32,
    /// Minimum time between attack starts.
    pub attack_cooldown_seconds: f32,
    /// Chance to land a critical hit, in percent.
    #[serde(default)]
    pub critical_chance_percent: f32,
    /// Damage multiplier of a critical hit.
    #[serde(default = "default_crit_multiplier")]
    pub critical_damage_multiplier: f32,
    /// Chance to evade an incoming hit, in percent.
    #[serde(default)]
    pub evasion_chance_percent: f32,
    /// Flat damage absorbed from every landed hit.
    #[serde(default)]
    pub defense_value: f32,
    /// State machine tuning.
    #[serde(default)]
    pub behavior: BehaviorTuning,
}

fn default_turn_speed() -> f32 {
    std::f32::consts::TAU
}

fn default_crit_multiplier() -> f32 {
    1.5
}

impl StatProfile {
    /// Creates a profile with neutral defaults.
    #[must_use]
    pub fn new(id: ArchetypeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            max_health: 100.0,
            move_speed: 3.5,
            turn_speed: default_turn_speed(),
            attack_damage: 10.0,
            attack_range: DEFAULT_ATTACK_RANGE,
            attack_radius: 0.5,
            attack_cooldown_seconds: 1.0,
            critical_chance_percent: 0.0,
            critical_damage_multiplier: default_crit_multiplier(),
            evasion_chance_percent: 0.0,
            defense_value: 0.0,
            behavior: BehaviorTuning::default(),
        }
    }

    /// Set max health.
    #[must_use]
    pub fn with_max_health(mut self, hp: f32) -> Self {
        self.max_health = hp;
        self
    }

    /// Set move speed.
    #[must_use]
    pub fn with_move_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed;
        self
    }

    /// Set attack damage.
    #[must_use]
    pub fn with_attack_damage(mut self, damage: f32) -> Self {
        self.attack_damage = damage;
        self
    }

    /// Set attack range.
    #[must_use]
    pub fn with_attack_range(mut self, range: f32) -> Self {
        self.attack_range = range;
        self
    }

    /// Set attack cooldown.
    #[must_use]
    pub fn with_attack_cooldown(mut self, seconds: f32) -> Self {
        self.attack_cooldown_seconds = seconds;
        self
    }

    /// Set crit chance (percent) and multiplier.
    #[must_use]
    pub fn with_critical(mut self, chance_percent: f32, multiplier: f32) -> Self {
        self.critical_chance_percent = chance_percent.clamp(0.0, 100.0);
        self.critical_damage_multiplier = multiplier;
        self
    }

    /// Set evasion chance (percent).
    #[must_use]
    pub fn with_evasion(mut self, chance_percent: f32) -> Self {
        self.evasion_chance_percent = chance_percent.clamp(0.0, 100.0);
        self
    }

    /// Set defense value.
    #[must_use]
    pub fn with_defense(mut self, defense: f32) -> Self {
        self.defense_value = defense;
        self
    }

    /// Set behavior tuning.
    #[must_use]
    pub fn with_behavior(mut self, behavior: BehaviorTuning) -> Self {
        self.behavior = behavior;
        self
    }

    /// Checks invariants and repairs the recoverable ones.
    ///
    /// Percentages are clamped into [0, 100] and a missing attack range falls
    /// back to [`DEFAULT_ATTACK_RANGE`]. Non-positive health or cooldown is
    /// rejected.
    pub fn validated(mut self) -> ProfileResult<Self> {
        let invalid = |name: &str, reason: &str| ProfileError::Invalid {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if self.name.is_empty() {
            return Err(invalid("<unnamed>", "name must not be empty"));
        }
        let b = &self.behavior;
        let numbers = [
            self.max_health,
            self.move_speed,
            self.turn_speed,
            self.attack_damage,
            self.attack_range,
            self.attack_radius,
            self.attack_cooldown_seconds,
            self.critical_chance_percent,
            self.critical_damage_multiplier,
            self.evasion_chance_percent,
            self.defense_value,
            b.detection_range,
            b.leash_range,
            b.home_tolerance,
            b.hurt_recovery_seconds,
            b.decay_seconds,
            b.roll_seconds,
            b.roll_speed_multiplier,
            b.roll_cooldown_seconds,
            b.charge_seconds,
            b.charged_damage_multiplier,
            b.charge_recovery_seconds,
            b.knockback,
        ];
        if !numbers.iter().all(|n| n.is_finite()) {
            return Err(invalid(&self.name, "every number must be finite"));
        }
        if self.max_health <= 0.0 {
            return Err(invalid(&self.name, "max_health must be positive"));
        }
        if self.attack_cooldown_seconds <= 0.0 {
            return Err(invalid(&self.name, "attack_cooldown_seconds must be positive"));
        }
        if self.move_speed < 0.0 || self.attack_damage < 0.0 || self.defense_value < 0.0 {
            return Err(invalid(&self.name, "speeds, damage and defense must not be negative"));
        }
        if self.critical_damage_multiplier < 1.0 {
            return Err(invalid(&self.name, "critical_damage_multiplier must be at least 1.0"));
        }
        if self.attack_range <= 0.0 {
            warn!(
                "Profile {} has no attack range, using {}",
                self.name, DEFAULT_ATTACK_RANGE
            );
            self.attack_range = DEFAULT_ATTACK_RANGE;
        }
        self.attack_radius = self.attack_radius.max(0.0);

        for (label, value) in [
            ("critical_chance_percent", &mut self.critical_chance_percent),
            ("evasion_chance_percent", &mut self.evasion_chance_percent),
        ] {
            if !(0.0..=100.0).contains(value) {
                warn!("Profile {}: {} = {} clamped", self.name, label, value);
                *value = value.clamp(0.0, 100.0);
            }
        }

        Ok(self)
    }
}

/// On-disk layout of a profile file.
#[derive(Debug, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    profiles: Vec<StatProfile>,
}

/// Profiles indexed by id and name.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    by_id: HashMap<ArchetypeId, Arc<StatProfile>>,
    by_name: HashMap<String, ArchetypeId>,
}

impl ProfileRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers a profile.
    pub fn register(&mut self, profile: StatProfile) -> ProfileResult<Arc<StatProfile>> {
        let profile = profile.validated()?;
        self.check_unique(&profile)?;
        Ok(self.insert(profile))
    }

    /// Validates and registers a batch. Nothing is registered unless every
    /// profile in it is accepted.
    pub fn register_all(&mut self, profiles: Vec<StatProfile>) -> ProfileResult<usize> {
        let mut staged = ProfileRegistry::new();
        for profile in profiles {
            let profile = profile.validated()?;
            self.check_unique(&profile)?;
            staged.check_unique(&profile)?;
            staged.insert(profile);
        }
        let count = staged.len();
        for profile in staged.by_id.into_values() {
            self.by_name.insert(profile.name.clone(), profile.id);
            self.by_id.insert(profile.id, profile);
        }
        Ok(count)
    }

    fn check_unique(&self, profile: &StatProfile) -> ProfileResult<()> {
        if self.by_id.contains_key(&profile.id) {
            return Err(ProfileError::DuplicateId(profile.id));
        }
        if self.by_name.contains_key(&profile.name) {
            return Err(ProfileError::DuplicateName(profile.name.clone()));
        }
        Ok(())
    }

    fn insert(&mut self, profile: StatProfile) -> Arc<StatProfile> {
        let profile = Arc::new(profile);
        self.by_name.insert(profile.name.clone(), profile.id);
        self.by_id.insert(profile.id, Arc::clone(&profile));
        profile
    }

    /// Gets a profile by id.
    #[must_use]
    pub fn get(&self, id: ArchetypeId) -> Option<Arc<StatProfile>> {
        self.by_id.get(&id).cloned()
    }

    /// Gets a profile by name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<Arc<StatProfile>> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// Gets a profile by name or reports it as unknown.
    pub fn require(&self, name: &str) -> ProfileResult<Arc<StatProfile>> {
        self.get_by_name(name)
            .ok_or_else(|| ProfileError::Unknown(name.to_string()))
    }

    /// Number of registered profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Iterates over all profiles.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<StatProfile>> {
        self.by_id.values()
    }

    /// Removes every profile.
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_name.clear();
    }
}

/// Loads profile files into a [`ProfileRegistry`].
#[derive(Debug)]
pub struct ProfileLoader {
    base_path: PathBuf,
    registry: ProfileRegistry,
}

impl Default for ProfileLoader {
    fn default() -> Self {
        Self::new(DEFAULT_PROFILE_PATH)
    }
}

impl ProfileLoader {
    /// Creates a loader rooted at `base_path`.
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            registry: ProfileRegistry::new(),
        }
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// Consumes the loader, returning the registry.
    #[must_use]
    pub fn into_registry(self) -> ProfileRegistry {
        self.registry
    }

    /// Loads every `*.toml` under the base path.
    ///
    /// A file that fails to parse or validate is skipped with a warning; the
    /// rest still load.
    pub fn load_all(&mut self) -> ProfileResult<usize> {
        let path = self.base_path.clone();
        if !path.exists() {
            return Err(ConfigError::NotFound(path).into());
        }

        let mut entries: Vec<PathBuf> = fs::read_dir(&path)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        entries.sort();

        let mut count = 0;
        for file_path in entries {
            match self.load_file(&file_path) {
                Ok(n) => {
                    count += n;
                    debug!("Loaded {} profiles from {:?}", n, file_path);
                },
                Err(e) => {
                    warn!("Failed to load profile file {:?}: {}", file_path, e);
                },
            }
        }

        info!("Loaded {} profiles total", count);
        Ok(count)
    }

    /// Loads profiles from a single file.
    pub fn load_file(&mut self, path: &Path) -> ProfileResult<usize> {
        let content = fs::read_to_string(path)?;
        self.load_str(&content)
    }

    /// Loads profiles from TOML text. A single bad entry rejects the whole
    /// text and leaves the registry untouched.
    pub fn load_str(&mut self, content: &str) -> ProfileResult<usize> {
        let file: ProfileFile = toml::from_str(content)?;
        self.registry.register_all(file.profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const GRUNT: &str = r#"
        [[profiles]]
        id = 1
        name = "grunt"
        max_health = 60.0
        move_speed = 3.0
        attack_damage = 8.0
        attack_range = 1.8
        attack_cooldown_seconds = 1.2
        evasion_chance_percent = 5.0
        defense_value = 2.0

        [profiles.behavior]
        leash_range = 18.0
        experience_reward = 15
    "#;

    #[test]
    fn test_load_str() {
        let mut loader = ProfileLoader::new("unused");
        assert_eq!(loader.load_str(GRUNT).ok(), Some(1));

        let grunt = loader.registry().get_by_name("grunt");
        assert!(grunt.is_some());
        let grunt = grunt.unwrap();
        assert_eq!(grunt.id, ArchetypeId::new(1));
        assert_eq!(grunt.attack_range, 1.8);
        assert_eq!(grunt.behavior.leash_range, 18.0);
        assert_eq!(grunt.behavior.experience_reward, 15);
        // Unset tuning keeps defaults
        assert_eq!(grunt.behavior.hurt_recovery_seconds, 0.4);
    }

    #[test]
    fn test_missing_range_defaults() {
        let profile = StatProfile::new(ArchetypeId::new(2), "archer")
            .with_attack_range(0.0)
            .validated()
            .unwrap();
        assert_eq!(profile.attack_range, DEFAULT_ATTACK_RANGE);
    }

    #[test]
    fn test_percentages_clamped() {
        let mut profile = StatProfile::new(ArchetypeId::new(3), "lucky");
        profile.evasion_chance_percent = 140.0;
        profile.critical_chance_percent = -3.0;
        let profile = profile.validated().unwrap();
        assert_eq!(profile.evasion_chance_percent, 100.0);
        assert_eq!(profile.critical_chance_percent, 0.0);
    }

    #[test]
    fn test_zero_cooldown_rejected() {
        let result = StatProfile::new(ArchetypeId::new(4), "spammer")
            .with_attack_cooldown(0.0)
            .validated();
        assert!(matches!(result, Err(ProfileError::Invalid { .. })));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = ProfileRegistry::new();
        assert!(registry.register(StatProfile::new(ArchetypeId::new(1), "a")).is_ok());
        let dup = registry.register(StatProfile::new(ArchetypeId::new(1), "b"));
        assert!(matches!(dup, Err(ProfileError::DuplicateId(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_nan_stats_rejected() {
        let result = StatProfile::new(ArchetypeId::new(5), "glitch")
            .with_max_health(f32::NAN)
            .validated();
        assert!(matches!(result, Err(ProfileError::Invalid { .. })));

        let mut profile = StatProfile::new(ArchetypeId::new(6), "drifter");
        profile.behavior.knockback = f32::INFINITY;
        assert!(profile.validated().is_err());
    }

    #[test]
    fn test_bad_entry_rejects_whole_file() {
        let text = format!(
            "{GRUNT}\n[[profiles]]\nid = 2\nname = \"broken\"\nmax_health = 10.0\n\
             move_speed = 1.0\nattack_damage = 1.0\nattack_cooldown_seconds = 0.0\n"
        );
        let mut loader = ProfileLoader::new("unused");
        assert!(matches!(loader.load_str(&text), Err(ProfileError::Invalid { .. })));
        assert!(loader.registry().is_empty());

        let dup = format!("{GRUNT}{GRUNT}");
        assert!(matches!(loader.load_str(&dup), Err(ProfileError::DuplicateId(_))));
        assert!(loader.registry().is_empty());
    }

    #[test]
    fn test_require_unknown() {
        let registry = ProfileRegistry::new();
        assert!(matches!(registry.require("ghost"), Err(ProfileError::Unknown(_))));
    }

    #[test]
    fn test_load_all_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut good = fs::File::create(dir.path().join("grunt.toml")).unwrap();
        good.write_all(GRUNT.as_bytes()).unwrap();
        let mut bad = fs::File::create(dir.path().join("broken.toml")).unwrap();
        bad.write_all(b"[[profiles]]\nid = \"not a number\"").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut loader = ProfileLoader::new(dir.path());
        assert_eq!(loader.load_all().unwrap(), 1);
        assert!(loader.registry().get(ArchetypeId::new(1)).is_some());
    }

    #[test]
    fn test_load_all_missing_dir() {
        let mut loader = ProfileLoader::new("/definitely/not/here");
        assert!(matches!(
            loader.load_all(),
            Err(ProfileError::Config(ConfigError::NotFound(_)))
        ));
    }

    #[test]
    fn test_shipped_profiles_load() {
        let mut loader = ProfileLoader::default();
        loader
            .load_str(include_str!("../../../assets/profiles/player.toml"))
            .unwrap();
        loader
            .load_str(include_str!("../../../assets/profiles/enemies.toml"))
            .unwrap();
        let registry = loader.registry();
        assert_eq!(registry.len(), 3);
        let brute = registry.require("brute").unwrap();
        assert_eq!(brute.behavior.experience_reward, 25);
        assert_eq!(brute.behavior.decay_seconds, BehaviorTuning::default().decay_seconds);
    }
}
