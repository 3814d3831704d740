//! Per-entity runtime stats.
//!
//! This module provides:
//! - `RuntimeStats`, the mutable copy of a profile owned by one entity
//! - Permanent upgrades gated by per-stat level counters

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::profile::StatProfile;

/// Highest level any single stat can be upgraded to.
pub const MAX_UPGRADE_LEVEL: u8 = 10;

/// Errors from the upgrade applicator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpgradeError {
    /// Stat is already at its level cap.
    #[error("{stat:?} is already at max level {max}")]
    MaxLevel {
        /// Stat that was upgraded
        stat: StatKind,
        /// The cap
        max: u8,
    },
    /// Stat cannot be upgraded permanently.
    #[error("{0:?} cannot be upgraded")]
    NotUpgradable(StatKind),
    /// Upgrades only ever increase a stat.
    #[error("upgrade amount must be positive, got {0}")]
    NonPositive(f32),
}

/// Result type for upgrade operations.
pub type UpgradeResult<T> = Result<T, UpgradeError>;

/// Named stat of a [`RuntimeStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    /// Maximum health.
    MaxHealth,
    /// Ground speed.
    MoveSpeed,
    /// Turn speed.
    TurnSpeed,
    /// Basic attack damage.
    AttackDamage,
    /// Basic attack reach.
    AttackRange,
    /// Hit volume radius.
    AttackRadius,
    /// Attack cooldown.
    AttackCooldown,
    /// Crit chance (percent).
    CriticalChance,
    /// Crit damage multiplier.
    CriticalDamage,
    /// Evasion chance (percent).
    Evasion,
    /// Flat defense.
    Defense,
}

impl StatKind {
    /// Number of stat kinds.
    pub const COUNT: usize = 11;

    /// Every stat kind, in slot order.
    #[must_use]
    pub const fn all() -> [Self; Self::COUNT] {
        [
            Self::MaxHealth,
            Self::MoveSpeed,
            Self::TurnSpeed,
            Self::AttackDamage,
            Self::AttackRange,
            Self::AttackRadius,
            Self::AttackCooldown,
            Self::CriticalChance,
            Self::CriticalDamage,
            Self::Evasion,
            Self::Defense,
        ]
    }

    /// Whether permanent upgrades may raise this stat.
    ///
    /// Cooldown is excluded because upgrades only ever raise a value, and a
    /// higher cooldown is a penalty.
    #[must_use]
    pub const fn is_upgradable(self) -> bool {
        !matches!(self, Self::AttackCooldown | Self::TurnSpeed | Self::AttackRadius)
    }

    /// Whether the stat is a percentage in [0, 100].
    #[must_use]
    pub const fn is_percent(self) -> bool {
        matches!(self, Self::CriticalChance | Self::Evasion)
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

/// Mutable stats of one entity instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeStats {
    /// Maximum health.
    pub max_health: f32,
    /// Ground speed in units per second.
    pub move_speed: f32,
    /// Turn speed in radians per second.
    pub turn_speed: f32,
    /// Basic attack damage.
    pub attack_damage: f32,
    /// Basic attack reach.
    pub attack_range: f32,
    /// Hit volume radius.
    pub attack_radius: f32,
    /// Minimum time between attack starts.
    pub attack_cooldown_seconds: f32,
    /// Crit chance in percent.
    pub critical_chance_percent: f32,
    /// Crit damage multiplier.
    pub critical_damage_multiplier: f32,
    /// Evasion chance in percent.
    pub evasion_chance_percent: f32,
    /// Flat damage absorbed per hit.
    pub defense_value: f32,
    levels: [u8; StatKind::COUNT],
}

impl RuntimeStats {
    /// Copies the numbers out of a profile, all upgrade levels at zero.
    #[must_use]
    pub fn from_profile(profile: &StatProfile) -> Self {
        Self {
            max_health: profile.max_health,
            move_speed: profile.move_speed,
            turn_speed: profile.turn_speed,
            attack_damage: profile.attack_damage,
            attack_range: profile.attack_range,
            attack_radius: profile.attack_radius,
            attack_cooldown_seconds: profile.attack_cooldown_seconds,
            critical_chance_percent: profile.critical_chance_percent,
            critical_damage_multiplier: profile.critical_damage_multiplier,
            evasion_chance_percent: profile.evasion_chance_percent,
            defense_value: profile.defense_value,
            levels: [0; StatKind::COUNT],
        }
    }

    /// Reads a stat by kind.
    #[must_use]
    pub fn get(&self, stat: StatKind) -> f32 {
        match stat {
            StatKind::MaxHealth => self.max_health,
            StatKind::MoveSpeed => self.move_speed,
            StatKind::TurnSpeed => self.turn_speed,
            StatKind::AttackDamage => self.attack_damage,
            StatKind::AttackRange => self.attack_range,
            StatKind::AttackRadius => self.attack_radius,
            StatKind::AttackCooldown => self.attack_cooldown_seconds,
            StatKind::CriticalChance => self.critical_chance_percent,
            StatKind::CriticalDamage => self.critical_damage_multiplier,
            StatKind::Evasion => self.evasion_chance_percent,
            StatKind::Defense => self.defense_value,
        }
    }

    fn get_mut(&mut self, stat: StatKind) -> &mut f32 {
        match stat {
            StatKind::MaxHealth => &mut self.max_health,
            StatKind::MoveSpeed => &mut self.move_speed,
            StatKind::TurnSpeed => &mut self.turn_speed,
            StatKind::AttackDamage => &mut self.attack_damage,
            StatKind::AttackRange => &mut self.attack_range,
            StatKind::AttackRadius => &mut self.attack_radius,
            StatKind::AttackCooldown => &mut self.attack_cooldown_seconds,
            StatKind::CriticalChance => &mut self.critical_chance_percent,
            StatKind::CriticalDamage => &mut self.critical_damage_multiplier,
            StatKind::Evasion => &mut self.evasion_chance_percent,
            StatKind::Defense => &mut self.defense_value,
        }
    }

    /// Current upgrade level of a stat.
    #[must_use]
    pub fn level(&self, stat: StatKind) -> u8 {
        self.levels[stat.slot()]
    }

    /// Whether the stat can take another upgrade.
    #[must_use]
    pub fn can_upgrade(&self, stat: StatKind) -> bool {
        stat.is_upgradable() && self.level(stat) < MAX_UPGRADE_LEVEL
    }

    /// Permanently raises a stat by `amount` and bumps its level.
    ///
    /// Returns the new level. Percentages saturate at 100 but still consume
    /// a level.
    pub fn apply_upgrade(&mut self, stat: StatKind, amount: f32) -> UpgradeResult<u8> {
        if !stat.is_upgradable() {
            return Err(UpgradeError::NotUpgradable(stat));
        }
        if amount <= 0.0 || !amount.is_finite() {
            return Err(UpgradeError::NonPositive(amount));
        }
        if self.level(stat) >= MAX_UPGRADE_LEVEL {
            return Err(UpgradeError::MaxLevel {
                stat,
                max: MAX_UPGRADE_LEVEL,
            });
        }

        let value = self.get_mut(stat);
        *value += amount;
        if stat.is_percent() {
            *value = value.min(100.0);
        }

        let level = &mut self.levels[stat.slot()];
        *level += 1;
        debug!("Upgraded {:?} to level {}", stat, *level);
        Ok(*level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_common::ArchetypeId;

    fn stats() -> RuntimeStats {
        RuntimeStats::from_profile(
            &StatProfile::new(ArchetypeId::new(1), "test")
                .with_attack_damage(10.0)
                .with_evasion(95.0),
        )
    }

    #[test]
    fn test_copied_from_profile() {
        let s = stats();
        assert_eq!(s.attack_damage, 10.0);
        assert_eq!(s.get(StatKind::Evasion), 95.0);
        assert!(StatKind::all().iter().all(|k| s.level(*k) == 0));
    }

    #[test]
    fn test_upgrade_increases_and_levels() {
        let mut s = stats();
        assert_eq!(s.apply_upgrade(StatKind::AttackDamage, 2.5), Ok(1));
        assert_eq!(s.attack_damage, 12.5);
        assert_eq!(s.level(StatKind::AttackDamage), 1);
        assert_eq!(s.level(StatKind::Defense), 0);
    }

    #[test]
    fn test_upgrade_capped_at_max_level() {
        let mut s = stats();
        for _ in 0..MAX_UPGRADE_LEVEL {
            assert!(s.apply_upgrade(StatKind::Defense, 1.0).is_ok());
        }
        let before = s.defense_value;
        assert_eq!(
            s.apply_upgrade(StatKind::Defense, 1.0),
            Err(UpgradeError::MaxLevel {
                stat: StatKind::Defense,
                max: MAX_UPGRADE_LEVEL
            })
        );
        assert_eq!(s.defense_value, before);
        assert!(!s.can_upgrade(StatKind::Defense));
    }

    #[test]
    fn test_percent_saturates() {
        let mut s = stats();
        assert!(s.apply_upgrade(StatKind::Evasion, 10.0).is_ok());
        assert_eq!(s.evasion_chance_percent, 100.0);
    }

    #[test]
    fn test_upgrades_never_decrease() {
        let mut s = stats();
        assert_eq!(
            s.apply_upgrade(StatKind::MoveSpeed, -1.0),
            Err(UpgradeError::NonPositive(-1.0))
        );
        assert_eq!(
            s.apply_upgrade(StatKind::AttackCooldown, 0.5),
            Err(UpgradeError::NotUpgradable(StatKind::AttackCooldown))
        );
    }
}
