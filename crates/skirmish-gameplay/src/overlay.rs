//! Read-time stat overlays.
//!
//! An overlay layers wave scaling on top of [`RuntimeStats`] without writing
//! into them. One entity carries at most one overlay.

use serde::{Deserialize, Serialize};

use crate::stats::RuntimeStats;

/// Additive and multiplicative bonuses applied when stats are read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatModifierOverlay {
    /// Added to attack damage.
    pub damage_bonus: f32,
    /// Added to max health.
    pub health_bonus: f32,
    /// Multiplies move speed.
    pub move_speed_multiplier: f32,
    /// Multiplies attack cooldown.
    pub attack_cooldown_multiplier: f32,
}

impl Default for StatModifierOverlay {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl StatModifierOverlay {
    /// Overlay that changes nothing.
    pub const IDENTITY: Self = Self {
        damage_bonus: 0.0,
        health_bonus: 0.0,
        move_speed_multiplier: 1.0,
        attack_cooldown_multiplier: 1.0,
    };

    /// Set damage bonus.
    #[must_use]
    pub fn with_damage_bonus(mut self, bonus: f32) -> Self {
        self.damage_bonus = bonus;
        self
    }

    /// Set health bonus.
    #[must_use]
    pub fn with_health_bonus(mut self, bonus: f32) -> Self {
        self.health_bonus = bonus;
        self
    }

    /// Set move-speed multiplier.
    #[must_use]
    pub fn with_move_speed_multiplier(mut self, mult: f32) -> Self {
        self.move_speed_multiplier = mult.max(0.0);
        self
    }

    /// Set cooldown multiplier.
    #[must_use]
    pub fn with_cooldown_multiplier(mut self, mult: f32) -> Self {
        self.attack_cooldown_multiplier = mult.max(0.0);
        self
    }

    /// Damage after the overlay.
    #[must_use]
    pub fn modified_damage(&self, base: f32) -> f32 {
        (base + self.damage_bonus).max(0.0)
    }

    /// Max health after the overlay.
    #[must_use]
    pub fn modified_max_health(&self, base: f32) -> f32 {
        (base + self.health_bonus).max(1.0)
    }

    /// Move speed after the overlay.
    #[must_use]
    pub fn modified_move_speed(&self, base: f32) -> f32 {
        base * self.move_speed_multiplier
    }

    /// Attack cooldown after the overlay.
    #[must_use]
    pub fn modified_attack_cooldown(&self, base: f32) -> f32 {
        base * self.attack_cooldown_multiplier
    }
}

/// Borrowed view composing base stats with an optional overlay.
#[derive(Debug, Clone, Copy)]
pub struct EffectiveStats<'a> {
    base: &'a RuntimeStats,
    overlay: Option<&'a StatModifierOverlay>,
}

impl<'a> EffectiveStats<'a> {
    /// Composes `base` with `overlay`.
    #[must_use]
    pub fn new(base: &'a RuntimeStats, overlay: Option<&'a StatModifierOverlay>) -> Self {
        Self { base, overlay }
    }

    fn overlay(&self) -> &StatModifierOverlay {
        self.overlay.unwrap_or(&StatModifierOverlay::IDENTITY)
    }

    /// The untouched base stats.
    #[must_use]
    pub fn base(&self) -> &'a RuntimeStats {
        self.base
    }

    /// Attack damage.
    #[must_use]
    pub fn attack_damage(&self) -> f32 {
        self.overlay().modified_damage(self.base.attack_damage)
    }

    /// Max health.
    #[must_use]
    pub fn max_health(&self) -> f32 {
        self.overlay().modified_max_health(self.base.max_health)
    }

    /// Move speed.
    #[must_use]
    pub fn move_speed(&self) -> f32 {
        self.overlay().modified_move_speed(self.base.move_speed)
    }

    /// Attack cooldown.
    #[must_use]
    pub fn attack_cooldown(&self) -> f32 {
        self.overlay()
            .modified_attack_cooldown(self.base.attack_cooldown_seconds)
    }

    /// Attack reach.
    #[must_use]
    pub fn attack_range(&self) -> f32 {
        self.base.attack_range
    }

    /// Reach plus hit-volume radius, used when the blow lands.
    #[must_use]
    pub fn hit_reach(&self) -> f32 {
        self.base.attack_range + self.base.attack_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::StatProfile;
    use skirmish_common::ArchetypeId;

    fn base() -> RuntimeStats {
        RuntimeStats::from_profile(
            &StatProfile::new(ArchetypeId::new(1), "base")
                .with_attack_damage(10.0)
                .with_move_speed(4.0)
                .with_attack_cooldown(2.0),
        )
    }

    #[test]
    fn test_identity_is_transparent() {
        let stats = base();
        let eff = EffectiveStats::new(&stats, None);
        assert_eq!(eff.attack_damage(), 10.0);
        assert_eq!(eff.move_speed(), 4.0);
        assert_eq!(eff.attack_cooldown(), 2.0);
    }

    #[test]
    fn test_overlay_composes_without_mutating_base() {
        let stats = base();
        let overlay = StatModifierOverlay::default()
            .with_damage_bonus(5.0)
            .with_move_speed_multiplier(1.5)
            .with_cooldown_multiplier(0.5)
            .with_health_bonus(40.0);
        let eff = EffectiveStats::new(&stats, Some(&overlay));

        assert_eq!(eff.attack_damage(), 15.0);
        assert_eq!(eff.move_speed(), 6.0);
        assert_eq!(eff.attack_cooldown(), 1.0);
        assert_eq!(eff.max_health(), 140.0);
        assert_eq!(stats, base());
    }

    #[test]
    fn test_negative_damage_bonus_floors_at_zero() {
        let overlay = StatModifierOverlay::default().with_damage_bonus(-50.0);
        assert_eq!(overlay.modified_damage(10.0), 0.0);
    }
}
