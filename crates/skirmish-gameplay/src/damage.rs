//! Damage resolution pipeline.
//!
//! Every hit runs the same ordered steps, each able to short-circuit the
//! next:
//! 1. Evasion roll against the defender. An evaded hit deals nothing.
//! 2. Critical roll against the attacker.
//! 3. Flat defense absorption, never below zero.
//! 4. Application to the defender's [`HealthModel`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::health::{HealthModel, HitInfo};
use crate::overlay::EffectiveStats;
use crate::stats::RuntimeStats;

/// Source of uniform rolls in [0, 100).
pub trait RollSource {
    /// Draws the next roll.
    fn roll_percent(&mut self) -> f32;
}

impl RollSource for fastrand::Rng {
    fn roll_percent(&mut self) -> f32 {
        self.f32() * 100.0
    }
}

/// Scripted rolls, consumed in order, then a constant fallback.
#[derive(Debug, Clone, Default)]
pub struct FixedRolls {
    queue: VecDeque<f32>,
    fallback: f32,
}

impl FixedRolls {
    /// Rolls that always return `value`.
    #[must_use]
    pub fn constant(value: f32) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback: value,
        }
    }

    /// Rolls returning `values` in order, then `fallback`.
    #[must_use]
    pub fn sequence(values: impl IntoIterator<Item = f32>, fallback: f32) -> Self {
        Self {
            queue: values.into_iter().collect(),
            fallback,
        }
    }

    /// Rolls still queued.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl RollSource for FixedRolls {
    fn roll_percent(&mut self) -> f32 {
        self.queue.pop_front().unwrap_or(self.fallback)
    }
}

/// Offensive numbers consulted by the resolver.
pub trait StrikeProfile {
    /// Crit chance in percent.
    fn critical_chance_percent(&self) -> f32;
    /// Crit damage multiplier.
    fn critical_damage_multiplier(&self) -> f32;
}

/// Defensive numbers consulted by the resolver.
pub trait GuardProfile {
    /// Evasion chance in percent.
    fn evasion_chance_percent(&self) -> f32;
    /// Flat damage absorbed per hit.
    fn defense_value(&self) -> f32;
}

impl StrikeProfile for RuntimeStats {
    fn critical_chance_percent(&self) -> f32 {
        self.critical_chance_percent
    }

    fn critical_damage_multiplier(&self) -> f32 {
        self.critical_damage_multiplier
    }
}

impl GuardProfile for RuntimeStats {
    fn evasion_chance_percent(&self) -> f32 {
        self.evasion_chance_percent
    }

    fn defense_value(&self) -> f32 {
        self.defense_value
    }
}

impl StrikeProfile for EffectiveStats<'_> {
    fn critical_chance_percent(&self) -> f32 {
        self.base().critical_chance_percent
    }

    fn critical_damage_multiplier(&self) -> f32 {
        self.base().critical_damage_multiplier
    }
}

impl GuardProfile for EffectiveStats<'_> {
    fn evasion_chance_percent(&self) -> f32 {
        self.base().evasion_chance_percent
    }

    fn defense_value(&self) -> f32 {
        self.base().defense_value
    }
}

/// Result of resolving one hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// The defender evaded; nothing was applied.
    Evaded,
    /// The hit landed.
    Hit {
        /// Damage after crit and defense
        final_damage: f32,
        /// Whether the crit roll succeeded
        is_critical: bool,
    },
}

impl Outcome {
    /// Whether the hit was evaded.
    #[must_use]
    pub fn is_evaded(&self) -> bool {
        matches!(self, Self::Evaded)
    }

    /// Damage carried by the outcome, zero when evaded.
    #[must_use]
    pub fn damage(&self) -> f32 {
        match self {
            Self::Evaded => 0.0,
            Self::Hit { final_damage, .. } => *final_damage,
        }
    }

    /// Whether any damage got through, the gate for on-hit effects.
    #[must_use]
    pub fn dealt_damage(&self) -> bool {
        self.damage() > 0.0
    }
}

/// Stateless resolver for the hit pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct DamageResolver;

impl DamageResolver {
    /// Rolls evasion. True means the hit is negated.
    pub fn roll_evasion<R: RollSource>(evasion_percent: f32, rolls: &mut R) -> bool {
        rolls.roll_percent() < evasion_percent.clamp(0.0, 100.0)
    }

    /// Rolls crit. True means the multiplier applies.
    pub fn roll_critical<R: RollSource>(critical_percent: f32, rolls: &mut R) -> bool {
        rolls.roll_percent() < critical_percent.clamp(0.0, 100.0)
    }

    /// Subtracts flat defense. Returns `(remaining, absorbed)`.
    #[must_use]
    pub fn absorb(defense: f32, damage: f32) -> (f32, f32) {
        let absorbed = defense.max(0.0).min(damage.max(0.0));
        ((damage - absorbed).max(0.0), absorbed)
    }

    /// Runs evasion, crit and defense without touching any health.
    pub fn resolve<A, D, R>(attacker: &A, defender: &D, raw_damage: f32, rolls: &mut R) -> Outcome
    where
        A: StrikeProfile + ?Sized,
        D: GuardProfile + ?Sized,
        R: RollSource,
    {
        if Self::roll_evasion(defender.evasion_chance_percent(), rolls) {
            return Outcome::Evaded;
        }

        let mut damage = raw_damage.max(0.0);
        let is_critical = Self::roll_critical(attacker.critical_chance_percent(), rolls);
        if is_critical {
            damage *= attacker.critical_damage_multiplier();
        }

        let (final_damage, _) = Self::absorb(defender.defense_value(), damage);
        Outcome::Hit {
            final_damage,
            is_critical,
        }
    }

    /// Runs the full pipeline against `health`.
    ///
    /// The returned outcome carries the damage actually subtracted, which is
    /// capped by the health the defender had left. A dead defender yields
    /// `Hit { final_damage: 0.0, .. }` without consuming rolls.
    pub fn apply<A, D, R>(
        attacker: &A,
        defender: &D,
        health: &mut HealthModel,
        raw_damage: f32,
        hit: HitInfo,
        rolls: &mut R,
    ) -> Outcome
    where
        A: StrikeProfile + ?Sized,
        D: GuardProfile + ?Sized,
        R: RollSource,
    {
        let before = health.current();
        let mut resolved = None;
        health.take_damage(raw_damage, hit, |amount| {
            let outcome = Self::resolve(attacker, defender, amount, rolls);
            resolved = Some(outcome);
            outcome
        });

        match resolved {
            Some(Outcome::Evaded) => Outcome::Evaded,
            Some(Outcome::Hit { is_critical, .. }) => Outcome::Hit {
                final_damage: before - health.current(),
                is_critical,
            },
            None => Outcome::Hit {
                final_damage: 0.0,
                is_critical: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthEvent;
    use crate::profile::StatProfile;
    use proptest::prelude::*;
    use skirmish_common::ArchetypeId;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn stats(profile: StatProfile) -> RuntimeStats {
        RuntimeStats::from_profile(&profile)
    }

    fn plain() -> StatProfile {
        StatProfile::new(ArchetypeId::new(1), "plain")
    }

    #[test]
    fn test_defense_absorbs_flat() {
        assert_eq!(DamageResolver::absorb(5.0, 20.0), (15.0, 5.0));
        assert_eq!(DamageResolver::absorb(50.0, 20.0), (0.0, 20.0));
        assert_eq!(DamageResolver::absorb(0.0, 20.0), (20.0, 0.0));
    }

    #[test]
    fn test_crit_doubles_deterministically() {
        let attacker = stats(plain().with_critical(100.0, 2.0));
        let defender = stats(plain());
        for seed in 0..32 {
            let mut rng = fastrand::Rng::with_seed(seed);
            let outcome = DamageResolver::resolve(&attacker, &defender, 12.0, &mut rng);
            assert_eq!(
                outcome,
                Outcome::Hit {
                    final_damage: 24.0,
                    is_critical: true
                }
            );
        }
    }

    #[test]
    fn test_crit_applies_before_defense() {
        let attacker = stats(plain().with_critical(100.0, 2.0));
        let defender = stats(plain().with_defense(5.0));
        let mut rolls = FixedRolls::constant(50.0);
        let outcome = DamageResolver::resolve(&attacker, &defender, 10.0, &mut rolls);
        assert_eq!(outcome.damage(), 15.0);
    }

    #[test]
    fn test_evasion_short_circuits_crit_roll() {
        let attacker = stats(plain().with_critical(100.0, 2.0));
        let defender = stats(plain().with_evasion(50.0));
        let mut rolls = FixedRolls::sequence([10.0, 99.0], 0.0);
        let outcome = DamageResolver::resolve(&attacker, &defender, 10.0, &mut rolls);
        assert!(outcome.is_evaded());
        assert_eq!(rolls.remaining(), 1);
    }

    #[test]
    fn test_end_to_end_defense_scenario() {
        let defender = stats(plain().with_max_health(100.0).with_defense(5.0));
        let attacker = stats(plain());
        let mut health = HealthModel::new(100.0);
        let damaged = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&damaged);
        health.subscribe(move |e: &HealthEvent| {
            if let HealthEvent::Damaged { amount, .. } = e {
                sink.borrow_mut().push(*amount);
            }
        });

        let mut rng = fastrand::Rng::with_seed(7);
        let outcome =
            DamageResolver::apply(&attacker, &defender, &mut health, 20.0, HitInfo::NONE, &mut rng);

        assert_eq!(health.current(), 85.0);
        assert_eq!(outcome.damage(), 15.0);
        assert_eq!(damaged.borrow().as_slice(), &[15.0]);
    }

    #[test]
    fn test_full_absorb_leaves_health() {
        let defender = stats(plain().with_defense(30.0));
        let attacker = stats(plain());
        let mut health = HealthModel::new(100.0);
        let mut rolls = FixedRolls::constant(99.0);
        let outcome =
            DamageResolver::apply(&attacker, &defender, &mut health, 20.0, HitInfo::NONE, &mut rolls);
        assert!(!outcome.is_evaded());
        assert!(!outcome.dealt_damage());
        assert_eq!(health.current(), 100.0);
    }

    #[test]
    fn test_applied_damage_capped_by_remaining_health() {
        let defender = stats(plain());
        let attacker = stats(plain());
        let mut health = HealthModel::new(10.0);
        let mut rolls = FixedRolls::constant(99.0);
        let outcome =
            DamageResolver::apply(&attacker, &defender, &mut health, 25.0, HitInfo::NONE, &mut rolls);
        assert_eq!(outcome.damage(), 10.0);
        assert!(health.is_dead());
    }

    #[test]
    fn test_two_lethal_hits_one_death() {
        let defender = stats(plain());
        let attacker = stats(plain());
        let mut health = HealthModel::new(10.0);
        let deaths = Rc::new(RefCell::new(0));
        let d = Rc::clone(&deaths);
        health.subscribe(move |e: &HealthEvent| {
            if matches!(e, HealthEvent::Died { .. }) {
                *d.borrow_mut() += 1;
            }
        });
        let mut rolls = FixedRolls::constant(99.0);
        DamageResolver::apply(&attacker, &defender, &mut health, 50.0, HitInfo::NONE, &mut rolls);
        DamageResolver::apply(&attacker, &defender, &mut health, 50.0, HitInfo::NONE, &mut rolls);
        assert_eq!(*deaths.borrow(), 1);
    }

    proptest! {
        #[test]
        fn prop_full_evasion_never_damages(amount in 0.0f32..10_000.0, seed in any::<u64>()) {
            let defender = stats(plain().with_evasion(100.0));
            let attacker = stats(plain().with_critical(50.0, 3.0));
            let mut health = HealthModel::new(100.0);
            let events = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&events);
            health.subscribe(move |e: &HealthEvent| sink.borrow_mut().push(*e));

            let mut rng = fastrand::Rng::with_seed(seed);
            let landed = health.take_damage(amount, HitInfo::NONE, |raw| {
                DamageResolver::resolve(&attacker, &defender, raw, &mut rng)
            });

            prop_assert!(!landed);
            prop_assert_eq!(health.current(), 100.0);
            let events = events.borrow();
            prop_assert_eq!(events.len(), 1);
            let evaded = matches!(events[0], HealthEvent::Evaded { .. });
            prop_assert!(evaded);
        }

        #[test]
        fn prop_zero_evasion_always_lands(amount in 0.0f32..10_000.0, seed in any::<u64>()) {
            let defender = stats(plain().with_evasion(0.0));
            let attacker = stats(plain());
            let mut rng = fastrand::Rng::with_seed(seed);
            let outcome = DamageResolver::resolve(&attacker, &defender, amount, &mut rng);
            prop_assert!(!outcome.is_evaded());
        }

        #[test]
        fn prop_defense_never_negative(defense in 0.0f32..1_000.0, amount in 0.0f32..1_000.0) {
            let (remaining, absorbed) = DamageResolver::absorb(defense, amount);
            prop_assert!(remaining >= 0.0);
            prop_assert!(absorbed <= defense);
            prop_assert!((remaining + absorbed - amount).abs() < 1e-3);
        }
    }
}
