//! Per-entity attack gate.
//!
//! This module provides:
//! - A non-owning target handle
//! - Cooldown and ground-plane range gating
//! - Two-phase attacks: a begun attack hands out a token, and damage is only
//!   dealt when the matching token is redeemed at the effect instant

use glam::Vec3;
use serde::{Deserialize, Serialize};
use skirmish_common::{ground_distance, within_ground_range, EntityHandle};
use thiserror::Error;
use tracing::trace;

use crate::intent::TargetLookup;

/// Why an attack could not start.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttackRejection {
    /// No target assigned.
    #[error("no target")]
    NoTarget,
    /// Target handle no longer resolves.
    #[error("target lost: {0}")]
    TargetLost(EntityHandle),
    /// Attack on cooldown
    #[error("attack on cooldown: {remaining}s remaining")]
    OnCooldown {
        /// Time remaining in seconds
        remaining: f32,
    },
    /// Target out of range
    #[error("target out of range: distance {distance}, range {range}")]
    OutOfRange {
        /// Actual distance
        distance: f32,
        /// Required range
        range: f32,
    },
    /// An attack is already in progress.
    #[error("attack already in progress")]
    Busy,
}

/// Result type for attack gating.
pub type AttackResult<T> = Result<T, AttackRejection>;

/// Proof that a specific attack was begun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttackToken(u64);

impl AttackToken {
    /// Returns the raw serial.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveAttack {
    token: AttackToken,
    damage_multiplier: f32,
    effect_applied: bool,
}

/// Cooldown timer, target reference and in-flight attack of one entity.
#[derive(Debug, Clone, Default)]
pub struct CombatController {
    target: Option<EntityHandle>,
    cooldown_remaining: f32,
    active: Option<ActiveAttack>,
    next_serial: u64,
}

impl CombatController {
    /// Creates an idle controller with no target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the target; `None` clears it.
    pub fn set_target(&mut self, target: Option<EntityHandle>) {
        self.target = target;
    }

    /// Current target handle, which may be stale.
    #[must_use]
    pub fn target(&self) -> Option<EntityHandle> {
        self.target
    }

    /// Whether the cooldown has elapsed.
    #[must_use]
    pub fn is_off_cooldown(&self) -> bool {
        self.cooldown_remaining <= 0.0
    }

    /// Seconds left on the cooldown.
    #[must_use]
    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown_remaining.max(0.0)
    }

    /// Whether an attack is in flight.
    #[must_use]
    pub fn is_attacking(&self) -> bool {
        self.active.is_some()
    }

    /// Token of the attack in flight.
    #[must_use]
    pub fn active_token(&self) -> Option<AttackToken> {
        self.active.map(|a| a.token)
    }

    /// Checks every gate without side effects.
    ///
    /// Range is measured on the ground plane and is inclusive.
    pub fn check_attack<L: TargetLookup + ?Sized>(
        &self,
        origin: Vec3,
        range: f32,
        lookup: &L,
    ) -> AttackResult<Vec3> {
        let handle = self.target.ok_or(AttackRejection::NoTarget)?;
        let target_pos = lookup
            .position_of(handle)
            .ok_or(AttackRejection::TargetLost(handle))?;
        if self.active.is_some() {
            return Err(AttackRejection::Busy);
        }
        if !self.is_off_cooldown() {
            return Err(AttackRejection::OnCooldown {
                remaining: self.cooldown_remaining,
            });
        }
        if !within_ground_range(origin, target_pos, range) {
            return Err(AttackRejection::OutOfRange {
                distance: ground_distance(origin, target_pos),
                range,
            });
        }
        Ok(target_pos)
    }

    /// Starts an attack unconditionally and arms the cooldown.
    pub fn begin_attack(&mut self, cooldown_seconds: f32, damage_multiplier: f32) -> AttackToken {
        self.next_serial += 1;
        let token = AttackToken(self.next_serial);
        self.active = Some(ActiveAttack {
            token,
            damage_multiplier,
            effect_applied: false,
        });
        self.cooldown_remaining = cooldown_seconds.max(0.0);
        token
    }

    /// Gates, then begins an attack.
    pub fn try_attack<L: TargetLookup + ?Sized>(
        &mut self,
        origin: Vec3,
        range: f32,
        cooldown_seconds: f32,
        lookup: &L,
    ) -> AttackResult<AttackToken> {
        match self.check_attack(origin, range, lookup) {
            Ok(_) => Ok(self.begin_attack(cooldown_seconds, 1.0)),
            Err(reason) => {
                trace!("Attack rejected: {}", reason);
                Err(reason)
            },
        }
    }

    /// Redeems `token` at the effect instant.
    ///
    /// Returns the damage multiplier of the attack the first time the live
    /// token is redeemed, and `None` for stale, cancelled or already-spent
    /// tokens.
    pub fn take_effect(&mut self, token: AttackToken) -> Option<f32> {
        match &mut self.active {
            Some(active) if active.token == token && !active.effect_applied => {
                active.effect_applied = true;
                Some(active.damage_multiplier)
            },
            _ => None,
        }
    }

    /// Completes the attack in flight. Returns false if none matched.
    pub fn end_attack(&mut self, token: AttackToken) -> bool {
        if self.active_token() == Some(token) {
            self.active = None;
            true
        } else {
            false
        }
    }

    /// Drops the attack in flight, if any, so its effect can never land.
    pub fn cancel(&mut self) -> Option<AttackToken> {
        self.active.take().map(|a| a.token)
    }

    /// Counts the cooldown down.
    pub fn tick(&mut self, dt: f32) {
        if self.cooldown_remaining > 0.0 {
            self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Positions(HashMap<EntityHandle, Vec3>);

    impl TargetLookup for Positions {
        fn position_of(&self, handle: EntityHandle) -> Option<Vec3> {
            self.0.get(&handle).copied()
        }
    }

    fn setup(target_at: Vec3) -> (CombatController, Positions) {
        let handle = EntityHandle::new(1, 0);
        let mut positions = Positions::default();
        positions.0.insert(handle, target_at);
        let mut combat = CombatController::new();
        combat.set_target(Some(handle));
        (combat, positions)
    }

    #[test]
    fn test_no_target_rejected() {
        let mut combat = CombatController::new();
        let result = combat.try_attack(Vec3::ZERO, 2.0, 1.0, &Positions::default());
        assert_eq!(result, Err(AttackRejection::NoTarget));
        assert!(combat.is_off_cooldown());
    }

    #[test]
    fn test_stale_target_rejected() {
        let (mut combat, _) = setup(Vec3::ZERO);
        let result = combat.try_attack(Vec3::ZERO, 2.0, 1.0, &Positions::default());
        assert!(matches!(result, Err(AttackRejection::TargetLost(_))));
    }

    #[test]
    fn test_range_gate() {
        let (mut combat, positions) = setup(Vec3::new(2.5, 0.0, 0.0));
        assert!(matches!(
            combat.try_attack(Vec3::ZERO, 2.0, 1.0, &positions),
            Err(AttackRejection::OutOfRange { .. })
        ));

        let (mut combat, positions) = setup(Vec3::new(2.0, 9.0, 0.0));
        assert!(combat.try_attack(Vec3::ZERO, 2.0, 1.0, &positions).is_ok());

        let (mut combat, positions) = setup(Vec3::ZERO);
        assert!(combat.try_attack(Vec3::ZERO, 2.0, 1.0, &positions).is_ok());
    }

    #[test]
    fn test_cooldown_gate() {
        let (mut combat, positions) = setup(Vec3::new(1.5, 0.0, 0.0));
        let token = combat.try_attack(Vec3::ZERO, 2.0, 1.0, &positions).unwrap();
        assert_eq!(
            combat.try_attack(Vec3::ZERO, 2.0, 1.0, &positions),
            Err(AttackRejection::Busy)
        );

        assert!(combat.end_attack(token));
        combat.tick(0.5);
        assert!(matches!(
            combat.try_attack(Vec3::ZERO, 2.0, 1.0, &positions),
            Err(AttackRejection::OnCooldown { .. })
        ));

        combat.tick(0.5);
        assert!(combat.try_attack(Vec3::ZERO, 2.0, 1.0, &positions).is_ok());
    }

    #[test]
    fn test_effect_redeemed_once() {
        let mut combat = CombatController::new();
        let token = combat.begin_attack(1.0, 1.5);
        assert_eq!(combat.take_effect(token), Some(1.5));
        assert_eq!(combat.take_effect(token), None);
    }

    #[test]
    fn test_cancelled_token_is_stale() {
        let mut combat = CombatController::new();
        let token = combat.begin_attack(1.0, 1.0);
        assert_eq!(combat.cancel(), Some(token));
        assert_eq!(combat.cancel(), None);
        assert_eq!(combat.take_effect(token), None);
        assert!(!combat.end_attack(token));
    }

    #[test]
    fn test_old_token_cannot_hit_new_attack() {
        let mut combat = CombatController::new();
        let old = combat.begin_attack(0.0, 1.0);
        combat.cancel();
        let new = combat.begin_attack(0.0, 1.0);
        assert_ne!(old, new);
        assert_eq!(combat.take_effect(old), None);
        assert_eq!(combat.take_effect(new), Some(1.0));
    }
}
