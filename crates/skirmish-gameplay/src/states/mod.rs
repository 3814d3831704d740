//! Concrete entity states.
//!
//! States read the per-tick [`TickInput`], drive the [`Body`] and the
//! [`CombatController`], and report what happened through [`Signal`]s that
//! the owning entity turns into outward events.

mod enemy;
mod player;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::body::Body;
use crate::combat::{AttackResult, AttackToken, CombatController};
use crate::intent::TickInput;
use crate::overlay::EffectiveStats;
use crate::profile::BehaviorTuning;
use crate::state_machine::{EntityState, StateId, StateKind};

pub use enemy::{EnemyState, EnemyStates};
pub use player::{PlayerState, PlayerStates};

/// Something a state did that the outside world may care about.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Signal {
    /// An attack began.
    AttackBegan {
        /// Token of the new attack
        token: AttackToken,
        /// Whether the attack times its own effect instant
        self_timed: bool,
    },
    /// A self-timed attack reached its effect instant.
    EffectDue {
        /// Token to redeem
        token: AttackToken,
    },
    /// An attack completed normally.
    AttackEnded {
        /// Token of the finished attack
        token: AttackToken,
    },
    /// An attack was abandoned before completion.
    AttackCancelled {
        /// Token of the abandoned attack
        token: AttackToken,
    },
    /// The state machine switched state.
    StateChanged {
        /// State left
        from: StateId,
        /// State entered
        to: StateId,
    },
}

/// Everything a state may touch during enter, exit and update.
pub struct StateContext<'a> {
    /// Own body.
    pub body: &'a mut Body,
    /// Own stats with the overlay applied.
    pub stats: EffectiveStats<'a>,
    /// Archetype tuning.
    pub tuning: &'a BehaviorTuning,
    /// Own attack gate.
    pub combat: &'a mut CombatController,
    /// Intents and perception for this tick.
    pub input: &'a TickInput,
    /// Outgoing signals.
    pub signals: &'a mut Vec<Signal>,
}

impl StateContext<'_> {
    /// Position of the current target, if it still resolves.
    #[must_use]
    pub fn target_position(&self) -> Option<Vec3> {
        let handle = self.combat.target()?;
        self.input.perception.target.filter(|s| s.handle == handle).map(|s| s.position)
    }

    /// Gates an attack against the current target at attack range.
    pub fn check_attack(&self) -> AttackResult<Vec3> {
        self.combat
            .check_attack(self.body.position, self.stats.attack_range(), &self.input.perception)
    }

    /// Begins an attack unless one is already in flight.
    pub fn begin_attack(&mut self, damage_multiplier: f32, self_timed: bool) {
        if self.combat.is_attacking() {
            return;
        }
        let token = self
            .combat
            .begin_attack(self.stats.attack_cooldown(), damage_multiplier);
        self.signals.push(Signal::AttackBegan { token, self_timed });
    }

    /// Drops the attack in flight, if any.
    pub fn cancel_attack(&mut self) {
        if let Some(token) = self.combat.cancel() {
            self.signals.push(Signal::AttackCancelled { token });
        }
    }

    /// Completes the attack in flight, if any.
    pub fn finish_attack(&mut self) {
        if let Some(token) = self.combat.active_token() {
            self.combat.end_attack(token);
            self.signals.push(Signal::AttackEnded { token });
        }
    }

    /// Turns toward the current target.
    pub fn face_target(&mut self, dt: f32) {
        if let Some(target) = self.target_position() {
            let dir = target - self.body.position;
            self.body.turn_toward(dir, self.stats.base().turn_speed, dt);
        }
    }
}

/// Stagger after a landed hit. Returns to `resume` when the timer runs out.
#[derive(Debug, Clone)]
pub struct HurtState<K> {
    timer: f32,
    resume: K,
}

impl<K: StateKind> HurtState<K> {
    /// Creates the state, resuming into `resume` until told otherwise.
    #[must_use]
    pub fn new(resume: K) -> Self {
        Self { timer: 0.0, resume }
    }

    /// Sets the state to return to.
    pub fn resume_into(&mut self, resume: K) {
        self.resume = resume;
    }

    /// State that will be resumed.
    #[must_use]
    pub fn resume(&self) -> K {
        self.resume
    }

    /// Seconds of stagger left.
    #[must_use]
    pub fn remaining(&self) -> f32 {
        self.timer
    }

    /// Starts the stagger over, for a hit taken while already staggered.
    pub fn restart(&mut self, tuning: &BehaviorTuning) {
        self.timer = tuning.hurt_recovery_seconds;
    }
}

impl<K: StateKind> EntityState<StateContext<'_>, K> for HurtState<K> {
    fn enter(&mut self, ctx: &mut StateContext<'_>) {
        self.timer = ctx.tuning.hurt_recovery_seconds;
        ctx.body.halt();
    }

    fn exit(&mut self, _ctx: &mut StateContext<'_>) {
        self.timer = 0.0;
    }

    fn update(&mut self, _ctx: &mut StateContext<'_>, dt: f32) -> Option<K> {
        self.timer -= dt;
        (self.timer <= 0.0).then_some(self.resume)
    }
}

/// Terminal state. Movement and combat stop for good.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeathState;

impl<K: StateKind> EntityState<StateContext<'_>, K> for DeathState {
    fn enter(&mut self, ctx: &mut StateContext<'_>) {
        ctx.cancel_attack();
        ctx.combat.set_target(None);
        ctx.body.halt();
    }

    fn update(&mut self, _ctx: &mut StateContext<'_>, _dt: f32) -> Option<K> {
        None
    }
}
