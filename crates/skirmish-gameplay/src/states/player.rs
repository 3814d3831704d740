//! Player state set, driven by device intents.
//!
//! Priority each tick from a free state: roll, charged attack, basic attack,
//! then movement. Roll and charged attack are time-boxed and ignore intents
//! until their timers run out.

use serde::{Deserialize, Serialize};
use skirmish_common::axis_to_ground;

use super::{DeathState, HurtState, Signal, StateContext};
use crate::state_machine::{EntityState, StateId, StateKind, StateSet};

/// Tag of a player state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerState {
    /// Standing.
    Idle,
    /// Walking along the movement axis.
    Move,
    /// Basic attack.
    RangedAttack,
    /// Wind-up attack with a damage multiplier.
    ChargedAttack,
    /// Dodge roll.
    Roll,
    /// Staggered.
    Hurt,
    /// Dead.
    Death,
}

impl PlayerState {
    /// Whether a landed hit staggers the player in this state.
    #[must_use]
    pub fn can_be_staggered(self) -> bool {
        !matches!(self, Self::Roll | Self::Death)
    }
}

impl StateKind for PlayerState {
    fn id(self) -> StateId {
        match self {
            Self::Idle => StateId::Idle,
            Self::Move => StateId::Move,
            Self::RangedAttack => StateId::RangedAttack,
            Self::ChargedAttack => StateId::ChargedAttack,
            Self::Roll => StateId::Roll,
            Self::Hurt => StateId::Hurt,
            Self::Death => StateId::Death,
        }
    }
}

/// Picks the successor of a free state from this tick's intents.
fn choose(ctx: &StateContext<'_>) -> Option<PlayerState> {
    let intent = &ctx.input.player;
    if intent.roll_pressed && ctx.body.roll_cooldown <= 0.0 {
        return Some(PlayerState::Roll);
    }
    if intent.charge_pressed && ctx.check_attack().is_ok() {
        return Some(PlayerState::ChargedAttack);
    }
    if intent.attack_pressed && ctx.check_attack().is_ok() {
        return Some(PlayerState::RangedAttack);
    }
    if intent.wants_move() {
        return Some(PlayerState::Move);
    }
    None
}

/// Standing still.
#[derive(Debug, Clone, Default)]
pub struct IdleState;

impl EntityState<StateContext<'_>, PlayerState> for IdleState {
    fn update(&mut self, ctx: &mut StateContext<'_>, _dt: f32) -> Option<PlayerState> {
        choose(ctx)
    }
}

/// Walks along the movement axis.
#[derive(Debug, Clone, Default)]
pub struct MoveState;

impl EntityState<StateContext<'_>, PlayerState> for MoveState {
    fn update(&mut self, ctx: &mut StateContext<'_>, dt: f32) -> Option<PlayerState> {
        match choose(ctx) {
            Some(PlayerState::Move) => {},
            Some(other) => return Some(other),
            None => return Some(PlayerState::Idle),
        }
        let dir = axis_to_ground(ctx.input.player.move_axis);
        let speed = ctx.stats.move_speed();
        let turn = ctx.stats.base().turn_speed;
        ctx.body.turn_toward(dir, turn, dt);
        ctx.body.move_along(dir, speed, dt);
        None
    }
}

/// Basic attack. Only a roll can interrupt it.
#[derive(Debug, Clone, Default)]
pub struct RangedAttackState;

impl EntityState<StateContext<'_>, PlayerState> for RangedAttackState {
    fn enter(&mut self, ctx: &mut StateContext<'_>) {
        ctx.begin_attack(1.0, false);
    }

    fn exit(&mut self, ctx: &mut StateContext<'_>) {
        ctx.cancel_attack();
    }

    fn update(&mut self, ctx: &mut StateContext<'_>, dt: f32) -> Option<PlayerState> {
        if ctx.input.player.roll_pressed && ctx.body.roll_cooldown <= 0.0 {
            return Some(PlayerState::Roll);
        }
        if !ctx.combat.is_attacking() {
            return Some(PlayerState::Idle);
        }
        ctx.face_target(dt);
        None
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum ChargePhase {
    #[default]
    Charging,
    Recovering,
}

/// Winds up, lands one heavy blow, recovers.
///
/// Times its own effect instant: when the wind-up completes it raises
/// [`Signal::EffectDue`] and the owner redeems the token right away.
#[derive(Debug, Clone, Default)]
pub struct ChargedAttackState {
    timer: f32,
    phase: ChargePhase,
}

impl EntityState<StateContext<'_>, PlayerState> for ChargedAttackState {
    fn enter(&mut self, ctx: &mut StateContext<'_>) {
        self.phase = ChargePhase::Charging;
        self.timer = ctx.tuning.charge_seconds;
        let mult = ctx.tuning.charged_damage_multiplier;
        ctx.begin_attack(mult, true);
    }

    fn exit(&mut self, ctx: &mut StateContext<'_>) {
        self.timer = 0.0;
        self.phase = ChargePhase::Charging;
        ctx.cancel_attack();
    }

    fn update(&mut self, ctx: &mut StateContext<'_>, dt: f32) -> Option<PlayerState> {
        let Some(token) = ctx.combat.active_token() else {
            return Some(PlayerState::Idle);
        };
        ctx.face_target(dt);
        self.timer -= dt;
        if self.timer > 0.0 {
            return None;
        }
        match self.phase {
            ChargePhase::Charging => {
                ctx.signals.push(Signal::EffectDue { token });
                self.phase = ChargePhase::Recovering;
                self.timer = ctx.tuning.charge_recovery_seconds;
                None
            },
            ChargePhase::Recovering => {
                ctx.finish_attack();
                Some(PlayerState::Idle)
            },
        }
    }
}

/// Dodge along the movement axis, or forward without one.
#[derive(Debug, Clone, Default)]
pub struct RollState {
    timer: f32,
    direction: glam::Vec3,
}

impl EntityState<StateContext<'_>, PlayerState> for RollState {
    fn enter(&mut self, ctx: &mut StateContext<'_>) {
        self.timer = ctx.tuning.roll_seconds;
        self.direction = if ctx.input.player.wants_move() {
            axis_to_ground(ctx.input.player.move_axis).normalize_or_zero()
        } else {
            ctx.body.facing
        };
    }

    fn exit(&mut self, ctx: &mut StateContext<'_>) {
        self.timer = 0.0;
        self.direction = glam::Vec3::ZERO;
        ctx.body.roll_cooldown = ctx.tuning.roll_cooldown_seconds;
    }

    fn update(&mut self, ctx: &mut StateContext<'_>, dt: f32) -> Option<PlayerState> {
        let speed = ctx.stats.move_speed() * ctx.tuning.roll_speed_multiplier;
        let step = dt.min(self.timer.max(0.0));
        ctx.body.move_along(self.direction, speed, step);
        self.timer -= dt;
        (self.timer <= 0.0).then_some(PlayerState::Idle)
    }
}

/// Every player state, allocated once per entity.
#[derive(Debug, Clone)]
pub struct PlayerStates {
    idle: IdleState,
    moving: MoveState,
    ranged: RangedAttackState,
    charged: ChargedAttackState,
    roll: RollState,
    /// Stagger state, exposed so hits can restart it.
    pub hurt: HurtState<PlayerState>,
    death: DeathState,
}

impl Default for PlayerStates {
    fn default() -> Self {
        Self {
            idle: IdleState,
            moving: MoveState,
            ranged: RangedAttackState,
            charged: ChargedAttackState::default(),
            roll: RollState::default(),
            hurt: HurtState::new(PlayerState::Idle),
            death: DeathState,
        }
    }
}

impl<'a> StateSet<StateContext<'a>> for PlayerStates {
    type Kind = PlayerState;

    fn state_mut(&mut self, kind: PlayerState) -> &mut dyn EntityState<StateContext<'a>, PlayerState> {
        match kind {
            PlayerState::Idle => &mut self.idle,
            PlayerState::Move => &mut self.moving,
            PlayerState::RangedAttack => &mut self.ranged,
            PlayerState::ChargedAttack => &mut self.charged,
            PlayerState::Roll => &mut self.roll,
            PlayerState::Hurt => &mut self.hurt,
            PlayerState::Death => &mut self.death,
        }
    }
}
