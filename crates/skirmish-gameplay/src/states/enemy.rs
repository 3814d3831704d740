//! AI state set: idle, chase, return home, melee, hurt, death.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{DeathState, HurtState, StateContext};
use crate::combat::AttackRejection;
use crate::state_machine::{EntityState, StateId, StateKind, StateSet};

/// How far inside attack range a chase comes to rest.
const CHASE_STOP_MARGIN: f32 = 0.05;

/// Tag of an AI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyState {
    /// Waiting for a target to come into view.
    Idle,
    /// Closing in on the target.
    Chase,
    /// Walking back to the spawn point.
    ReturnHome,
    /// Swinging at the target.
    MeleeAttack,
    /// Staggered.
    Hurt,
    /// Dead.
    Death,
}

impl EnemyState {
    /// Locomotion state to go back to after a stagger.
    #[must_use]
    pub fn resume_after_hurt(self) -> Self {
        match self {
            Self::MeleeAttack => Self::Chase,
            other => other,
        }
    }
}

impl StateKind for EnemyState {
    fn id(self) -> StateId {
        match self {
            Self::Idle => StateId::Idle,
            Self::Chase => StateId::Chase,
            Self::ReturnHome => StateId::ReturnHome,
            Self::MeleeAttack => StateId::MeleeAttack,
            Self::Hurt => StateId::Hurt,
            Self::Death => StateId::Death,
        }
    }
}

/// Stands still until the target is within detection range.
#[derive(Debug, Clone, Default)]
pub struct IdleState;

impl EntityState<StateContext<'_>, EnemyState> for IdleState {
    fn update(&mut self, ctx: &mut StateContext<'_>, _dt: f32) -> Option<EnemyState> {
        let target = ctx.target_position()?;
        (ctx.body.distance_to(target) <= ctx.tuning.detection_range).then_some(EnemyState::Chase)
    }
}

/// Pursues the target until it is in reach or the leash snaps.
#[derive(Debug, Clone, Default)]
pub struct ChaseState;

impl EntityState<StateContext<'_>, EnemyState> for ChaseState {
    fn update(&mut self, ctx: &mut StateContext<'_>, dt: f32) -> Option<EnemyState> {
        if ctx.body.distance_from_home() > ctx.tuning.leash_range {
            trace!("Leash exceeded, heading home");
            return Some(EnemyState::ReturnHome);
        }

        match ctx.check_attack() {
            Ok(_) => return Some(EnemyState::MeleeAttack),
            Err(AttackRejection::NoTarget | AttackRejection::TargetLost(_)) => {
                return Some(EnemyState::ReturnHome);
            },
            Err(_) => {},
        }

        let target = ctx.target_position()?;
        let speed = ctx.stats.move_speed();
        let stop = (ctx.stats.attack_range() - CHASE_STOP_MARGIN).max(0.0);
        ctx.face_target(dt);
        ctx.body.move_toward(target, speed, stop, dt);
        None
    }
}

/// Walks back to the spawn point, then idles.
#[derive(Debug, Clone, Default)]
pub struct ReturnHomeState;

impl EntityState<StateContext<'_>, EnemyState> for ReturnHomeState {
    fn update(&mut self, ctx: &mut StateContext<'_>, dt: f32) -> Option<EnemyState> {
        let home = ctx.body.home;
        let speed = ctx.stats.move_speed();
        let turn = ctx.stats.base().turn_speed;
        let heading = home - ctx.body.position;
        ctx.body.turn_toward(heading, turn, dt);
        ctx.body
            .move_toward(home, speed, ctx.tuning.home_tolerance, dt)
            .then_some(EnemyState::Idle)
    }
}

/// Holds position while the swing plays out.
///
/// Damage lands when the effect instant is triggered from outside; the state
/// goes back to chasing once the attack-end signal clears the attack.
#[derive(Debug, Clone, Default)]
pub struct MeleeAttackState;

impl EntityState<StateContext<'_>, EnemyState> for MeleeAttackState {
    fn enter(&mut self, ctx: &mut StateContext<'_>) {
        ctx.begin_attack(1.0, false);
    }

    fn exit(&mut self, ctx: &mut StateContext<'_>) {
        ctx.cancel_attack();
    }

    fn update(&mut self, ctx: &mut StateContext<'_>, dt: f32) -> Option<EnemyState> {
        if !ctx.combat.is_attacking() {
            return Some(EnemyState::Chase);
        }
        ctx.face_target(dt);
        None
    }
}

/// Every AI state, allocated once per entity.
#[derive(Debug, Clone)]
pub struct EnemyStates {
    idle: IdleState,
    chase: ChaseState,
    return_home: ReturnHomeState,
    melee: MeleeAttackState,
    /// Stagger state, exposed so hits can set its resume target.
    pub hurt: HurtState<EnemyState>,
    death: DeathState,
}

impl Default for EnemyStates {
    fn default() -> Self {
        Self {
            idle: IdleState,
            chase: ChaseState,
            return_home: ReturnHomeState,
            melee: MeleeAttackState,
            hurt: HurtState::new(EnemyState::Idle),
            death: DeathState,
        }
    }
}

impl<'a> StateSet<StateContext<'a>> for EnemyStates {
    type Kind = EnemyState;

    fn state_mut(&mut self, kind: EnemyState) -> &mut dyn EntityState<StateContext<'a>, EnemyState> {
        match kind {
            EnemyState::Idle => &mut self.idle,
            EnemyState::Chase => &mut self.chase,
            EnemyState::ReturnHome => &mut self.return_home,
            EnemyState::MeleeAttack => &mut self.melee,
            EnemyState::Hurt => &mut self.hurt,
            EnemyState::Death => &mut self.death,
        }
    }
}
