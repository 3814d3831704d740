//! Combat entity: body, stats, health, attack gate and brain of one actor.

use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use skirmish_common::{ground_direction, EntityHandle, EntityId};
use tracing::{debug, warn};

use crate::body::Body;
use crate::combat::{AttackToken, CombatController};
use crate::damage::{DamageResolver, Outcome, RollSource, StrikeProfile};
use crate::health::{HealthModel, HitInfo};
use crate::intent::{TargetLookup, TickInput};
use crate::lifecycle::{Lifecycle, RemovalNotice};
use crate::overlay::{EffectiveStats, StatModifierOverlay};
use crate::profile::StatProfile;
use crate::state_machine::{StateId, StateKind, StateMachine, Transition};
use crate::states::{EnemyState, EnemyStates, PlayerState, PlayerStates, Signal, StateContext};
use crate::stats::{RuntimeStats, StatKind, UpgradeResult};

/// Which side an entity fights on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// Player-controlled
    Player,
    /// AI-controlled
    Enemy,
}

impl Faction {
    /// The side this faction attacks.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }
}

fn ids<K: StateKind>(t: Option<Transition<K>>) -> Option<(StateId, StateId)> {
    t.map(|t| (t.from.id(), t.to.id()))
}

/// State machine of either side.
#[derive(Debug, Clone)]
pub enum Brain {
    /// AI states.
    Enemy(StateMachine<EnemyStates, EnemyState>),
    /// Intent-driven states.
    Player(StateMachine<PlayerStates, PlayerState>),
}

impl Brain {
    /// Fresh, uninitialized brain for a faction.
    #[must_use]
    pub fn for_faction(faction: Faction) -> Self {
        match faction {
            Faction::Enemy => Self::Enemy(StateMachine::new(EnemyStates::default(), EnemyState::Idle)),
            Faction::Player => {
                Self::Player(StateMachine::new(PlayerStates::default(), PlayerState::Idle))
            },
        }
    }

    /// Identity of the current state.
    #[must_use]
    pub fn state(&self) -> StateId {
        match self {
            Self::Enemy(fsm) => fsm.current().id(),
            Self::Player(fsm) => fsm.current().id(),
        }
    }

    fn initialize(&mut self, ctx: &mut StateContext<'_>) {
        match self {
            Self::Enemy(fsm) => fsm.initialize(EnemyState::Idle, ctx),
            Self::Player(fsm) => fsm.initialize(PlayerState::Idle, ctx),
        }
    }

    fn tick(&mut self, ctx: &mut StateContext<'_>, dt: f32) -> Option<(StateId, StateId)> {
        match self {
            Self::Enemy(fsm) => ids(fsm.tick(ctx, dt)),
            Self::Player(fsm) => ids(fsm.tick(ctx, dt)),
        }
    }

    fn enter_attack(&mut self, ctx: &mut StateContext<'_>) -> Option<(StateId, StateId)> {
        match self {
            Self::Enemy(fsm) => ids(fsm.change_state(EnemyState::MeleeAttack, ctx)),
            Self::Player(fsm) => ids(fsm.change_state(PlayerState::RangedAttack, ctx)),
        }
    }

    fn stagger(&mut self, ctx: &mut StateContext<'_>) -> Option<(StateId, StateId)> {
        match self {
            Self::Enemy(fsm) => match fsm.current() {
                EnemyState::Death => None,
                EnemyState::Hurt => {
                    fsm.states_mut().hurt.restart(ctx.tuning);
                    None
                },
                current => {
                    fsm.states_mut().hurt.resume_into(current.resume_after_hurt());
                    ids(fsm.change_state(EnemyState::Hurt, ctx))
                },
            },
            Self::Player(fsm) => match fsm.current() {
                PlayerState::Hurt => {
                    fsm.states_mut().hurt.restart(ctx.tuning);
                    None
                },
                current if current.can_be_staggered() => {
                    fsm.states_mut().hurt.resume_into(PlayerState::Idle);
                    ids(fsm.change_state(PlayerState::Hurt, ctx))
                },
                _ => None,
            },
        }
    }

    fn die(&mut self, ctx: &mut StateContext<'_>) -> Option<(StateId, StateId)> {
        match self {
            Self::Enemy(fsm) => ids(fsm.change_state(EnemyState::Death, ctx)),
            Self::Player(fsm) => ids(fsm.change_state(PlayerState::Death, ctx)),
        }
    }
}

/// Everything an entity needs to fight. Absent when it has no profile.
#[derive(Debug)]
pub struct Combatant {
    profile: Arc<StatProfile>,
    stats: RuntimeStats,
    overlay: Option<StatModifierOverlay>,
    health: HealthModel,
    combat: CombatController,
    brain: Brain,
}

impl Combatant {
    fn new(profile: Arc<StatProfile>, faction: Faction) -> Self {
        let stats = RuntimeStats::from_profile(&profile);
        let health = HealthModel::new(stats.max_health);
        Self {
            profile,
            stats,
            overlay: None,
            health,
            combat: CombatController::new(),
            brain: Brain::for_faction(faction),
        }
    }

    /// Archetype the entity was spawned from.
    #[must_use]
    pub fn profile(&self) -> &Arc<StatProfile> {
        &self.profile
    }

    /// Base stats, without the overlay.
    #[must_use]
    pub fn stats(&self) -> &RuntimeStats {
        &self.stats
    }

    /// Stats as read through the overlay.
    #[must_use]
    pub fn effective(&self) -> EffectiveStats<'_> {
        EffectiveStats::new(&self.stats, self.overlay.as_ref())
    }

    /// Attached overlay.
    #[must_use]
    pub fn overlay(&self) -> Option<&StatModifierOverlay> {
        self.overlay.as_ref()
    }

    /// Health model.
    #[must_use]
    pub fn health(&self) -> &HealthModel {
        &self.health
    }

    /// Health model, for subscribing listeners.
    pub fn health_mut(&mut self) -> &mut HealthModel {
        &mut self.health
    }

    /// Attack gate.
    #[must_use]
    pub fn combat(&self) -> &CombatController {
        &self.combat
    }

    /// State machine.
    #[must_use]
    pub fn brain(&self) -> &Brain {
        &self.brain
    }

    /// Attaches `overlay`, replacing any previous one.
    ///
    /// A larger health bonus grows max health and heals to full.
    pub fn attach_overlay(&mut self, overlay: StatModifierOverlay) {
        let before = EffectiveStats::new(&self.stats, self.overlay.as_ref()).max_health();
        let after = EffectiveStats::new(&self.stats, Some(&overlay)).max_health();
        if after > before {
            self.health.increase_max_health(after - before, true);
        }
        self.overlay = Some(overlay);
    }

    /// Upgrades one stat. Max health upgrades also grow the health model
    /// without healing.
    pub fn apply_upgrade(&mut self, stat: StatKind, amount: f32) -> UpgradeResult<u8> {
        let before = self.stats.get(stat);
        let level = self.stats.apply_upgrade(stat, amount)?;
        if stat == StatKind::MaxHealth {
            self.health.increase_max_health(self.stats.max_health - before, false);
        }
        Ok(level)
    }
}

/// Payload of an attack at its effect instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Strike {
    /// Attacker.
    pub attacker: EntityId,
    /// Attacker position when the blow landed.
    pub origin: Vec3,
    /// Target the attacker was aiming at.
    pub target: Option<EntityHandle>,
    /// Raw damage, overlay and attack multiplier applied.
    pub damage: f32,
    /// Ground distance the blow reaches.
    pub reach: f32,
    /// Attacker crit chance in percent.
    pub critical_chance_percent: f32,
    /// Attacker crit multiplier.
    pub critical_damage_multiplier: f32,
    /// Knockback impulse for a damaged defender.
    pub knockback: f32,
}

impl StrikeProfile for Strike {
    fn critical_chance_percent(&self) -> f32 {
        self.critical_chance_percent
    }

    fn critical_damage_multiplier(&self) -> f32 {
        self.critical_damage_multiplier
    }
}

/// An actor in the skirmish.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    handle: EntityHandle,
    faction: Faction,
    body: Body,
    combatant: Option<Combatant>,
    lifecycle: Lifecycle,
    signals: Vec<Signal>,
}

impl Entity {
    /// Creates an entity and enters its initial state.
    ///
    /// Without a profile the entity is inert: it never updates, attacks or
    /// takes damage.
    #[must_use]
    pub fn spawn(
        handle: EntityHandle,
        faction: Faction,
        profile: Option<Arc<StatProfile>>,
        position: Vec3,
    ) -> Self {
        let id = EntityId::new();
        if profile.is_none() {
            warn!("Entity {} spawned without a stat profile, it will stay inert", id);
        }
        let mut entity = Self {
            id,
            handle,
            faction,
            body: Body::at(position),
            combatant: profile.map(|p| Combatant::new(p, faction)),
            lifecycle: Lifecycle::new(),
            signals: Vec::new(),
        };
        entity.drive(&TickInput::default(), |brain, ctx| brain.initialize(ctx));
        entity
    }

    /// Returns the entity's unique ID.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Arena handle.
    #[must_use]
    pub const fn handle(&self) -> EntityHandle {
        self.handle
    }

    /// Side.
    #[must_use]
    pub const fn faction(&self) -> Faction {
        self.faction
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.body.position
    }

    /// Body.
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Mutable body, for the physics collaborator.
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Combat parts, `None` for an inert entity.
    #[must_use]
    pub fn combatant(&self) -> Option<&Combatant> {
        self.combatant.as_ref()
    }

    /// Mutable combat parts.
    pub fn combatant_mut(&mut self) -> Option<&mut Combatant> {
        self.combatant.as_mut()
    }

    /// Whether the entity has no profile.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.combatant.is_none()
    }

    /// Whether the entity is alive and acting.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.lifecycle.is_active()
            && self
                .combatant
                .as_ref()
                .is_some_and(|c| c.health.is_alive())
    }

    /// Current state identity.
    #[must_use]
    pub fn state(&self) -> Option<StateId> {
        self.combatant.as_ref().map(|c| c.brain.state())
    }

    /// Decay lifecycle.
    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Current target handle.
    #[must_use]
    pub fn target(&self) -> Option<EntityHandle> {
        self.combatant.as_ref().and_then(|c| c.combat.target())
    }

    /// Replaces the target. Ignored once dead.
    pub fn set_target(&mut self, target: Option<EntityHandle>) {
        if !self.lifecycle.is_active() {
            return;
        }
        if let Some(c) = &mut self.combatant {
            c.combat.set_target(target);
        }
    }

    /// Signals raised since the last drain.
    pub fn drain_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }

    /// Notice to hand to removal sinks.
    #[must_use]
    pub fn removal_notice(&self) -> RemovalNotice {
        RemovalNotice {
            id: self.id,
            handle: self.handle,
            faction: self.faction,
            archetype: self.combatant.as_ref().map(|c| c.profile.id),
        }
    }

    fn drive<R>(
        &mut self,
        input: &TickInput,
        f: impl FnOnce(&mut Brain, &mut StateContext<'_>) -> R,
    ) -> Option<R> {
        let Self {
            body,
            combatant,
            signals,
            ..
        } = self;
        let Combatant {
            profile,
            stats,
            overlay,
            combat,
            brain,
            ..
        } = combatant.as_mut()?;
        let mut ctx = StateContext {
            body,
            stats: EffectiveStats::new(stats, overlay.as_ref()),
            tuning: &profile.behavior,
            combat,
            input,
            signals,
        };
        Some(f(brain, &mut ctx))
    }

    fn record(&mut self, transition: Option<Option<(StateId, StateId)>>) {
        if let Some(Some((from, to))) = transition {
            self.signals.push(Signal::StateChanged { from, to });
        }
    }

    /// Advances one tick.
    ///
    /// The state updates first and any transition it asked for is applied;
    /// only then does the cooldown count down. A dead entity only advances
    /// its decay timer. Returns true on the one tick removal is due.
    pub fn tick(&mut self, dt: f32, input: &TickInput) -> bool {
        if self.lifecycle.is_removed() {
            return false;
        }
        if !self.lifecycle.is_active() {
            return self.lifecycle.tick(dt);
        }

        let transition = self.drive(input, |brain, ctx| brain.tick(ctx, dt));
        if transition.is_none() {
            return false;
        }
        self.record(transition);
        if let Some(c) = &mut self.combatant {
            c.combat.tick(dt);
        }
        self.body.tick(dt);
        false
    }

    /// Starts an attack on the current target.
    ///
    /// Returns false without side effects when there is no target, the target
    /// no longer resolves, the cooldown is running, an attack is in flight,
    /// the target is out of range, or the current state cannot attack.
    pub fn try_attack<L: TargetLookup + ?Sized>(&mut self, lookup: &L) -> bool {
        if !self.lifecycle.is_active() {
            return false;
        }
        let origin = self.body.position;
        let Some(c) = self.combatant.as_mut() else {
            return false;
        };
        if matches!(
            c.brain.state(),
            StateId::Hurt | StateId::Roll | StateId::ChargedAttack | StateId::Death
        ) {
            return false;
        }

        let stats = EffectiveStats::new(&c.stats, c.overlay.as_ref());
        let (range, cooldown) = (stats.attack_range(), stats.attack_cooldown());
        let Ok(token) = c.combat.try_attack(origin, range, cooldown, lookup) else {
            return false;
        };
        self.signals.push(Signal::AttackBegan {
            token,
            self_timed: false,
        });
        let transition = self.drive(&TickInput::default(), |brain, ctx| brain.enter_attack(ctx));
        self.record(transition);
        true
    }

    /// Redeems an attack at its effect instant.
    ///
    /// With `token` the specific attack is redeemed, otherwise whichever is
    /// in flight. Returns `None` when the entity is no longer in that attack,
    /// so a cancelled or already-spent attack never deals damage.
    pub fn take_strike(&mut self, token: Option<AttackToken>) -> Option<Strike> {
        if !self.lifecycle.is_active() {
            return None;
        }
        let origin = self.body.position;
        let c = self.combatant.as_mut()?;
        let token = token.or_else(|| c.combat.active_token())?;
        let multiplier = c.combat.take_effect(token)?;
        let stats = EffectiveStats::new(&c.stats, c.overlay.as_ref());
        Some(Strike {
            attacker: self.id,
            origin,
            target: c.combat.target(),
            damage: stats.attack_damage() * multiplier,
            reach: stats.hit_reach(),
            critical_chance_percent: c.stats.critical_chance_percent,
            critical_damage_multiplier: c.stats.critical_damage_multiplier,
            knockback: c.profile.behavior.knockback,
        })
    }

    /// Receives `strike` from another entity.
    pub fn receive_strike<R: RollSource>(&mut self, strike: &Strike, rolls: &mut R) -> Option<Outcome> {
        let normal = ground_direction(self.body.position, strike.origin);
        let hit = HitInfo::new(self.body.position, normal, Some(strike.attacker));
        self.receive_hit(strike, strike.damage, hit, strike.knockback, rolls)
    }

    /// Runs the hit pipeline against this entity.
    ///
    /// Evasion, crit and defense are resolved with `attacker`'s strike stats
    /// and this entity's guard stats. Knockback is pushed away from
    /// `hit.normal` only when damage got through. Returns `None` for inert,
    /// dead or removed entities.
    pub fn receive_hit<A, R>(
        &mut self,
        attacker: &A,
        raw_damage: f32,
        hit: HitInfo,
        knockback: f32,
        rolls: &mut R,
    ) -> Option<Outcome>
    where
        A: StrikeProfile + ?Sized,
        R: RollSource,
    {
        if !self.lifecycle.is_active() {
            return None;
        }
        let c = self.combatant.as_mut()?;
        let defender = EffectiveStats::new(&c.stats, c.overlay.as_ref());
        let outcome = DamageResolver::apply(attacker, &defender, &mut c.health, raw_damage, hit, rolls);
        let dead = c.health.is_dead();

        if dead {
            self.die();
        } else if outcome.dealt_damage() {
            let transition = self.drive(&TickInput::default(), |brain, ctx| brain.stagger(ctx));
            self.record(transition);
            // after the stagger, whose enter clears residual motion
            self.body.push(-hit.normal, knockback);
        }
        Some(outcome)
    }

    /// Restores health. Returns the amount restored.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if !self.lifecycle.is_active() {
            return 0.0;
        }
        self.combatant
            .as_mut()
            .map_or(0.0, |c| c.health.heal(amount))
    }

    /// Kills the entity outright.
    pub fn kill(&mut self, killer: Option<EntityId>) {
        if !self.lifecycle.is_active() {
            return;
        }
        if let Some(c) = &mut self.combatant {
            c.health.kill(killer);
            self.die();
        }
    }

    /// Completes an attack. The state leaves the attack on its next update.
    ///
    /// With `token` only that attack is ended; otherwise whichever is in
    /// flight. Returns false if nothing matched.
    pub fn end_attack(&mut self, token: Option<AttackToken>) -> bool {
        let Some(c) = self.combatant.as_mut() else {
            return false;
        };
        let Some(token) = token.or_else(|| c.combat.active_token()) else {
            return false;
        };
        if !c.combat.end_attack(token) {
            return false;
        }
        self.signals.push(Signal::AttackEnded { token });
        true
    }

    /// Attaches a stat overlay.
    pub fn attach_overlay(&mut self, overlay: StatModifierOverlay) {
        if let Some(c) = &mut self.combatant {
            c.attach_overlay(overlay);
        }
    }

    fn die(&mut self) {
        let transition = self.drive(&TickInput::default(), |brain, ctx| brain.die(ctx));
        self.record(transition);
        let decay = self
            .combatant
            .as_ref()
            .map_or(0.0, |c| c.profile.behavior.decay_seconds);
        if self.lifecycle.begin_decay(decay) {
            debug!("Entity {} died, removal in {}s", self.id, decay);
        }
        self.body.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damage::FixedRolls;
    use crate::intent::Perception;
    use skirmish_common::ArchetypeId;

    fn profile() -> Arc<StatProfile> {
        Arc::new(
            StatProfile::new(ArchetypeId::new(1), "grunt")
                .with_max_health(100.0)
                .with_attack_damage(20.0)
                .with_attack_range(2.0)
                .with_attack_cooldown(1.0),
        )
    }

    fn pair() -> (Entity, Entity) {
        let attacker = Entity::spawn(
            EntityHandle::new(0, 0),
            Faction::Enemy,
            Some(profile()),
            Vec3::ZERO,
        );
        let defender = Entity::spawn(
            EntityHandle::new(1, 0),
            Faction::Player,
            Some(profile()),
            Vec3::new(1.5, 0.0, 0.0),
        );
        (attacker, defender)
    }

    fn view(of: &Entity) -> Perception {
        Perception::of(of.handle(), of.position())
    }

    #[test]
    fn test_spawn_enters_idle() {
        let (attacker, _) = pair();
        assert_eq!(attacker.state(), Some(StateId::Idle));
        assert!(attacker.is_alive());
    }

    #[test]
    fn test_attack_gating_scenario() {
        let (mut attacker, defender) = pair();
        attacker.set_target(Some(defender.handle()));
        let input = TickInput::sees(view(&defender));

        assert!(attacker.try_attack(&input.perception));
        assert_eq!(attacker.state(), Some(StateId::MeleeAttack));
        assert!(!attacker.try_attack(&input.perception));

        attacker.tick(0.5, &input);
        assert!(!attacker.try_attack(&input.perception));
        attacker.tick(0.5, &input);
        assert!(attacker.end_attack(None));
        assert!(attacker.try_attack(&input.perception));
    }

    #[test]
    fn test_cancelled_attack_deals_nothing() {
        let (mut attacker, defender) = pair();
        attacker.set_target(Some(defender.handle()));
        assert!(attacker.try_attack(&view(&defender)));
        let Some(Signal::AttackBegan { token, .. }) = attacker.drain_signals().first().copied() else {
            panic!("attack did not begin");
        };

        // a landed hit staggers the attacker out of its swing
        let hit = HitInfo::new(Vec3::ZERO, Vec3::X, None);
        attacker.receive_hit(&attacker_profile_stats(), 10.0, hit, 0.0, &mut FixedRolls::constant(99.0));
        assert_eq!(attacker.state(), Some(StateId::Hurt));
        assert!(attacker.take_strike(Some(token)).is_none());
        assert!(attacker.take_strike(None).is_none());
    }

    fn attacker_profile_stats() -> RuntimeStats {
        RuntimeStats::from_profile(&profile())
    }

    #[test]
    fn test_strike_lands_once() {
        let (mut attacker, mut defender) = pair();
        attacker.set_target(Some(defender.handle()));
        assert!(attacker.try_attack(&view(&defender)));

        let strike = attacker.take_strike(None).unwrap();
        assert_eq!(strike.damage, 20.0);
        assert!(attacker.take_strike(None).is_none());

        let outcome = defender
            .receive_strike(&strike, &mut FixedRolls::constant(99.0))
            .unwrap();
        assert_eq!(outcome.damage(), 20.0);
        assert_eq!(defender.combatant().unwrap().health().current(), 80.0);
        assert_eq!(defender.state(), Some(StateId::Hurt));
        assert!(defender.body().knockback.x > 0.0);
    }

    #[test]
    fn test_knockback_survives_stagger() {
        let mut enemy = Entity::spawn(EntityHandle::new(4, 0), Faction::Enemy, Some(profile()), Vec3::ZERO);
        let hit = HitInfo::new(Vec3::ZERO, -Vec3::X, None);
        let outcome = enemy
            .receive_hit(&attacker_profile_stats(), 10.0, hit, 5.0, &mut FixedRolls::constant(99.0))
            .unwrap();
        assert_eq!(outcome.damage(), 10.0);
        assert_eq!(enemy.state(), Some(StateId::Hurt));
        assert_eq!(enemy.body().knockback, Vec3::new(5.0, 0.0, 0.0));

        enemy.tick(0.1, &TickInput::default());
        assert!(enemy.position().x > 0.0);
        assert_eq!(enemy.state(), Some(StateId::Hurt));
    }

    #[test]
    fn test_cooldown_multiplier_gates_attacks() {
        let (mut attacker, defender) = pair();
        attacker.attach_overlay(StatModifierOverlay::default().with_cooldown_multiplier(0.5));
        attacker.set_target(Some(defender.handle()));
        let input = TickInput::sees(view(&defender));

        assert!(attacker.try_attack(&input.perception));
        assert!(attacker.end_attack(None));
        attacker.tick(0.25, &input);
        assert!(!attacker.try_attack(&input.perception));
        attacker.tick(0.125, &input);
        assert!(!attacker.try_attack(&input.perception));

        // 1.0s base cooldown at half speed is ready at exactly 0.5s
        attacker.tick(0.125, &input);
        assert!(attacker.try_attack(&input.perception));
    }

    #[test]
    fn test_absorbed_hit_has_no_knockback() {
        let armored = Arc::new(StatProfile::new(ArchetypeId::new(2), "wall").with_defense(50.0));
        let mut wall = Entity::spawn(EntityHandle::new(5, 0), Faction::Enemy, Some(armored), Vec3::X);
        let hit = HitInfo::new(Vec3::X, -Vec3::X, None);
        let outcome = wall
            .receive_hit(&attacker_profile_stats(), 20.0, hit, 5.0, &mut FixedRolls::constant(99.0))
            .unwrap();
        assert!(!outcome.is_evaded());
        assert!(!outcome.dealt_damage());
        assert_eq!(wall.body().knockback, Vec3::ZERO);
        assert_eq!(wall.state(), Some(StateId::Idle));
    }

    #[test]
    fn test_death_is_terminal_and_decays() {
        let (_, mut defender) = pair();
        let strike = Strike {
            attacker: EntityId::from_raw(77),
            origin: Vec3::ZERO,
            target: Some(defender.handle()),
            damage: 500.0,
            reach: 2.5,
            critical_chance_percent: 0.0,
            critical_damage_multiplier: 1.0,
            knockback: 0.0,
        };
        let mut rolls = FixedRolls::constant(99.0);
        assert!(defender.receive_strike(&strike, &mut rolls).is_some());
        assert!(defender.receive_strike(&strike, &mut rolls).is_none());
        assert_eq!(defender.state(), Some(StateId::Death));
        assert!(!defender.is_alive());

        // no intent moves a dead entity out of Death
        let input = TickInput {
            player: crate::intent::PlayerIntent::moving(glam::Vec2::Y),
            ..TickInput::default()
        };
        let decay = profile().behavior.decay_seconds;
        let mut removed = 0;
        let mut t = 0.0;
        while t < decay + 1.0 {
            if defender.tick(0.1, &input) {
                removed += 1;
            }
            t += 0.1;
        }
        assert_eq!(removed, 1);
        assert_eq!(defender.state(), Some(StateId::Death));
        assert_eq!(defender.position(), Vec3::new(1.5, 0.0, 0.0));
    }

    #[test]
    fn test_inert_entity_does_nothing() {
        let mut inert = Entity::spawn(EntityHandle::new(9, 0), Faction::Enemy, None, Vec3::ZERO);
        let target = EntityHandle::new(1, 0);
        inert.set_target(Some(target));
        assert!(inert.is_inert());
        assert!(!inert.is_alive());
        assert_eq!(inert.state(), None);
        assert!(!inert.try_attack(&Perception::of(target, Vec3::X)));
        assert!(!inert.tick(1.0, &TickInput::default()));
        assert!(inert
            .receive_hit(&attacker_profile_stats(), 10.0, HitInfo::NONE, 0.0, &mut FixedRolls::constant(0.0))
            .is_none());
        assert!(inert.drain_signals().is_empty());
    }

    #[test]
    fn test_upgrade_max_health_grows_pool() {
        let (mut attacker, _) = pair();
        let c = attacker.combatant_mut().unwrap();
        c.health_mut().take_damage(50.0, HitInfo::NONE, |d| Outcome::Hit {
            final_damage: d,
            is_critical: false,
        });
        assert_eq!(c.apply_upgrade(StatKind::MaxHealth, 50.0), Ok(1));
        assert_eq!(c.health().current(), 50.0);
        assert_eq!(c.health().max(), 150.0);
    }

    #[test]
    fn test_overlay_scales_strike() {
        let (mut attacker, defender) = pair();
        attacker.attach_overlay(
            StatModifierOverlay::default()
                .with_damage_bonus(5.0)
                .with_health_bonus(20.0),
        );
        let health = attacker.combatant().unwrap().health();
        assert_eq!((health.current(), health.max()), (120.0, 120.0));

        attacker.set_target(Some(defender.handle()));
        assert!(attacker.try_attack(&view(&defender)));
        assert_eq!(attacker.take_strike(None).unwrap().damage, 25.0);
    }

    #[test]
    fn test_player_roll_ignores_stagger() {
        let (_, mut player) = pair();
        let input = TickInput {
            player: crate::intent::PlayerIntent {
                roll_pressed: true,
                ..Default::default()
            },
            ..TickInput::default()
        };
        player.tick(0.016, &input);
        assert_eq!(player.state(), Some(StateId::Roll));

        let hit = HitInfo::new(Vec3::ZERO, Vec3::X, None);
        player.receive_hit(&attacker_profile_stats(), 10.0, hit, 0.0, &mut FixedRolls::constant(99.0));
        assert_eq!(player.state(), Some(StateId::Roll));
        assert_eq!(player.combatant().unwrap().health().current(), 90.0);
    }
}
