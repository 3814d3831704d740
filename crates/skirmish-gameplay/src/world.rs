//! Arena of entities and the single-threaded tick loop that drives them.
//!
//! Every entity only mutates itself during its own tick. Cross-entity reads
//! go through a [`PositionSnapshot`] taken at the start of the tick, and hits
//! are resolved by the world between entity ticks.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use skirmish_common::{ground_distance, ground_distance_squared, EntityHandle, EntityId};
use thiserror::Error;
use tracing::{debug, trace};

use crate::combat::AttackToken;
use crate::cues::{CueKind, CueTiming, FixedDelayCues};
use crate::damage::{Outcome, StrikeProfile};
use crate::entity::{Entity, Faction};
use crate::events::{CombatEvent, EventBus, HealthForwarder};
use crate::health::{HealthListener, HitInfo, ListenerId};
use crate::intent::{Perception, PlayerIntent, Sighting, TargetLookup, TickInput};
use crate::lifecycle::{RemovalNotice, RemovalSink};
use crate::overlay::StatModifierOverlay;
use crate::profile::StatProfile;
use crate::states::Signal;
use crate::stats::{StatKind, UpgradeError};

/// Errors from world operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldError {
    /// Handle is stale or was never issued.
    #[error("unknown entity handle {0}")]
    UnknownHandle(EntityHandle),
    /// Entity has no profile and cannot fight.
    #[error("entity {0} is inert")]
    Inert(EntityHandle),
    /// Upgrade rejected.
    #[error(transparent)]
    Upgrade(#[from] UpgradeError),
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;

/// Strike stats of damage with no attacker behind it.
struct Environment;

impl StrikeProfile for Environment {
    fn critical_chance_percent(&self) -> f32 {
        0.0
    }

    fn critical_damage_multiplier(&self) -> f32 {
        1.0
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

fn slot_mut(slots: &mut [Slot], handle: EntityHandle) -> Option<&mut Entity> {
    let slot = slots.get_mut(handle.index() as usize)?;
    if slot.generation != handle.generation() {
        return None;
    }
    slot.entity.as_mut()
}

/// Positions of every living, non-inert entity at one instant.
#[derive(Debug, Clone, Default)]
pub struct PositionSnapshot {
    entries: Vec<(EntityHandle, Vec3, Faction)>,
}

impl PositionSnapshot {
    fn capture(slots: &[Slot]) -> Self {
        let entries = slots
            .iter()
            .filter_map(|s| s.entity.as_ref())
            .filter(|e| e.is_alive())
            .map(|e| (e.handle(), e.position(), e.faction()))
            .collect();
        Self { entries }
    }

    /// Number of entities captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Closest captured entity of `faction` to `from` on the ground plane.
    #[must_use]
    pub fn nearest(&self, from: Vec3, faction: Faction) -> Option<EntityHandle> {
        self.entries
            .iter()
            .filter(|(_, _, f)| *f == faction)
            .min_by(|a, b| {
                ground_distance_squared(from, a.1).total_cmp(&ground_distance_squared(from, b.1))
            })
            .map(|(h, _, _)| *h)
    }

    fn sighting(&self, handle: Option<EntityHandle>) -> Perception {
        let target = handle.and_then(|h| {
            self.position_of(h)
                .map(|position| Sighting { handle: h, position })
        });
        Perception { target }
    }
}

impl TargetLookup for PositionSnapshot {
    fn position_of(&self, handle: EntityHandle) -> Option<Vec3> {
        self.entries
            .iter()
            .find(|(h, _, _)| *h == handle)
            .map(|(_, p, _)| *p)
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TickSummary {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Simulated time after the tick.
    pub time: f32,
    /// Hits resolved.
    pub hits: u32,
    /// Entities removed.
    pub removed: u32,
    /// Living players.
    pub players_alive: u32,
    /// Living enemies.
    pub enemies_alive: u32,
}

/// Owns every entity and advances them in lockstep.
#[derive(Debug)]
pub struct World {
    slots: Vec<Slot>,
    free: Vec<u32>,
    bus: EventBus,
    rng: fastrand::Rng,
    cues: Option<FixedDelayCues>,
    intents: HashMap<EntityHandle, PlayerIntent>,
    time: f32,
    ticks: u64,
}

impl World {
    /// Empty world with a seeded RNG and no cue source.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            bus: EventBus::default(),
            rng: fastrand::Rng::with_seed(seed),
            cues: None,
            intents: HashMap::new(),
            time: 0.0,
            ticks: 0,
        }
    }

    /// Drives effect instants and attack ends from fixed delays.
    #[must_use]
    pub fn with_cues(mut self, timing: CueTiming) -> Self {
        self.cues = Some(FixedDelayCues::new(timing));
        self
    }

    /// Replaces the event bus with one of `capacity`.
    #[must_use]
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus = EventBus::new(capacity);
        self
    }

    /// Simulated time.
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Ticks run so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Event bus.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Drains pending events.
    pub fn drain_events(&self) -> Vec<CombatEvent> {
        self.bus.drain()
    }

    /// Spawns an entity.
    ///
    /// `target` is injected here instead of being searched for. Without a
    /// profile the entity is inert.
    pub fn spawn(
        &mut self,
        faction: Faction,
        profile: Option<Arc<StatProfile>>,
        position: Vec3,
        target: Option<EntityHandle>,
    ) -> EntityHandle {
        let index = if let Some(index) = self.free.pop() {
            index
        } else {
            self.slots.push(Slot::default());
            u32::try_from(self.slots.len() - 1).unwrap_or(u32::MAX)
        };
        let generation = self.slots[index as usize].generation;
        let handle = EntityHandle::new(index, generation);

        let mut entity = Entity::spawn(handle, faction, profile, position);
        let id = entity.id();
        entity.set_target(target);
        if let Some(c) = entity.combatant_mut() {
            let experience = c.profile().behavior.experience_reward;
            let forwarder = HealthForwarder::new(id, experience, self.bus.sender());
            c.health_mut().subscribe(forwarder);
        }
        self.slots[index as usize].entity = Some(entity);
        self.bus.publish(CombatEvent::Spawned {
            entity: id,
            handle,
            faction,
        });
        debug!("Spawned {:?} entity {} at {}", faction, id, handle);
        handle
    }

    /// Borrows an entity.
    #[must_use]
    pub fn get(&self, handle: EntityHandle) -> Option<&Entity> {
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.entity.as_ref()
    }

    /// Mutably borrows an entity.
    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        slot_mut(&mut self.slots, handle)
    }

    /// Whether `handle` names a living entity.
    #[must_use]
    pub fn is_alive(&self, handle: EntityHandle) -> bool {
        self.get(handle).is_some_and(Entity::is_alive)
    }

    /// Entities still in the arena, dead ones included until removal.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().filter_map(|s| s.entity.as_ref())
    }

    /// Number of entities in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Living entities of `faction`.
    #[must_use]
    pub fn alive_count(&self, faction: Faction) -> usize {
        self.iter()
            .filter(|e| e.faction() == faction && e.is_alive())
            .count()
    }

    /// Current position snapshot.
    #[must_use]
    pub fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot::capture(&self.slots)
    }

    /// Sets the device intents a player entity reads on its next tick.
    ///
    /// Pressed edges are consumed by that tick; the movement axis persists.
    pub fn set_player_intent(&mut self, handle: EntityHandle, intent: PlayerIntent) {
        self.intents.insert(handle, intent);
    }

    /// Replaces an entity's target.
    pub fn set_target(&mut self, handle: EntityHandle, target: Option<EntityHandle>) -> WorldResult<()> {
        self.require(handle)?.set_target(target);
        Ok(())
    }

    /// Attaches a stat overlay.
    pub fn attach_overlay(
        &mut self,
        handle: EntityHandle,
        overlay: StatModifierOverlay,
    ) -> WorldResult<()> {
        let c = self
            .require(handle)?
            .combatant_mut()
            .ok_or(WorldError::Inert(handle))?;
        c.attach_overlay(overlay);
        Ok(())
    }

    /// Applies a permanent stat upgrade. Returns the new level.
    pub fn apply_upgrade(
        &mut self,
        handle: EntityHandle,
        stat: StatKind,
        amount: f32,
    ) -> WorldResult<u8> {
        let c = self
            .require(handle)?
            .combatant_mut()
            .ok_or(WorldError::Inert(handle))?;
        Ok(c.apply_upgrade(stat, amount)?)
    }

    /// Registers an extra health listener on an entity.
    pub fn subscribe_health<L: HealthListener + 'static>(
        &mut self,
        handle: EntityHandle,
        listener: L,
    ) -> WorldResult<ListenerId> {
        let c = self
            .require(handle)?
            .combatant_mut()
            .ok_or(WorldError::Inert(handle))?;
        Ok(c.health_mut().subscribe(listener))
    }

    fn require(&mut self, handle: EntityHandle) -> WorldResult<&mut Entity> {
        slot_mut(&mut self.slots, handle).ok_or(WorldError::UnknownHandle(handle))
    }

    /// Starts an attack on the entity's current target.
    pub fn try_attack(&mut self, handle: EntityHandle) -> bool {
        let snapshot = self.snapshot();
        let Some(entity) = slot_mut(&mut self.slots, handle) else {
            return false;
        };
        let started = entity.try_attack(&snapshot);
        self.flush(handle);
        started
    }

    /// Effect-instant entry point: lands the attack `handle` has in flight.
    ///
    /// A no-op returning `None` when the attack was cancelled or already
    /// landed, when the target is gone, or when the target moved out of
    /// reach.
    pub fn deal_damage_at_effect_instant(&mut self, handle: EntityHandle) -> Option<Outcome> {
        self.resolve_strike(handle, None)
    }

    /// Attack-end entry point.
    pub fn end_attack(&mut self, handle: EntityHandle) -> bool {
        let ended = slot_mut(&mut self.slots, handle).is_some_and(|e| e.end_attack(None));
        self.flush(handle);
        ended
    }

    /// Deals environmental damage that never crits.
    pub fn damage(
        &mut self,
        target: EntityHandle,
        amount: f32,
        source: Option<EntityId>,
    ) -> Option<Outcome> {
        let entity = slot_mut(&mut self.slots, target)?;
        let hit = HitInfo::new(entity.position(), Vec3::Y, source);
        let outcome = entity.receive_hit(&Environment, amount, hit, 0.0, &mut self.rng);
        self.flush(target);
        outcome
    }

    /// Heals an entity. Returns the amount restored.
    pub fn heal(&mut self, handle: EntityHandle, amount: f32) -> f32 {
        slot_mut(&mut self.slots, handle).map_or(0.0, |e| e.heal(amount))
    }

    fn resolve_strike(
        &mut self,
        attacker: EntityHandle,
        token: Option<AttackToken>,
    ) -> Option<Outcome> {
        let strike = slot_mut(&mut self.slots, attacker)?.take_strike(token)?;
        let target = strike.target?;
        let defender = slot_mut(&mut self.slots, target)?;
        if !defender.is_alive() {
            return None;
        }
        let distance = ground_distance(strike.origin, defender.position());
        if distance > strike.reach {
            trace!("Strike from {} missed, {} beyond reach {}", attacker, distance, strike.reach);
            return None;
        }
        let outcome = defender.receive_strike(&strike, &mut self.rng);
        self.flush(target);
        outcome
    }

    /// Publishes an entity's pending signals. Returns the attacks whose
    /// effect instant came due.
    fn flush(&mut self, handle: EntityHandle) -> Vec<AttackToken> {
        let Some(entity) = slot_mut(&mut self.slots, handle) else {
            return Vec::new();
        };
        let id = entity.id();
        let mut due = Vec::new();
        for signal in entity.drain_signals() {
            let event = match signal {
                Signal::AttackBegan { token, self_timed } => {
                    if let (false, Some(cues)) = (self_timed, self.cues.as_mut()) {
                        cues.schedule(handle, token);
                    }
                    CombatEvent::AttackBegan { entity: id, token }
                },
                Signal::EffectDue { token } => {
                    due.push(token);
                    continue;
                },
                Signal::AttackEnded { token } => CombatEvent::AttackEnded { entity: id, token },
                Signal::AttackCancelled { token } => {
                    CombatEvent::AttackCancelled { entity: id, token }
                },
                Signal::StateChanged { from, to } => CombatEvent::StateChanged {
                    entity: id,
                    from,
                    to,
                },
            };
            self.bus.publish(event);
        }
        due
    }

    /// Keeps a target that still resolves, otherwise picks the nearest
    /// living opponent.
    fn resolve_target(&mut self, handle: EntityHandle, snapshot: &PositionSnapshot) -> Option<EntityHandle> {
        let entity = slot_mut(&mut self.slots, handle)?;
        let current = entity.target().filter(|t| snapshot.position_of(*t).is_some());
        let target = current.or_else(|| snapshot.nearest(entity.position(), entity.faction().opponent()));
        if target != entity.target() {
            entity.set_target(target);
        }
        target
    }

    /// Advances every entity by `dt`.
    ///
    /// Order: snapshot, then per entity target resolution, state update,
    /// transition, cooldown and physics, then due cues, then removals.
    /// Removal notices go to `sink` after the entity has left the arena.
    pub fn tick<S: RemovalSink + ?Sized>(&mut self, dt: f32, sink: &mut S) -> TickSummary {
        self.ticks += 1;
        self.time += dt;
        let snapshot = self.snapshot();
        let mut summary = TickSummary {
            tick: self.ticks,
            ..TickSummary::default()
        };

        let handles: Vec<EntityHandle> = self.iter().map(Entity::handle).collect();
        let mut removals = Vec::new();
        for handle in handles {
            let alive = self.is_alive(handle);
            let target = if alive {
                self.resolve_target(handle, &snapshot)
            } else {
                None
            };
            let player = self.intents.get(&handle).copied().unwrap_or_default();
            let input = TickInput {
                perception: snapshot.sighting(target),
                player,
            };
            if let Some(intent) = self.intents.get_mut(&handle) {
                *intent = PlayerIntent::moving(intent.move_axis);
            }

            let Some(entity) = slot_mut(&mut self.slots, handle) else {
                continue;
            };
            if entity.tick(dt, &input) {
                removals.push(handle);
            }
            for token in self.flush(handle) {
                if self.resolve_strike(handle, Some(token)).is_some() {
                    summary.hits += 1;
                }
            }
        }

        let due = self.cues.as_mut().map(|c| c.advance(dt)).unwrap_or_default();
        for cue in due {
            match cue.kind {
                CueKind::Effect => {
                    if self.resolve_strike(cue.entity, Some(cue.token)).is_some() {
                        summary.hits += 1;
                    }
                },
                CueKind::End => {
                    if let Some(entity) = slot_mut(&mut self.slots, cue.entity) {
                        entity.end_attack(Some(cue.token));
                    }
                    self.flush(cue.entity);
                },
            }
        }

        for handle in removals {
            if let Some(notice) = self.remove(handle) {
                summary.removed += 1;
                sink.on_removed(&notice);
            }
        }

        summary.time = self.time;
        summary.players_alive = count_u32(self.alive_count(Faction::Player));
        summary.enemies_alive = count_u32(self.alive_count(Faction::Enemy));
        summary
    }

    /// Advances every entity, discarding removal notices.
    pub fn step(&mut self, dt: f32) -> TickSummary {
        self.tick(dt, &mut ())
    }

    fn remove(&mut self, handle: EntityHandle) -> Option<RemovalNotice> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        let entity = slot.entity.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index());
        self.intents.remove(&handle);
        if let Some(cues) = &mut self.cues {
            cues.forget(handle);
        }
        let notice = entity.removal_notice();
        self.bus.publish(CombatEvent::Removed { entity: notice.id });
        debug!("Removed entity {} ({})", notice.id, handle);
        Some(notice)
    }
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
