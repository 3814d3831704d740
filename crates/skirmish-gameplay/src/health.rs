//! Health model with observer notifications.
//!
//! This module provides:
//! - Current/max health with an idempotent death flag
//! - Damage entry point that defers evasion, crit and defense to a resolver
//! - Heal and max-health growth
//! - A listener registry for damaged/evaded/healed/death notifications

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use skirmish_common::EntityId;
use tracing::debug;

use crate::damage::Outcome;

/// Where and from whom a hit arrived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitInfo {
    /// Contact point in world space.
    pub point: Vec3,
    /// Surface normal at the contact point.
    pub normal: Vec3,
    /// Attacking entity, if any.
    pub source: Option<EntityId>,
}

impl HitInfo {
    /// Hit with no geometry and no source.
    pub const NONE: Self = Self {
        point: Vec3::ZERO,
        normal: Vec3::Y,
        source: None,
    };

    /// Hit from `source` at `point`.
    #[must_use]
    pub fn new(point: Vec3, normal: Vec3, source: Option<EntityId>) -> Self {
        Self {
            point,
            normal,
            source,
        }
    }
}

impl Default for HitInfo {
    fn default() -> Self {
        Self::NONE
    }
}

/// Notification raised by a [`HealthModel`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HealthEvent {
    /// A hit landed; `amount` is what was actually subtracted.
    Damaged {
        /// Applied damage
        amount: f32,
        /// Hit geometry and source
        hit: HitInfo,
        /// Whether the hit was critical
        critical: bool,
    },
    /// A hit was evaded; `amount` is the incoming raw damage.
    Evaded {
        /// Incoming damage
        amount: f32,
        /// Hit geometry and source
        hit: HitInfo,
    },
    /// Health was restored.
    Healed {
        /// Health actually restored
        amount: f32,
    },
    /// Health reached zero. Raised once per model.
    Died {
        /// Source of the lethal hit
        killer: Option<EntityId>,
    },
}

/// Receives health notifications.
pub trait HealthListener {
    /// Handles one event.
    fn on_health_event(&mut self, event: &HealthEvent);
}

impl<F: FnMut(&HealthEvent)> HealthListener for F {
    fn on_health_event(&mut self, event: &HealthEvent) {
        self(event);
    }
}

/// Token returned by [`HealthModel::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

#[derive(Default)]
struct HealthObservers {
    listeners: Vec<(ListenerId, Box<dyn HealthListener>)>,
    next_id: u32,
}

impl HealthObservers {
    fn subscribe(&mut self, listener: Box<dyn HealthListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: &HealthEvent) {
        for (_, listener) in &mut self.listeners {
            listener.on_health_event(event);
        }
    }
}

/// Current and max health of one entity.
pub struct HealthModel {
    current: f32,
    max: f32,
    dead: bool,
    last_source: Option<EntityId>,
    observers: HealthObservers,
}

impl fmt::Debug for HealthModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthModel")
            .field("current", &self.current)
            .field("max", &self.max)
            .field("dead", &self.dead)
            .field("listeners", &self.observers.listeners.len())
            .finish()
    }
}

impl HealthModel {
    /// Creates a model at full health.
    #[must_use]
    pub fn new(max: f32) -> Self {
        let max = max.max(0.0);
        Self {
            current: max,
            max,
            dead: max <= 0.0,
            last_source: None,
            observers: HealthObservers::default(),
        }
    }

    /// Current health.
    #[must_use]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Maximum health.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Health fraction (0.0-1.0).
    #[must_use]
    pub fn percent(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }

    /// Whether the entity is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.dead && self.current > 0.0
    }

    /// Whether death has been raised.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Source of the most recent landed hit.
    #[must_use]
    pub fn last_source(&self) -> Option<EntityId> {
        self.last_source
    }

    /// Registers a listener.
    pub fn subscribe<L: HealthListener + 'static>(&mut self, listener: L) -> ListenerId {
        self.observers.subscribe(Box::new(listener))
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Delivers a hit of `amount` raw damage.
    ///
    /// `resolve` decides evasion, crit and absorption for the raw amount and
    /// is only consulted while the entity is alive. Returns true iff the hit
    /// landed (was not evaded), even when defense absorbed all of it.
    pub fn take_damage<F>(&mut self, amount: f32, hit: HitInfo, resolve: F) -> bool
    where
        F: FnOnce(f32) -> Outcome,
    {
        if !self.is_alive() {
            return false;
        }

        match resolve(amount) {
            Outcome::Evaded => {
                self.observers.emit(&HealthEvent::Evaded { amount, hit });
                false
            },
            Outcome::Hit {
                final_damage,
                is_critical,
            } => {
                let applied = final_damage.max(0.0).min(self.current);
                self.current -= applied;
                if hit.source.is_some() {
                    self.last_source = hit.source;
                }
                self.observers.emit(&HealthEvent::Damaged {
                    amount: applied,
                    hit,
                    critical: is_critical,
                });
                if self.current <= 0.0 {
                    self.die(hit.source);
                }
                true
            },
        }
    }

    /// Restores health up to max. Returns the amount restored.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if !self.is_alive() || amount <= 0.0 {
            return 0.0;
        }
        let before = self.current;
        self.current = (self.current + amount).min(self.max);
        let healed = self.current - before;
        if healed > 0.0 {
            self.observers.emit(&HealthEvent::Healed { amount: healed });
        }
        healed
    }

    /// Grows max health.
    ///
    /// With `heal_to_full` the entity is topped up to the new max; otherwise
    /// current health is left untouched.
    pub fn increase_max_health(&mut self, amount: f32, heal_to_full: bool) {
        if amount <= 0.0 {
            return;
        }
        self.max += amount;
        if heal_to_full && !self.dead {
            self.current = self.max;
        }
    }

    /// Kills the entity outright. No-op if already dead.
    pub fn kill(&mut self, killer: Option<EntityId>) {
        self.current = 0.0;
        self.die(killer);
    }

    fn die(&mut self, killer: Option<EntityId>) {
        if self.dead {
            return;
        }
        self.dead = true;
        debug!("Health depleted, killer {:?}", killer);
        self.observers.emit(&HealthEvent::Died { killer });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn landed(damage: f32) -> impl FnOnce(f32) -> Outcome {
        move |_| Outcome::Hit {
            final_damage: damage,
            is_critical: false,
        }
    }

    fn recorder(model: &mut HealthModel) -> Rc<RefCell<Vec<HealthEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        model.subscribe(move |e: &HealthEvent| sink.borrow_mut().push(*e));
        log
    }

    #[test]
    fn test_new_is_full() {
        let h = HealthModel::new(100.0);
        assert_eq!(h.current(), 100.0);
        assert_eq!(h.max(), 100.0);
        assert!(h.is_alive());
        assert_eq!(h.percent(), 1.0);
    }

    #[test]
    fn test_damage_never_goes_negative() {
        let mut h = HealthModel::new(30.0);
        assert!(h.take_damage(500.0, HitInfo::NONE, landed(500.0)));
        assert_eq!(h.current(), 0.0);
        assert!(h.is_dead());
    }

    #[test]
    fn test_evaded_hit_changes_nothing() {
        let mut h = HealthModel::new(50.0);
        let log = recorder(&mut h);

        assert!(!h.take_damage(20.0, HitInfo::NONE, |_| Outcome::Evaded));
        assert_eq!(h.current(), 50.0);
        assert_eq!(
            log.borrow().as_slice(),
            &[HealthEvent::Evaded {
                amount: 20.0,
                hit: HitInfo::NONE
            }]
        );
    }

    #[test]
    fn test_death_fires_once() {
        let mut h = HealthModel::new(10.0);
        let log = recorder(&mut h);
        let killer = Some(EntityId::from_raw(7));
        let hit = HitInfo::new(Vec3::ZERO, Vec3::Y, killer);

        assert!(h.take_damage(10.0, hit, landed(10.0)));
        assert!(!h.take_damage(10.0, hit, landed(10.0)));
        h.kill(None);

        let deaths = log
            .borrow()
            .iter()
            .filter(|e| matches!(e, HealthEvent::Died { .. }))
            .count();
        assert_eq!(deaths, 1);
        assert!(log.borrow().contains(&HealthEvent::Died { killer }));
    }

    #[test]
    fn test_dead_entity_does_not_consult_resolver() {
        let mut h = HealthModel::new(1.0);
        h.kill(None);
        let mut consulted = false;
        let landed = h.take_damage(5.0, HitInfo::NONE, |_| {
            consulted = true;
            Outcome::Evaded
        });
        assert!(!landed);
        assert!(!consulted);
    }

    #[test]
    fn test_heal_clamps() {
        let mut h = HealthModel::new(100.0);
        h.take_damage(30.0, HitInfo::NONE, landed(30.0));
        let log = recorder(&mut h);
        assert_eq!(h.heal(50.0), 30.0);
        assert_eq!(h.current(), 100.0);
        assert_eq!(h.heal(10.0), 0.0);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_increase_max_health_keeps_current() {
        let mut h = HealthModel::new(100.0);
        h.take_damage(50.0, HitInfo::NONE, landed(50.0));
        h.increase_max_health(50.0, false);
        assert_eq!(h.current(), 50.0);
        assert_eq!(h.max(), 150.0);
    }

    #[test]
    fn test_increase_max_health_heal_to_full() {
        let mut h = HealthModel::new(100.0);
        h.take_damage(50.0, HitInfo::NONE, landed(50.0));
        h.increase_max_health(50.0, true);
        assert_eq!(h.current(), 150.0);
        assert_eq!(h.max(), 150.0);
    }

    #[test]
    fn test_unsubscribe() {
        let mut h = HealthModel::new(100.0);
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let id = h.subscribe(move |_: &HealthEvent| *c.borrow_mut() += 1);

        h.heal(1.0);
        h.take_damage(1.0, HitInfo::NONE, landed(1.0));
        assert!(h.unsubscribe(id));
        assert!(!h.unsubscribe(id));
        h.take_damage(1.0, HitInfo::NONE, landed(1.0));
        assert_eq!(*count.borrow(), 1);
    }
}
