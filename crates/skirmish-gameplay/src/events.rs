//! Event bus for outward combat notifications.

use crossbeam_channel::{bounded, Receiver, Sender};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use skirmish_common::{EntityHandle, EntityId};

use crate::combat::AttackToken;
use crate::entity::Faction;
use crate::health::{HealthEvent, HealthListener};
use crate::state_machine::StateId;

/// Events published for presentation, audio and progression consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// Entity spawned
    Spawned {
        /// Entity ID
        entity: EntityId,
        /// Arena handle
        handle: EntityHandle,
        /// Side
        faction: Faction,
    },
    /// Entity removed from the world
    Removed {
        /// Entity ID
        entity: EntityId,
    },
    /// Entity took damage
    Damaged {
        /// Entity ID
        entity: EntityId,
        /// Damage applied
        amount: f32,
        /// Contact point
        point: Vec3,
        /// Contact normal
        normal: Vec3,
        /// Source entity (if any)
        source: Option<EntityId>,
        /// Whether the hit was critical
        critical: bool,
    },
    /// Entity evaded a hit
    Evaded {
        /// Entity ID
        entity: EntityId,
        /// Incoming damage
        amount: f32,
        /// Source entity (if any)
        source: Option<EntityId>,
    },
    /// Entity healed
    Healed {
        /// Entity ID
        entity: EntityId,
        /// Health restored
        amount: f32,
    },
    /// Entity died
    Died {
        /// Entity ID
        entity: EntityId,
        /// Source of the lethal hit
        killer: Option<EntityId>,
        /// Experience the kill is worth
        experience: u32,
    },
    /// Attack started
    AttackBegan {
        /// Attacker
        entity: EntityId,
        /// Attack token
        token: AttackToken,
    },
    /// Attack finished normally
    AttackEnded {
        /// Attacker
        entity: EntityId,
        /// Attack token
        token: AttackToken,
    },
    /// Attack abandoned before its end
    AttackCancelled {
        /// Attacker
        entity: EntityId,
        /// Attack token
        token: AttackToken,
    },
    /// State machine changed state
    StateChanged {
        /// Entity ID
        entity: EntityId,
        /// Previous state
        from: StateId,
        /// New state
        to: StateId,
    },
    /// A wave spawned
    WaveStarted {
        /// Wave number, starting at 1
        wave: u32,
        /// Members spawned
        size: usize,
    },
    /// Every member of a wave has been removed
    WaveCleared {
        /// Wave number
        wave: u32,
    },
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<CombatEvent>,
    /// Receiver for collecting events
    receiver: Receiver<CombatEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            capacity: capacity.max(1),
        }
    }

    /// Publishes an event. Dropped if the bus is full.
    pub fn publish(&self, event: CombatEvent) {
        let _ = self.sender.try_send(event);
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<CombatEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<CombatEvent> {
        self.sender.clone()
    }
}

/// Health listener that republishes one entity's notifications on the bus.
#[derive(Debug, Clone)]
pub struct HealthForwarder {
    entity: EntityId,
    experience: u32,
    sender: Sender<CombatEvent>,
}

impl HealthForwarder {
    /// Forwarder for `entity`, whose death is worth `experience`.
    #[must_use]
    pub fn new(entity: EntityId, experience: u32, sender: Sender<CombatEvent>) -> Self {
        Self {
            entity,
            experience,
            sender,
        }
    }
}

impl HealthListener for HealthForwarder {
    fn on_health_event(&mut self, event: &HealthEvent) {
        let entity = self.entity;
        let out = match *event {
            HealthEvent::Damaged {
                amount,
                hit,
                critical,
            } => CombatEvent::Damaged {
                entity,
                amount,
                point: hit.point,
                normal: hit.normal,
                source: hit.source,
                critical,
            },
            HealthEvent::Evaded { amount, hit } => CombatEvent::Evaded {
                entity,
                amount,
                source: hit.source,
            },
            HealthEvent::Healed { amount } => CombatEvent::Healed { entity, amount },
            HealthEvent::Died { killer } => CombatEvent::Died {
                entity,
                killer,
                experience: self.experience,
            },
        };
        let _ = self.sender.try_send(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HitInfo;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(8);
        bus.publish(CombatEvent::Removed {
            entity: EntityId::from_raw(1),
        });
        bus.publish(CombatEvent::WaveCleared { wave: 2 });
        assert_eq!(bus.pending_count(), 2);

        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops() {
        let bus = EventBus::new(1);
        bus.publish(CombatEvent::WaveCleared { wave: 1 });
        bus.publish(CombatEvent::WaveCleared { wave: 2 });
        assert_eq!(bus.drain(), vec![CombatEvent::WaveCleared { wave: 1 }]);
    }

    #[test]
    fn test_forwarder_tags_entity() {
        let bus = EventBus::new(8);
        let id = EntityId::from_raw(5);
        let killer = EntityId::from_raw(9);
        let mut forwarder = HealthForwarder::new(id, 25, bus.sender());

        forwarder.on_health_event(&HealthEvent::Evaded {
            amount: 3.0,
            hit: HitInfo::new(Vec3::ZERO, Vec3::Y, Some(killer)),
        });
        forwarder.on_health_event(&HealthEvent::Died {
            killer: Some(killer),
        });

        let events = bus.drain();
        assert_eq!(
            events[0],
            CombatEvent::Evaded {
                entity: id,
                amount: 3.0,
                source: Some(killer)
            }
        );
        assert_eq!(
            events[1],
            CombatEvent::Died {
                entity: id,
                killer: Some(killer),
                experience: 25
            }
        );
    }
}
