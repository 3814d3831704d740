//! Scripted stand-in for a human player.
//!
//! Walks toward its target (the nearest enemy when it has none), attacks in
//! range, opens with a charged attack against fresh targets and rolls away
//! when badly hurt.

use glam::Vec2;
use skirmish_common::{ground_direction, ground_distance, EntityHandle};
use skirmish_gameplay::{Faction, PlayerIntent, World};

/// Health fraction under which the pilot rolls away from its target.
const PANIC_HEALTH: f32 = 0.3;

/// Produces one [`PlayerIntent`] per tick.
#[derive(Debug, Default)]
pub struct Autopilot {
    last_target: Option<EntityHandle>,
}

impl Autopilot {
    /// New pilot with no target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides the player's intent for the next tick.
    pub fn decide(&mut self, world: &World, player: EntityHandle) -> PlayerIntent {
        let Some(me) = world.get(player) else {
            return PlayerIntent::default();
        };
        let Some(combatant) = me.combatant() else {
            return PlayerIntent::default();
        };
        if !me.is_alive() {
            return PlayerIntent::default();
        }

        let target = me
            .target()
            .filter(|t| world.is_alive(*t))
            .or_else(|| world.snapshot().nearest(me.position(), Faction::Enemy));
        let Some(target) = target else {
            self.last_target = None;
            return PlayerIntent::default();
        };
        let Some(enemy) = world.get(target) else {
            return PlayerIntent::default();
        };

        let toward = ground_direction(me.position(), enemy.position());
        let axis = Vec2::new(toward.x, toward.z);
        let distance = ground_distance(me.position(), enemy.position());
        let range = combatant.effective().attack_range();
        let fresh = self.last_target != Some(target);
        self.last_target = Some(target);

        if combatant.health().percent() < PANIC_HEALTH && distance <= range {
            return PlayerIntent {
                move_axis: -axis,
                roll_pressed: true,
                ..PlayerIntent::default()
            };
        }
        if distance > range {
            return PlayerIntent::moving(axis);
        }
        PlayerIntent {
            charge_pressed: fresh,
            attack_pressed: !fresh,
            ..PlayerIntent::default()
        }
    }
}
