//! Per-tick inputs fed into entities by external drivers.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use skirmish_common::EntityHandle;

/// Read-only position lookup of other entities.
///
/// Implementations return `None` for handles that are stale or whose entity
/// is no longer a valid target.
pub trait TargetLookup {
    /// Position of a live entity.
    fn position_of(&self, handle: EntityHandle) -> Option<Vec3>;
}

/// A resolved opponent as seen this tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    /// Opponent handle.
    pub handle: EntityHandle,
    /// Opponent position this tick.
    pub position: Vec3,
}

/// What the AI/targeting collaborator resolved for one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Perception {
    /// Current opponent, if any is alive.
    pub target: Option<Sighting>,
}

impl Perception {
    /// Perception of a single opponent.
    #[must_use]
    pub fn of(handle: EntityHandle, position: Vec3) -> Self {
        Self {
            target: Some(Sighting { handle, position }),
        }
    }
}

impl TargetLookup for Perception {
    fn position_of(&self, handle: EntityHandle) -> Option<Vec3> {
        self.target
            .filter(|s| s.handle == handle)
            .map(|s| s.position)
    }
}

/// Player-device intents, already reduced to edges and an axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerIntent {
    /// Movement axis (x = right, y = forward).
    pub move_axis: Vec2,
    /// Basic attack pressed this tick.
    pub attack_pressed: bool,
    /// Charged attack pressed this tick.
    pub charge_pressed: bool,
    /// Roll pressed this tick.
    pub roll_pressed: bool,
}

impl PlayerIntent {
    /// Intent that only moves.
    #[must_use]
    pub fn moving(axis: Vec2) -> Self {
        Self {
            move_axis: axis,
            ..Self::default()
        }
    }

    /// Whether the axis asks for movement.
    #[must_use]
    pub fn wants_move(&self) -> bool {
        self.move_axis.length_squared() > 1.0e-4
    }
}

/// Everything an entity reads during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    /// Resolved opponent.
    pub perception: Perception,
    /// Device intents (ignored by AI entities).
    pub player: PlayerIntent,
}

impl TickInput {
    /// Input carrying only a perception.
    #[must_use]
    pub fn sees(perception: Perception) -> Self {
        Self {
            perception,
            player: PlayerIntent::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perception_lookup_only_knows_its_target() {
        let handle = EntityHandle::new(4, 2);
        let perception = Perception::of(handle, Vec3::X);
        assert_eq!(perception.position_of(handle), Some(Vec3::X));
        assert_eq!(perception.position_of(EntityHandle::new(4, 1)), None);
        assert_eq!(Perception::default().position_of(handle), None);
    }

    #[test]
    fn test_wants_move() {
        assert!(!PlayerIntent::default().wants_move());
        assert!(PlayerIntent::moving(Vec2::Y).wants_move());
    }
}
