//! Kinematic body of an entity.
//!
//! Collision is out of scope here; bodies move freely on the ground plane and
//! the physics collaborator corrects positions afterwards.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use skirmish_common::{ground_direction, ground_distance, GROUND_EPSILON};

/// Knockback speed lost per second, as a fraction.
const KNOCKBACK_DAMPING: f32 = 8.0;

/// Position, facing and transient motion of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Current position.
    pub position: Vec3,
    /// Spawn point, where AI returns when it gives up a chase.
    pub home: Vec3,
    /// Unit facing on the ground plane.
    pub facing: Vec3,
    /// Residual knockback velocity.
    pub knockback: Vec3,
    /// Seconds until the next roll is allowed.
    pub roll_cooldown: f32,
}

impl Body {
    /// Body standing at `position`, which also becomes home.
    #[must_use]
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            home: position,
            facing: Vec3::Z,
            knockback: Vec3::ZERO,
            roll_cooldown: 0.0,
        }
    }

    /// Distance to a point on the ground plane.
    #[must_use]
    pub fn distance_to(&self, point: Vec3) -> f32 {
        ground_distance(self.position, point)
    }

    /// Distance from home on the ground plane.
    #[must_use]
    pub fn distance_from_home(&self) -> f32 {
        ground_distance(self.position, self.home)
    }

    /// Rotates facing toward `direction`, at most `turn_speed * dt` radians.
    pub fn turn_toward(&mut self, direction: Vec3, turn_speed: f32, dt: f32) {
        let desired = Vec3::new(direction.x, 0.0, direction.z);
        if desired.length_squared() < GROUND_EPSILON {
            return;
        }
        let desired = desired.normalize();
        let current = self.facing.z.atan2(self.facing.x);
        let target = desired.z.atan2(desired.x);
        let mut delta = target - current;
        while delta > std::f32::consts::PI {
            delta -= std::f32::consts::TAU;
        }
        while delta < -std::f32::consts::PI {
            delta += std::f32::consts::TAU;
        }
        let step = turn_speed.max(0.0) * dt;
        let angle = if delta.abs() <= step {
            target
        } else {
            current + step * delta.signum()
        };
        self.facing = Vec3::new(angle.cos(), 0.0, angle.sin());
    }

    /// Moves along a ground direction at `speed` for `dt`.
    pub fn move_along(&mut self, direction: Vec3, speed: f32, dt: f32) {
        let dir = Vec3::new(direction.x, 0.0, direction.z);
        self.position += dir * speed * dt;
    }

    /// Walks toward `target`, stopping `stop_distance` short of it.
    ///
    /// Returns true once within `stop_distance`.
    pub fn move_toward(&mut self, target: Vec3, speed: f32, stop_distance: f32, dt: f32) -> bool {
        let dist = self.distance_to(target);
        if dist <= stop_distance {
            return true;
        }
        let dir = ground_direction(self.position, target);
        let step = (speed * dt).min(dist - stop_distance);
        self.position += dir * step;
        dist - step <= stop_distance
    }

    /// Adds a knockback impulse along the ground plane.
    pub fn push(&mut self, direction: Vec3, impulse: f32) {
        let dir = Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero();
        self.knockback += dir * impulse;
    }

    /// Integrates residual knockback and counts down timers.
    pub fn tick(&mut self, dt: f32) {
        if self.knockback.length_squared() > GROUND_EPSILON {
            self.position += self.knockback * dt;
            self.knockback *= (1.0 - KNOCKBACK_DAMPING * dt).max(0.0);
        } else {
            self.knockback = Vec3::ZERO;
        }
        self.roll_cooldown = (self.roll_cooldown - dt).max(0.0);
    }

    /// Clears transient motion, used when the entity stops acting.
    pub fn halt(&mut self) {
        self.knockback = Vec3::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_toward_stops_short() {
        let mut body = Body::at(Vec3::ZERO);
        let target = Vec3::new(10.0, 0.0, 0.0);
        let mut arrived = false;
        for _ in 0..100 {
            arrived = body.move_toward(target, 5.0, 2.0, 0.1);
            if arrived {
                break;
            }
        }
        assert!(arrived);
        assert!((body.distance_to(target) - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_turn_is_rate_limited() {
        let mut body = Body::at(Vec3::ZERO);
        body.facing = Vec3::X;
        body.turn_toward(-Vec3::X, std::f32::consts::FRAC_PI_2, 1.0);
        // a quarter turn from +X lands on the Z axis
        assert!(body.facing.x.abs() < 1e-4);
        body.turn_toward(-Vec3::X, std::f32::consts::PI, 1.0);
        assert!((body.facing.x + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_knockback_decays() {
        let mut body = Body::at(Vec3::ZERO);
        body.push(Vec3::X, 4.0);
        for _ in 0..60 {
            body.tick(1.0 / 60.0);
        }
        assert!(body.position.x > 0.0);
        assert_eq!(body.knockback, Vec3::ZERO);
    }

    #[test]
    fn test_home_distance() {
        let mut body = Body::at(Vec3::new(1.0, 0.0, 1.0));
        body.move_along(Vec3::X, 3.0, 1.0);
        assert!((body.distance_from_home() - 3.0).abs() < 1e-5);
    }
}
