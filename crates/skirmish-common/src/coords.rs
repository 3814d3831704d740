//! Ground-plane geometry.
//!
//! Positions are full 3D vectors, but every gameplay distance is measured on
//! the XZ ground plane. Height differences never count toward range.

use glam::{Vec2, Vec3};

/// Distance under which two points are treated as coincident.
pub const GROUND_EPSILON: f32 = 1.0e-4;

/// Projects a world position onto the ground plane.
#[must_use]
pub fn flatten(position: Vec3) -> Vec2 {
    Vec2::new(position.x, position.z)
}

/// Squared horizontal distance between two positions.
#[must_use]
pub fn ground_distance_squared(a: Vec3, b: Vec3) -> f32 {
    flatten(a).distance_squared(flatten(b))
}

/// Horizontal distance between two positions.
#[must_use]
pub fn ground_distance(a: Vec3, b: Vec3) -> f32 {
    ground_distance_squared(a, b).sqrt()
}

/// Returns true when `b` lies within `range` of `a` on the ground plane.
///
/// The boundary is inclusive: a target at exactly `range` is in range.
#[must_use]
pub fn within_ground_range(a: Vec3, b: Vec3, range: f32) -> bool {
    ground_distance_squared(a, b) <= range * range
}

/// Unit direction from `from` to `to` on the ground plane, or zero when the
/// points coincide.
#[must_use]
pub fn ground_direction(from: Vec3, to: Vec3) -> Vec3 {
    let delta = Vec3::new(to.x - from.x, 0.0, to.z - from.z);
    if delta.length_squared() < GROUND_EPSILON * GROUND_EPSILON {
        Vec3::ZERO
    } else {
        delta.normalize()
    }
}

/// Lifts a 2D movement axis (x = right, y = forward) into a ground-plane
/// vector, clamped to unit length.
#[must_use]
pub fn axis_to_ground(axis: Vec2) -> Vec3 {
    let clamped = axis.clamp_length_max(1.0);
    Vec3::new(clamped.x, 0.0, clamped.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_vertical_offset_ignored() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 50.0, 4.0);
        assert!((ground_distance(a, b) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_range_boundary_inclusive() {
        let a = Vec3::ZERO;
        let b = Vec3::new(2.0, 0.0, 0.0);
        assert!(within_ground_range(a, b, 2.0));
        assert!(!within_ground_range(a, b, 1.99));
        assert!(within_ground_range(a, a, 0.0));
    }

    #[test]
    fn test_direction_of_coincident_points_is_zero() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(ground_direction(p, p + Vec3::Y), Vec3::ZERO);
    }

    #[test]
    fn test_axis_clamped() {
        let v = axis_to_ground(Vec2::new(3.0, 4.0));
        assert!((v.length() - 1.0).abs() < 1e-5);
        assert_eq!(v.y, 0.0);
    }

    proptest! {
        #[test]
        fn prop_direction_is_flat_unit(x in -100.0f32..100.0, y in -100.0f32..100.0, z in -100.0f32..100.0) {
            let d = ground_direction(Vec3::ZERO, Vec3::new(x, y, z));
            prop_assert_eq!(d.y, 0.0);
            if d != Vec3::ZERO {
                prop_assert!((d.length() - 1.0).abs() < 1e-4);
            }
        }
    }
}
