//! Numerically guarded vector helpers shared by the solver, gait and
//! stabilizer.
//!
//! Every helper here tolerates zero-length input: a direction that cannot be
//! normalized yields `None` (or the identity rotation / a zero angle), so
//! coincident joints never inject NaN into a solve.

use std::f32::consts::PI;

use nalgebra::{Unit, UnitQuaternion, Vector3};

/// Minimum norm a vector must have to be treated as a direction.
pub const DIRECTION_EPSILON: f32 = 1e-6;

/// World up axis. Arachne is Z-up.
pub fn world_up() -> Vector3<f32> {
    Vector3::z()
}

/// Up axis of a body with the given orientation.
pub fn up_axis(rotation: &UnitQuaternion<f32>) -> Vector3<f32> {
    rotation * world_up()
}

/// Normalize `v`, or `None` if it is too short to carry a direction.
pub fn try_direction(v: &Vector3<f32>) -> Option<Vector3<f32>> {
    v.try_normalize(DIRECTION_EPSILON)
}

/// Normalize `v`, falling back to `fallback` when `v` is degenerate.
pub fn direction_or(v: &Vector3<f32>, fallback: &Vector3<f32>) -> Vector3<f32> {
    try_direction(v)
        .or_else(|| try_direction(fallback))
        .unwrap_or_else(Vector3::zeros)
}

/// Some unit vector perpendicular to `v`.
pub fn any_perpendicular(v: &Vector3<f32>) -> Vector3<f32> {
    let candidate = if v.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    direction_or(&v.cross(&candidate), &Vector3::z())
}

/// Shortest rotation mapping direction `from` onto direction `to`.
///
/// Degenerate inputs give the identity. Opposite directions give a half turn
/// about an arbitrary perpendicular axis.
pub fn from_to_rotation(from: &Vector3<f32>, to: &Vector3<f32>) -> UnitQuaternion<f32> {
    let (Some(a), Some(b)) = (try_direction(from), try_direction(to)) else {
        return UnitQuaternion::identity();
    };
    if let Some(rotation) = UnitQuaternion::rotation_between(&a, &b) {
        return rotation;
    }
    let axis = Unit::new_normalize(any_perpendicular(&a));
    UnitQuaternion::from_axis_angle(&axis, PI)
}

/// Signed angle (radians) from `from` to `to`, measured about `axis`.
///
/// Positive when `from × to` points along `axis`. Zero if either vector is
/// degenerate.
pub fn signed_angle(from: &Vector3<f32>, to: &Vector3<f32>, axis: &Vector3<f32>) -> f32 {
    if try_direction(from).is_none() || try_direction(to).is_none() {
        return 0.0;
    }
    let cross = from.cross(to);
    let angle = cross.norm().atan2(from.dot(to));
    if axis.dot(&cross) < 0.0 { -angle } else { angle }
}

/// Closest point to `point` on the plane through `origin` with unit `normal`.
pub fn project_on_plane(
    point: &Vector3<f32>,
    origin: &Vector3<f32>,
    normal: &Vector3<f32>,
) -> Vector3<f32> {
    point - normal * normal.dot(&(point - origin))
}

/// Hermite smoothstep of `x` between `edge0` and `edge1`, clamped to [0, 1].
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * 2.0f32.mul_add(-t, 3.0)
}

/// Foot lift profile over a step: smoothstep up over the first half,
/// smoothstep down over the second. Zero at both ends, one at `t = 0.5`.
pub fn lift_arc(t: f32) -> f32 {
    if t < 0.5 {
        smoothstep(0.0, 0.5, t)
    } else {
        1.0 - smoothstep(0.5, 1.0, t)
    }
}
