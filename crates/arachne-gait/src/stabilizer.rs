//! Body pose correction from aggregated limb state.
//!
//! The body is pulled along its up axis toward a fixed height above the mean
//! foot position, then tilted toward the mean contact normal at a bounded
//! angular rate. The externally supplied yaw delta is applied either before
//! the correction, about world up, or after it, about the corrected body up
//! (see [`YawOrder`]).

use nalgebra::{Isometry3, Unit, UnitQuaternion, Vector3};

use arachne_core::config::{BodyConfig, YawOrder};
use arachne_core::math::{direction_or, from_to_rotation, up_axis, world_up};

use crate::limb::Limb;

/// Mean foot position and mean contact normal of a set of limbs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactAverage {
    pub position: Vector3<f32>,
    /// Unit length, or the fallback up axis if the normals cancel.
    pub normal: Vector3<f32>,
}

impl ContactAverage {
    /// `None` for an empty limb set.
    pub fn of(limbs: &[Limb], fallback_up: &Vector3<f32>) -> Option<Self> {
        if limbs.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = limbs.len() as f32;
        let (position_sum, normal_sum) = limbs.iter().fold(
            (Vector3::zeros(), Vector3::zeros()),
            |(p, n), limb| (p + limb.foot(), n + limb.sensor().normal()),
        );
        Some(Self {
            position: position_sum / count,
            normal: direction_or(&(normal_sum / count), fallback_up),
        })
    }
}

/// Writes the body pose once per tick.
#[derive(Debug, Clone, Default)]
pub struct BodyStabilizer {
    config: BodyConfig,
}

impl BodyStabilizer {
    pub const fn new(config: BodyConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &BodyConfig {
        &self.config
    }

    /// Correct `body` from `limbs` and apply `yaw_delta` (radians).
    pub fn stabilize(&self, limbs: &[Limb], body: &mut Isometry3<f32>, yaw_delta: f32, dt: f32) {
        if self.config.yaw_order == YawOrder::BeforeAlign {
            apply_yaw(body, &world_up(), yaw_delta);
        }

        if let Some(average) = ContactAverage::of(limbs, &up_axis(&body.rotation)) {
            self.correct_height(body, &average.position, dt);
            self.align_up(body, &average.normal, dt);
        }

        if self.config.yaw_order == YawOrder::AfterAlign {
            let up = up_axis(&body.rotation);
            apply_yaw(body, &up, yaw_delta);
        }
    }

    /// Move along body up toward `foot_mean + up * height_offset`.
    ///
    /// Speed grows with the squared offset, clamped to the configured range,
    /// and never carries the body past the target.
    fn correct_height(&self, body: &mut Isometry3<f32>, foot_mean: &Vector3<f32>, dt: f32) {
        let up = up_axis(&body.rotation);
        let target = foot_mean + up * self.config.height_offset;
        let offset = up.dot(&(target - body.translation.vector));
        let distance = offset.abs();
        if distance <= f32::EPSILON {
            return;
        }
        let speed = (distance * distance).clamp(self.config.correction_min, self.config.correction_max);
        let step = (speed * dt).min(distance);
        body.translation.vector += up * step.copysign(offset);
    }

    /// Turn body up toward `normal` by at most `rotate_rate * dt` radians.
    fn align_up(&self, body: &mut Isometry3<f32>, normal: &Vector3<f32>, dt: f32) {
        let up = up_axis(&body.rotation);
        let max_angle = self.config.rotate_rate * dt;
        let Some((axis, angle)) = from_to_rotation(&up, normal).axis_angle() else {
            return;
        };
        let turn = UnitQuaternion::from_axis_angle(&axis, angle.min(max_angle));
        body.rotation = turn * body.rotation;
    }
}

fn apply_yaw(body: &mut Isometry3<f32>, axis: &Vector3<f32>, yaw_delta: f32) {
    if yaw_delta == 0.0 {
        return;
    }
    let axis = Unit::new_normalize(*axis);
    body.rotation = UnitQuaternion::from_axis_angle(&axis, yaw_delta) * body.rotation;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use arachne_core::config::SensorConfig;
    use arachne_ik::KinematicChain;
    use arachne_test_utils::ground::SlopedGround;
    use std::f32::consts::FRAC_PI_2;

    use crate::sensor::GroundSensor;

    /// One limb whose foot sits at `foot` under a body at the origin.
    fn limb_at(foot: Vector3<f32>) -> Limb {
        let body = Isometry3::identity();
        let skeleton = [
            Isometry3::translation(foot.x, foot.y, foot.z + 1.0),
            Isometry3::translation(foot.x + 0.3, foot.y, foot.z + 1.2),
            Isometry3::translation(foot.x, foot.y, foot.z),
        ];
        let chain = KinematicChain::from_bind_pose(&skeleton, UnitQuaternion::identity(), 2).unwrap();
        let sensor = GroundSensor::new(SensorConfig::default(), &body, foot);
        Limb::new("leg", chain, sensor, body, None)
    }

    fn config() -> BodyConfig {
        BodyConfig {
            height_offset: 1.0,
            correction_min: 0.1,
            correction_max: 4.0,
            rotate_rate: 1.0,
            yaw_order: YawOrder::AfterAlign,
            move_speed: 1.0,
        }
    }

    #[test]
    fn average_of_empty_is_none() {
        assert!(ContactAverage::of(&[], &Vector3::z()).is_none());
    }

    #[test]
    fn average_position_and_normal() {
        let limbs = vec![
            limb_at(Vector3::new(1.0, 0.0, 0.0)),
            limb_at(Vector3::new(-1.0, 0.0, 0.5)),
        ];
        let average = ContactAverage::of(&limbs, &Vector3::z()).unwrap();
        assert_relative_eq!(average.position, Vector3::new(0.0, 0.0, 0.25), epsilon = 1e-6);
        assert_relative_eq!(average.normal, Vector3::z(), epsilon = 1e-6);
    }

    #[test]
    fn far_body_moves_at_max_speed() {
        let limbs = vec![limb_at(Vector3::zeros())];
        let mut body = Isometry3::translation(0.0, 0.0, 5.0);
        BodyStabilizer::new(config()).stabilize(&limbs, &mut body, 0.0, 0.1);
        // 4 units off: speed clamps to 4, step 0.4
        assert_relative_eq!(body.translation.z, 4.6, epsilon = 1e-5);
    }

    #[test]
    fn near_body_moves_at_min_speed() {
        let limbs = vec![limb_at(Vector3::zeros())];
        let mut body = Isometry3::translation(0.0, 0.0, 1.1);
        BodyStabilizer::new(config()).stabilize(&limbs, &mut body, 0.0, 0.1);
        // 0.1 off: 0.01 clamps up to 0.1, step 0.01
        assert_relative_eq!(body.translation.z, 1.09, epsilon = 1e-5);
    }

    #[test]
    fn correction_never_overshoots() {
        let limbs = vec![limb_at(Vector3::zeros())];
        let mut body = Isometry3::translation(0.0, 0.0, 0.9);
        BodyStabilizer::new(config()).stabilize(&limbs, &mut body, 0.0, 10.0);
        assert_relative_eq!(body.translation.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn correction_only_along_up() {
        let limbs = vec![limb_at(Vector3::new(3.0, 2.0, 0.0))];
        let mut body = Isometry3::translation(0.0, 0.0, 2.0);
        BodyStabilizer::new(config()).stabilize(&limbs, &mut body, 0.0, 0.1);
        assert_relative_eq!(body.translation.x, 0.0);
        assert_relative_eq!(body.translation.y, 0.0);
        assert!(body.translation.z < 2.0);
    }

    #[test]
    fn tilt_is_rate_limited() {
        let mut limbs = vec![limb_at(Vector3::zeros())];
        let ground = SlopedGround::new(FRAC_PI_2 / 2.0);
        let body_pose = Isometry3::translation(0.0, 0.0, 1.0);
        limbs[0].sense(&body_pose, &Vector3::zeros(), &ground);

        let mut body = body_pose;
        let stabilizer = BodyStabilizer::new(config());
        stabilizer.stabilize(&limbs, &mut body, 0.0, 0.1);
        let up = up_axis(&body.rotation);
        assert_relative_eq!(up.angle(&Vector3::z()), 0.1, epsilon = 1e-4);

        for _ in 0..20 {
            stabilizer.stabilize(&limbs, &mut body, 0.0, 0.1);
        }
        let up = up_axis(&body.rotation);
        assert_relative_eq!(up, *limbs[0].sensor().normal(), epsilon = 1e-4);
    }

    #[test]
    fn yaw_turns_about_up() {
        let limbs = vec![limb_at(Vector3::zeros())];
        let mut body = Isometry3::translation(0.0, 0.0, 1.0);
        BodyStabilizer::new(config()).stabilize(&limbs, &mut body, FRAC_PI_2, 0.1);
        assert_relative_eq!(body.rotation * Vector3::x(), Vector3::y(), epsilon = 1e-5);
        assert_relative_eq!(up_axis(&body.rotation), Vector3::z(), epsilon = 1e-5);
    }

    #[test]
    fn yaw_order_matters_on_tilted_body() {
        let limbs = vec![limb_at(Vector3::zeros())];
        let tilt = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.3);
        let start = Isometry3::from_parts(Vector3::new(0.0, 0.0, 1.0).into(), tilt);

        let mut after = start;
        BodyStabilizer::new(config()).stabilize(&limbs, &mut after, 1.0, 0.1);
        let mut before = start;
        let before_config = BodyConfig {
            yaw_order: YawOrder::BeforeAlign,
            ..config()
        };
        BodyStabilizer::new(before_config).stabilize(&limbs, &mut before, 1.0, 0.1);

        assert!(after.rotation.angle_to(&before.rotation) > 1e-3);
    }

    #[test]
    fn after_align_yaw_keeps_up() {
        let limbs = vec![limb_at(Vector3::zeros())];
        let tilt = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.05);
        let mut body = Isometry3::from_parts(Vector3::new(0.0, 0.0, 1.0).into(), tilt);
        BodyStabilizer::new(config()).stabilize(&limbs, &mut body, 0.7, 0.1);
        // tilt is within one step of the rate, so up lands on the normal
        assert_relative_eq!(up_axis(&body.rotation), Vector3::z(), epsilon = 1e-4);
    }

    #[test]
    fn no_limbs_only_yaws() {
        let mut body = Isometry3::translation(1.0, 2.0, 3.0);
        BodyStabilizer::new(config()).stabilize(&[], &mut body, 0.5, 0.1);
        assert_relative_eq!(body.translation.vector, Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(body.rotation.angle(), 0.5, epsilon = 1e-6);
    }
}
