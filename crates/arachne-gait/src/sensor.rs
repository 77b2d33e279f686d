//! Per-limb ground sensing.
//!
//! Each tick the sensor casts a ray down the body's up axis from a point
//! ahead of the limb's home position in the last non-zero direction of
//! travel. A hit refreshes the contact point and normal; a miss keeps the
//! previous ones so the limb keeps a stable target over gaps.

use nalgebra::{Isometry3, Point3, Vector3};

use arachne_core::config::SensorConfig;
use arachne_core::ground::{GroundQuery, RayHit};
use arachne_core::math::{direction_or, try_direction, up_axis};

/// Ground sensor for one limb.
#[derive(Debug, Clone)]
pub struct GroundSensor {
    config: SensorConfig,
    /// Home position in body space.
    home_offset: Vector3<f32>,
    /// Home position in world space, as of the last update.
    home: Vector3<f32>,
    virtual_direction: Vector3<f32>,
    contact: Vector3<f32>,
    normal: Vector3<f32>,
    /// Terrain-projected home point from the last hit.
    projected_home: Vector3<f32>,
    ray_origin: Vector3<f32>,
    last_hit: bool,
}

impl GroundSensor {
    /// Create a sensor whose home is `home` (world space) under `body`.
    ///
    /// The contact is seeded at `home` with a normal along the body up axis,
    /// so the limb has a valid target before the first hit.
    pub fn new(config: SensorConfig, body: &Isometry3<f32>, home: Vector3<f32>) -> Self {
        let home_offset = body.inverse_transform_point(&Point3::from(home)).coords;
        Self {
            config,
            home_offset,
            home,
            virtual_direction: Vector3::zeros(),
            contact: home,
            normal: up_axis(&body.rotation),
            projected_home: home,
            ray_origin: home,
            last_hit: false,
        }
    }

    /// Refresh the contact from `ground`. Returns the hit, if any.
    pub fn update<G: GroundQuery + ?Sized>(
        &mut self,
        body: &Isometry3<f32>,
        movement: &Vector3<f32>,
        ground: &G,
    ) -> Option<RayHit> {
        if let Some(direction) = try_direction(movement) {
            self.virtual_direction = direction;
        }

        let up = up_axis(&body.rotation);
        self.home = body.transform_point(&Point3::from(self.home_offset)).coords;
        let lead = self.virtual_direction * self.config.lead_radius;
        self.ray_origin = self.home + lead + up * self.config.height_offset;

        let hit = ground.cast_ray(
            &self.ray_origin,
            &-up,
            self.config.max_distance,
            self.config.layer_mask,
        );
        self.last_hit = hit.is_some();
        if let Some(hit) = &hit {
            self.contact = hit.point;
            self.normal = direction_or(&hit.normal, &up);
            self.projected_home = hit.point - lead;
        }
        hit
    }

    pub const fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Last resolved contact point (the virtual target).
    pub const fn contact(&self) -> &Vector3<f32> {
        &self.contact
    }

    /// Unit surface normal at the contact.
    pub const fn normal(&self) -> &Vector3<f32> {
        &self.normal
    }

    /// Last non-zero movement direction, or zero before any movement.
    pub const fn virtual_direction(&self) -> &Vector3<f32> {
        &self.virtual_direction
    }

    /// World home position carried by the body.
    pub const fn home(&self) -> &Vector3<f32> {
        &self.home
    }

    pub const fn home_offset(&self) -> &Vector3<f32> {
        &self.home_offset
    }

    pub const fn projected_home(&self) -> &Vector3<f32> {
        &self.projected_home
    }

    pub const fn ray_origin(&self) -> &Vector3<f32> {
        &self.ray_origin
    }

    /// Whether the most recent update found ground.
    pub const fn has_contact(&self) -> bool {
        self.last_hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use arachne_test_utils::ground::{FlatGround, NoGround, ScriptedGround};
    use nalgebra::{Translation3, UnitQuaternion};

    fn config() -> SensorConfig {
        SensorConfig {
            max_distance: 2.0,
            lead_radius: 0.3,
            height_offset: 0.5,
            layer_mask: u32::MAX,
        }
    }

    fn body_at(z: f32) -> Isometry3<f32> {
        Isometry3::translation(0.0, 0.0, z)
    }

    #[test]
    fn seeded_from_home() {
        let sensor = GroundSensor::new(config(), &body_at(1.0), Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(*sensor.contact(), Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(*sensor.normal(), Vector3::z());
        assert_relative_eq!(*sensor.home_offset(), Vector3::new(1.0, 0.0, -1.0));
        assert!(!sensor.has_contact());
    }

    #[test]
    fn hit_ahead_of_home_in_travel_direction() {
        let mut sensor = GroundSensor::new(config(), &body_at(1.0), Vector3::new(1.0, 0.0, 0.0));
        let ground = FlatGround::new(0.0);
        let hit = sensor.update(&body_at(1.0), &Vector3::new(0.0, 2.0, 0.0), &ground);

        assert!(hit.is_some());
        assert!(sensor.has_contact());
        assert_relative_eq!(*sensor.virtual_direction(), Vector3::y());
        assert_relative_eq!(*sensor.ray_origin(), Vector3::new(1.0, 0.3, 0.5), epsilon = 1e-6);
        assert_relative_eq!(*sensor.contact(), Vector3::new(1.0, 0.3, 0.0), epsilon = 1e-6);
        assert_relative_eq!(*sensor.projected_home(), Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn virtual_direction_kept_while_idle() {
        let mut sensor = GroundSensor::new(config(), &body_at(1.0), Vector3::zeros());
        let ground = FlatGround::new(0.0);
        sensor.update(&body_at(1.0), &Vector3::x(), &ground);
        sensor.update(&body_at(1.0), &Vector3::zeros(), &ground);
        assert_relative_eq!(*sensor.virtual_direction(), Vector3::x());
        assert_relative_eq!(*sensor.contact(), Vector3::new(0.3, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn miss_retains_previous_contact() {
        let mut sensor = GroundSensor::new(config(), &body_at(1.0), Vector3::zeros());
        sensor.update(&body_at(1.0), &Vector3::x(), &FlatGround::new(0.0));
        let contact = *sensor.contact();
        let normal = *sensor.normal();

        for _ in 0..5 {
            assert!(sensor.update(&body_at(1.0), &Vector3::x(), &NoGround).is_none());
            assert!(!sensor.has_contact());
            assert_eq!(*sensor.contact(), contact);
            assert_eq!(*sensor.normal(), normal);
        }
    }

    #[test]
    fn home_follows_body() {
        let mut sensor = GroundSensor::new(config(), &body_at(1.0), Vector3::new(1.0, 0.0, 0.0));
        let moved = Isometry3::from_parts(
            Translation3::new(5.0, 0.0, 1.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f32::consts::FRAC_PI_2),
        );
        sensor.update(&moved, &Vector3::zeros(), &FlatGround::new(0.0));
        assert_relative_eq!(*sensor.home(), Vector3::new(5.0, 1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(*sensor.contact(), Vector3::new(5.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn ray_points_down_body_up() {
        let tilted = Isometry3::from_parts(
            Translation3::new(0.0, 0.0, 1.0),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.2),
        );
        let mut sensor = GroundSensor::new(config(), &tilted, Vector3::zeros());
        sensor.update(&tilted, &Vector3::zeros(), &FlatGround::new(-0.1));
        // ray leans with the body, so the contact drifts off the home point
        assert!(sensor.contact().y.abs() > 1e-3);
        assert_relative_eq!(sensor.contact().z, -0.1, epsilon = 1e-5);
    }

    #[test]
    fn layer_mask_filters_ground() {
        let ground = ScriptedGround::new(0.0, vec![true]).on_layer(0b100);
        let mut sensor = GroundSensor::new(config(), &body_at(1.0), Vector3::zeros());
        assert!(sensor.update(&body_at(1.0), &Vector3::x(), &ground).is_some());
        let contact = *sensor.contact();

        let masked = SensorConfig {
            layer_mask: 0b011,
            ..config()
        };
        let mut sensor = GroundSensor { config: masked, ..sensor };
        let moved = Isometry3::translation(1.0, 0.0, 1.0);
        assert!(sensor.update(&moved, &Vector3::x(), &ground).is_none());
        assert!(!sensor.has_contact());
        assert_eq!(*sensor.contact(), contact);
        assert_eq!(ground.calls(), 2);
    }
}
