//! Terrain query interface consumed by ground sensing.
//!
//! Hosts implement [`GroundQuery`] on top of whatever scene representation
//! they own (a physics world, a heightfield, a test stub).

use nalgebra::Vector3;

/// A ray intersection with terrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vector3<f32>,
    /// Surface normal at `point`. Not required to be unit length.
    pub normal: Vector3<f32>,
    /// Distance from the ray origin to `point`.
    pub distance: f32,
}

/// Ray cast against the scene.
pub trait GroundQuery {
    /// Cast a ray from `origin` along unit `direction`. Returns the nearest
    /// hit within `max_distance` on any layer in `layer_mask`, or `None`.
    fn cast_ray(
        &self,
        origin: &Vector3<f32>,
        direction: &Vector3<f32>,
        max_distance: f32,
        layer_mask: u32,
    ) -> Option<RayHit>;
}

impl<T: GroundQuery + ?Sized> GroundQuery for &T {
    fn cast_ray(
        &self,
        origin: &Vector3<f32>,
        direction: &Vector3<f32>,
        max_distance: f32,
        layer_mask: u32,
    ) -> Option<RayHit> {
        (**self).cast_ray(origin, direction, max_distance, layer_mask)
    }
}

impl<T: GroundQuery + ?Sized> GroundQuery for Box<T> {
    fn cast_ray(
        &self,
        origin: &Vector3<f32>,
        direction: &Vector3<f32>,
        max_distance: f32,
        layer_mask: u32,
    ) -> Option<RayHit> {
        (**self).cast_ray(origin, direction, max_distance, layer_mask)
    }
}
