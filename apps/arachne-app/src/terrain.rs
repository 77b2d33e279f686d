//! Procedural heightfield terrain for the walking demo.

use std::f32::consts::TAU;

use nalgebra::Vector3;

use arachne_core::ground::{GroundQuery, RayHit};

/// Samples taken along a ray before refining the crossing.
const MARCH_STEPS: usize = 64;
const REFINE_STEPS: usize = 16;

/// Rolling hills: `z = amplitude * sin(k x) * cos(k y)` with
/// `k = 2 pi / wavelength`. Zero amplitude gives a flat floor at z = 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hills {
    amplitude: f32,
    frequency: f32,
}

impl Hills {
    pub fn new(amplitude: f32, wavelength: f32) -> Self {
        let frequency = if wavelength > 0.0 { TAU / wavelength } else { 0.0 };
        Self {
            amplitude,
            frequency,
        }
    }

    pub fn height(&self, x: f32, y: f32) -> f32 {
        self.amplitude * (self.frequency * x).sin() * (self.frequency * y).cos()
    }

    pub fn normal(&self, x: f32, y: f32) -> Vector3<f32> {
        let (sx, cx) = (self.frequency * x).sin_cos();
        let (sy, cy) = (self.frequency * y).sin_cos();
        let ak = self.amplitude * self.frequency;
        let dx = ak * cx * cy;
        let dy = -ak * sx * sy;
        Vector3::new(-dx, -dy, 1.0).normalize()
    }

    /// Signed height of `p` above the surface.
    fn clearance(&self, p: &Vector3<f32>) -> f32 {
        p.z - self.height(p.x, p.y)
    }
}

impl GroundQuery for Hills {
    fn cast_ray(
        &self,
        origin: &Vector3<f32>,
        direction: &Vector3<f32>,
        max_distance: f32,
        _layer_mask: u32,
    ) -> Option<RayHit> {
        if max_distance <= 0.0 || self.clearance(origin) < 0.0 {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let stride = max_distance / MARCH_STEPS as f32;
        let mut near = 0.0;
        let mut far = None;
        for i in 1..=MARCH_STEPS {
            #[allow(clippy::cast_precision_loss)]
            let t = stride * i as f32;
            if self.clearance(&(origin + direction * t)) <= 0.0 {
                far = Some(t);
                break;
            }
            near = t;
        }
        let mut far = far?;

        for _ in 0..REFINE_STEPS {
            let mid = 0.5 * (near + far);
            if self.clearance(&(origin + direction * mid)) <= 0.0 {
                far = mid;
            } else {
                near = mid;
            }
        }

        let point = origin + direction * far;
        Some(RayHit {
            point,
            normal: self.normal(point.x, point.y),
            distance: far,
        })
    }
}
