//! Stub terrain for sensor, gait and rig tests.
//!
//! All surfaces are one-sided planes hit from above; layer masks are ignored
//! unless stated.

use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::Vector3;

use arachne_core::ground::{GroundQuery, RayHit};

/// Intersect a ray with the plane through `point` with unit `normal`.
fn cast_plane(
    point: &Vector3<f32>,
    normal: &Vector3<f32>,
    origin: &Vector3<f32>,
    direction: &Vector3<f32>,
    max_distance: f32,
) -> Option<RayHit> {
    let denom = normal.dot(direction);
    if denom >= 0.0 {
        return None;
    }
    let distance = normal.dot(&(point - origin)) / denom;
    if !(0.0..=max_distance).contains(&distance) {
        return None;
    }
    Some(RayHit {
        point: origin + direction * distance,
        normal: *normal,
        distance,
    })
}

// ---------------------------------------------------------------------------
// FlatGround
// ---------------------------------------------------------------------------

/// Horizontal plane at a fixed height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatGround {
    pub height: f32,
}

impl FlatGround {
    pub const fn new(height: f32) -> Self {
        Self { height }
    }
}

impl GroundQuery for FlatGround {
    fn cast_ray(
        &self,
        origin: &Vector3<f32>,
        direction: &Vector3<f32>,
        max_distance: f32,
        _layer_mask: u32,
    ) -> Option<RayHit> {
        cast_plane(
            &Vector3::new(0.0, 0.0, self.height),
            &Vector3::z(),
            origin,
            direction,
            max_distance,
        )
    }
}

// ---------------------------------------------------------------------------
// NoGround
// ---------------------------------------------------------------------------

/// Nothing to hit anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGround;

impl GroundQuery for NoGround {
    fn cast_ray(
        &self,
        _origin: &Vector3<f32>,
        _direction: &Vector3<f32>,
        _max_distance: f32,
        _layer_mask: u32,
    ) -> Option<RayHit> {
        None
    }
}

// ---------------------------------------------------------------------------
// GapGround
// ---------------------------------------------------------------------------

/// Flat ground with a bottomless trench across `gap_start..gap_end` in x.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapGround {
    pub height: f32,
    pub gap_start: f32,
    pub gap_end: f32,
}

impl GapGround {
    pub const fn new(height: f32, gap_start: f32, gap_end: f32) -> Self {
        Self {
            height,
            gap_start,
            gap_end,
        }
    }
}

impl GroundQuery for GapGround {
    fn cast_ray(
        &self,
        origin: &Vector3<f32>,
        direction: &Vector3<f32>,
        max_distance: f32,
        layer_mask: u32,
    ) -> Option<RayHit> {
        FlatGround::new(self.height)
            .cast_ray(origin, direction, max_distance, layer_mask)
            .filter(|hit| !(self.gap_start..self.gap_end).contains(&hit.point.x))
    }
}

// ---------------------------------------------------------------------------
// SlopedGround
// ---------------------------------------------------------------------------

/// Plane through the origin rising along +x at `angle` radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopedGround {
    normal: Vector3<f32>,
}

impl SlopedGround {
    pub fn new(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            normal: Vector3::new(-sin, 0.0, cos),
        }
    }

    pub const fn normal(&self) -> &Vector3<f32> {
        &self.normal
    }
}

impl GroundQuery for SlopedGround {
    fn cast_ray(
        &self,
        origin: &Vector3<f32>,
        direction: &Vector3<f32>,
        max_distance: f32,
        _layer_mask: u32,
    ) -> Option<RayHit> {
        cast_plane(&Vector3::zeros(), &self.normal, origin, direction, max_distance)
    }
}

// ---------------------------------------------------------------------------
// ScriptedGround
// ---------------------------------------------------------------------------

/// Flat ground that appears or vanishes per call according to a script.
///
/// Call `i` hits only if `script[i]` is `true`. Calls past the end of the
/// script repeat its last entry. Also honours the layer mask: rays whose mask
/// does not include `layer` never hit.
#[derive(Debug)]
pub struct ScriptedGround {
    ground: FlatGround,
    layer: u32,
    script: Vec<bool>,
    calls: AtomicUsize,
}

impl ScriptedGround {
    pub const fn new(height: f32, script: Vec<bool>) -> Self {
        Self {
            ground: FlatGround::new(height),
            layer: 1,
            script,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn on_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    /// Number of rays cast so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl GroundQuery for ScriptedGround {
    fn cast_ray(
        &self,
        origin: &Vector3<f32>,
        direction: &Vector3<f32>,
        max_distance: f32,
        layer_mask: u32,
    ) -> Option<RayHit> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let present = self
            .script
            .get(call)
            .or_else(|| self.script.last())
            .copied()
            .unwrap_or(false);
        if !present || layer_mask & self.layer == 0 {
            return None;
        }
        self.ground
            .cast_ray(origin, direction, max_distance, layer_mask)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
