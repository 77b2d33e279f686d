//! Bind-pose skeletons generated from a limb list.
//!
//! Limbs alternate left and right, front to back, in config order: limb 0 is
//! front left, limb 1 front right, limb 2 the next left, and so on. Each leg
//! arches outward from its hip and plants its foot on the terrain.

use std::f32::consts::PI;

use nalgebra::{Isometry3, Point3, Vector3};

use arachne_core::config::LocomotionConfig;

use crate::terrain::Hills;

const ROW_SPACING: f32 = 0.6;
const HIP_WIDTH: f32 = 0.3;
const LEG_SPAN: f32 = 1.0;
const KNEE_RISE: f32 = 0.4;

/// Body pose standing `config.body.height_offset` above the terrain at the
/// origin.
pub fn body_pose(config: &LocomotionConfig, terrain: &Hills) -> Isometry3<f32> {
    Isometry3::translation(0.0, 0.0, terrain.height(0.0, 0.0) + config.body.height_offset)
}

/// One skeleton per configured limb, with `segment_count + 1` joints each.
pub fn skeletons(
    config: &LocomotionConfig,
    body: &Isometry3<f32>,
    terrain: &Hills,
) -> Vec<Vec<Isometry3<f32>>> {
    let rows = config.limbs.len().div_ceil(2);
    #[allow(clippy::cast_precision_loss)]
    let front = ROW_SPACING * (rows.saturating_sub(1)) as f32 / 2.0;

    config
        .limbs
        .iter()
        .enumerate()
        .map(|(index, limb)| {
            let side = if index % 2 == 0 { 1.0 } else { -1.0 };
            #[allow(clippy::cast_precision_loss)]
            let x = ROW_SPACING.mul_add(-((index / 2) as f32), front);
            let hip = body.transform_point(&Point3::new(x, side * HIP_WIDTH, 0.0)).coords;
            let outward = body.rotation * Vector3::y() * side;
            leg(&hip, &outward, limb.segment_count, terrain)
        })
        .collect()
}

fn leg(
    hip: &Vector3<f32>,
    outward: &Vector3<f32>,
    segment_count: usize,
    terrain: &Hills,
) -> Vec<Isometry3<f32>> {
    let segments = segment_count.max(1);
    let reach = hip + outward * LEG_SPAN;
    let foot_z = terrain.height(reach.x, reach.y);

    (0..=segments)
        .map(|j| {
            #[allow(clippy::cast_precision_loss)]
            let t = j as f32 / segments as f32;
            let mut p = hip + outward * (LEG_SPAN * t);
            p.z = (foot_z - hip.z).mul_add(t, hip.z) + KNEE_RISE * (PI * t).sin();
            Isometry3::translation(p.x, p.y, p.z)
        })
        .collect()
}
