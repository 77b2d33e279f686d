//! Canned creature bind poses with matching configs.
//!
//! Bodies stand at height 1 above flat ground at z = 0, facing +x. Every leg
//! is a hip, a raised knee and a foot resting on the ground, splayed outward
//! from its hip.

use nalgebra::{Isometry3, Vector3};

use arachne_core::config::{LimbConfig, LocomotionConfig};

/// Everything needed to build a locomotion rig.
#[derive(Debug, Clone)]
pub struct RigFixture {
    pub config: LocomotionConfig,
    pub body: Isometry3<f32>,
    /// One skeleton per entry in `config.limbs`, root to foot.
    pub skeletons: Vec<Vec<Isometry3<f32>>>,
}

impl RigFixture {
    pub fn limb_index(&self, name: &str) -> Option<usize> {
        self.config.limb_index(name)
    }
}

/// Body height above the ground in the bind pose.
pub const BIND_HEIGHT: f32 = 1.0;

/// Hip at `hip` (body local), knee raised and outward, foot on the ground.
fn leg(body: &Isometry3<f32>, hip: Vector3<f32>, outward: Vector3<f32>) -> Vec<Isometry3<f32>> {
    let hip_world = body * nalgebra::Point3::from(hip);
    let knee = hip_world + outward * 0.5 + Vector3::z() * 0.4;
    let mut foot = hip_world + outward * 1.0;
    foot.z = 0.0;
    [hip_world, knee, foot]
        .iter()
        .map(|p| Isometry3::translation(p.x, p.y, p.z))
        .collect()
}

fn fixture(legs: &[(&str, Vector3<f32>, Vector3<f32>)], partners: &[(&str, &str)]) -> RigFixture {
    let body = Isometry3::translation(0.0, 0.0, BIND_HEIGHT);
    let mut config = LocomotionConfig::default();
    config.body.height_offset = BIND_HEIGHT;

    let mut skeletons = Vec::with_capacity(legs.len());
    for (name, hip, outward) in legs {
        let mut limb = LimbConfig::new(*name);
        for (a, b) in partners {
            if a == name {
                limb = limb.with_partner(*b);
            }
        }
        config.limbs.push(limb);
        skeletons.push(leg(&body, *hip, *outward));
    }

    RigFixture {
        config,
        body,
        skeletons,
    }
}

/// Four legs. Adjacent legs are partners, so diagonal pairs
/// (`front_left` + `rear_right`, `front_right` + `rear_left`) alternate.
pub fn quadruped() -> RigFixture {
    let left = Vector3::y();
    let right = -Vector3::y();
    fixture(
        &[
            ("front_left", Vector3::new(0.4, 0.3, 0.0), left),
            ("front_right", Vector3::new(0.4, -0.3, 0.0), right),
            ("rear_left", Vector3::new(-0.4, 0.3, 0.0), left),
            ("rear_right", Vector3::new(-0.4, -0.3, 0.0), right),
        ],
        &[
            ("front_left", "front_right"),
            ("front_left", "rear_left"),
            ("rear_right", "front_right"),
            ("rear_right", "rear_left"),
        ],
    )
}

/// Six legs in two alternating tripods: (`left_1`, `right_2`, `left_3`) and
/// (`right_1`, `left_2`, `right_3`).
pub fn hexapod() -> RigFixture {
    let left = Vector3::y();
    let right = -Vector3::y();
    fixture(
        &[
            ("left_1", Vector3::new(0.6, 0.3, 0.0), left),
            ("right_1", Vector3::new(0.6, -0.3, 0.0), right),
            ("left_2", Vector3::new(0.0, 0.3, 0.0), left),
            ("right_2", Vector3::new(0.0, -0.3, 0.0), right),
            ("left_3", Vector3::new(-0.6, 0.3, 0.0), left),
            ("right_3", Vector3::new(-0.6, -0.3, 0.0), right),
        ],
        &[
            ("left_1", "right_1"),
            ("left_1", "left_2"),
            ("right_2", "right_1"),
            ("right_2", "left_2"),
            ("right_2", "right_3"),
            ("left_3", "left_2"),
            ("left_3", "right_3"),
        ],
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
