//! Deterministic RNG utilities for reproducible tests.

use nalgebra::{Isometry3, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Create a deterministic `ChaCha8Rng` from a seed.
///
/// All test randomization should go through this to ensure reproducibility.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Random bind-pose skeleton of `segments` segments rooted at the origin.
///
/// Every segment is between 0.2 and roughly 1.7 units long, so no joints
/// coincide.
pub fn random_skeleton(rng: &mut impl Rng, segments: usize) -> Vec<Isometry3<f32>> {
    let mut tip = Vector3::<f32>::zeros();
    let mut skeleton = Vec::with_capacity(segments + 1);
    skeleton.push(Isometry3::identity());
    for _ in 0..segments {
        tip += Vector3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(0.2..1.0),
        );
        skeleton.push(Isometry3::translation(tip.x, tip.y, tip.z));
    }
    skeleton
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
