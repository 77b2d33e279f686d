//! Shared test fixtures and utilities for Arachne crates.
//!
//! Provides deterministic RNG setup, stub terrain implementing
//! [`GroundQuery`](arachne_core::GroundQuery), and canned creature bind poses
//! with matching configs.

pub mod ground;
pub mod rigs;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use ground::{FlatGround, GapGround, NoGround, ScriptedGround, SlopedGround};
pub use rigs::{RigFixture, hexapod, quadruped};
pub use rng::{random_skeleton, seeded_rng};
