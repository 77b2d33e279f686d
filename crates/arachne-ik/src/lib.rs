//! Position-based inverse kinematics for creature limbs.
//!
//! Provides an owned joint snapshot ([`KinematicChain`]) captured once from a
//! bind pose, and a FABRIK solver ([`FabrikSolver`]) that bends it toward a
//! goal each tick, optionally twisting interior joints toward a pole hint and
//! rebuilding joint orientations from the solved positions.
//!
//! # Architecture
//!
//! ```text
//! bind pose ──► KinematicChain ──► FabrikSolver ──► joint positions + rotations
//! ```
//!
//! The chain never reads an external transform hierarchy after
//! construction. Hosts move the root with [`KinematicChain::set_root`] and set
//! the goal with [`KinematicChain::set_goal`]; the solver does the rest.

pub mod chain;
pub mod error;
pub mod solver;

pub use chain::{ChainState, Joint, KinematicChain};
pub use error::IkError;
pub use solver::{FabrikConfig, FabrikSolver, IkResult};
