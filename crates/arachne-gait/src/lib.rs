//! Reactive stepping and body stabilization for multi-limbed creatures.
//!
//! Each limb owns a [`KinematicChain`](arachne_ik::KinematicChain) and a
//! [`GroundSensor`]. The [`GaitCoordinator`] decides when a limb lifts off,
//! honouring per-limb grounding partners, and drives the foot goal along an
//! eased arc. The [`BodyStabilizer`] then settles the body above the mean
//! foot position and tilts it toward the mean contact normal.
//!
//! [`LocomotionRig`] ties everything together into a single ordered tick:
//!
//! ```text
//! drive ──► anchor ──► sense ──► solve ──► step ──► stabilize
//! ```

pub mod coordinator;
pub mod error;
pub mod limb;
#[cfg(feature = "bevy")]
pub mod plugin;
pub mod rig;
pub mod sensor;
pub mod stabilizer;

pub use coordinator::{GaitCoordinator, GaitReport};
pub use error::RigError;
pub use limb::{Limb, LimbPhase, Step};
#[cfg(feature = "bevy")]
pub use plugin::{
    ArachnePlugin, GroundResource, LocomotionInputResource, LocomotionSet, RigResource,
};
pub use rig::{LocomotionInput, LocomotionRig, TickReport};
pub use sensor::GroundSensor;
pub use stabilizer::{BodyStabilizer, ContactAverage};
