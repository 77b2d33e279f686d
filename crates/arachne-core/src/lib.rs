// arachne-core: Config, errors, terrain queries and guarded vector math for Arachne procedural locomotion.

pub mod config;
pub mod error;
pub mod ground;
pub mod math;

pub use config::{
    BodyConfig, GaitConfig, LimbConfig, LocomotionConfig, SensorConfig, SolverConfig, YawOrder,
};
pub use error::ConfigError;
pub use ground::{GroundQuery, RayHit};
