//! A complete creature: body pose, limbs and the ordered per-tick pipeline.
//!
//! [`LocomotionRig::tick`] runs, in order: drive the body from the movement
//! input, anchor every chain root to the body, sense ground under every
//! limb, solve every chain, advance the gait, and finally stabilize the body.
//! The body pose is written by the drive and stabilize phases only, so every
//! limb reads the same pose during sensing and solving.

use nalgebra::{Isometry3, Vector3};
use tracing::{trace, warn};

use arachne_core::ConfigError;
use arachne_core::config::LocomotionConfig;
use arachne_core::ground::GroundQuery;
use arachne_core::math::up_axis;
use arachne_ik::{FabrikConfig, FabrikSolver, KinematicChain};

use crate::coordinator::{GaitCoordinator, GaitReport};
use crate::error::RigError;
use crate::limb::Limb;
use crate::sensor::GroundSensor;
use crate::stabilizer::BodyStabilizer;

/// Movement signal for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocomotionInput {
    /// World-space travel direction scaled by throttle. Zero when idle.
    pub direction: Vector3<f32>,
    /// Turn about the body up axis this tick, in radians.
    pub yaw_delta: f32,
}

impl Default for LocomotionInput {
    fn default() -> Self {
        Self {
            direction: Vector3::zeros(),
            yaw_delta: 0.0,
        }
    }
}

impl LocomotionInput {
    pub const fn new(direction: Vector3<f32>, yaw_delta: f32) -> Self {
        Self {
            direction,
            yaw_delta,
        }
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub gait: GaitReport,
    /// Limbs whose solve was skipped this tick.
    pub skipped_solves: Vec<usize>,
}

/// Multi-limbed creature driven one fixed step at a time.
#[derive(Debug, Clone)]
pub struct LocomotionRig {
    config: LocomotionConfig,
    body: Isometry3<f32>,
    limbs: Vec<Limb>,
    solver: FabrikSolver,
    gait: GaitCoordinator,
    stabilizer: BodyStabilizer,
    movement: Vector3<f32>,
    ticks: u64,
}

impl LocomotionRig {
    /// Build a rig from a validated config, the body bind pose and one
    /// bind-pose skeleton per configured limb (root to foot, world space).
    pub fn new(
        config: LocomotionConfig,
        body: Isometry3<f32>,
        skeletons: &[Vec<Isometry3<f32>>],
    ) -> Result<Self, RigError> {
        config.validate()?;
        if skeletons.len() != config.limbs.len() {
            return Err(ConfigError::LimbCountMismatch {
                expected: config.limbs.len(),
                got: skeletons.len(),
            }
            .into());
        }

        let mut limbs = Vec::with_capacity(config.limbs.len());
        for (limb_config, skeleton) in config.limbs.iter().zip(skeletons) {
            let chain =
                KinematicChain::from_bind_pose(skeleton, body.rotation, limb_config.segment_count)
                    .map_err(|err| RigError::ik(&limb_config.name, err))?;
            let foot = *chain.leaf().position();
            let sensor = GroundSensor::new(config.sensor, &body, foot);
            let pole = limb_config.pole.map(Vector3::from);
            limbs.push(Limb::new(&limb_config.name, chain, sensor, body, pole));
        }
        GaitCoordinator::link_partners(&mut limbs, &config.partner_indices()?)?;

        Ok(Self {
            solver: FabrikSolver::new(FabrikConfig::from(&config.solver)),
            gait: GaitCoordinator::new(config.gait),
            stabilizer: BodyStabilizer::new(config.body),
            config,
            body,
            limbs,
            movement: Vector3::zeros(),
            ticks: 0,
        })
    }

    /// Run one full tick.
    pub fn tick<G: GroundQuery + ?Sized>(
        &mut self,
        input: &LocomotionInput,
        ground: &G,
        dt: f32,
    ) -> TickReport {
        self.drive(input, dt);
        self.anchor();
        self.sense(ground);
        let skipped_solves = self.solve();
        let gait = self.step(dt);
        self.stabilize(input.yaw_delta, dt);
        self.ticks += 1;
        TickReport {
            gait,
            skipped_solves,
        }
    }

    /// Translate the body along the input direction and remember it for
    /// sensing.
    pub fn drive(&mut self, input: &LocomotionInput, dt: f32) {
        self.movement = input.direction;
        self.body.translation.vector += input.direction * (self.config.body.move_speed * dt);
    }

    /// Re-attach every chain root to the body.
    pub fn anchor(&mut self) {
        for limb in &mut self.limbs {
            limb.anchor(&self.body);
        }
    }

    pub fn sense<G: GroundQuery + ?Sized>(&mut self, ground: &G) {
        for limb in &mut self.limbs {
            limb.sense(&self.body, &self.movement, ground);
        }
    }

    /// Solve every chain. Limbs that fail keep their previous pose and are
    /// returned.
    pub fn solve(&mut self) -> Vec<usize> {
        let mut skipped = Vec::new();
        for (index, limb) in self.limbs.iter_mut().enumerate() {
            match limb.solve(&self.solver) {
                Ok(result) => trace!(
                    limb = %limb.name(),
                    state = ?result.state,
                    iterations = result.iterations,
                    error = result.position_error,
                    "solved"
                ),
                Err(err) => {
                    warn!(limb = %limb.name(), %err, "skipping solve");
                    skipped.push(index);
                }
            }
        }
        skipped
    }

    pub fn step(&mut self, dt: f32) -> GaitReport {
        let up = up_axis(&self.body.rotation);
        self.gait.update(&mut self.limbs, &up, dt)
    }

    pub fn stabilize(&mut self, yaw_delta: f32, dt: f32) {
        self.stabilizer
            .stabilize(&self.limbs, &mut self.body, yaw_delta, dt);
    }

    /// Change a limb's segment count at runtime, re-initializing its chain.
    pub fn set_segment_count(&mut self, limb: &str, segment_count: usize) -> Result<(), RigError> {
        let index = self
            .limb_index(limb)
            .ok_or_else(|| RigError::UnknownLimb(limb.to_string()))?;
        self.limbs[index]
            .set_segment_count(segment_count, &self.body)
            .map_err(|err| RigError::ik(limb, err))?;
        self.config.limbs[index].segment_count = segment_count;
        Ok(())
    }

    pub const fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    pub const fn body(&self) -> &Isometry3<f32> {
        &self.body
    }

    /// Overwrite the body pose (teleport). Chains follow on the next anchor.
    pub fn set_body(&mut self, body: Isometry3<f32>) {
        self.body = body;
    }

    pub fn limbs(&self) -> &[Limb] {
        &self.limbs
    }

    pub fn limb(&self, name: &str) -> Option<&Limb> {
        self.limbs.iter().find(|limb| limb.name() == name)
    }

    pub fn limb_mut(&mut self, name: &str) -> Option<&mut Limb> {
        self.limbs.iter_mut().find(|limb| limb.name() == name)
    }

    pub fn limb_index(&self, name: &str) -> Option<usize> {
        self.limbs.iter().position(|limb| limb.name() == name)
    }

    /// Number of limbs currently mid-step.
    pub fn airborne(&self) -> usize {
        self.limbs.iter().filter(|limb| limb.is_stepping()).count()
    }

    /// Pairs of partners stepping at the same time. Always empty unless the
    /// partner lock is broken.
    pub fn airborne_partner_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (index, limb) in self.limbs.iter().enumerate() {
            if !limb.is_stepping() {
                continue;
            }
            for &partner in limb.partners() {
                if partner > index && self.limbs[partner].is_stepping() {
                    pairs.push((index, partner));
                }
            }
        }
        pairs
    }

    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}
