//! A single limb: chain, ground sensor and stepping state.

use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};
use tracing::warn;

use arachne_core::ground::{GroundQuery, RayHit};
use arachne_core::math::{lift_arc, try_direction};
use arachne_ik::{FabrikSolver, IkError, IkResult, KinematicChain};

use crate::sensor::GroundSensor;

/// An in-flight step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub start: Vector3<f32>,
    pub end: Vector3<f32>,
    /// Normalized progress in `[0, 1]`.
    pub progress: f32,
}

/// Stepping state of a limb.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum LimbPhase {
    #[default]
    Grounded,
    Stepping(Step),
}

impl LimbPhase {
    pub const fn is_stepping(&self) -> bool {
        matches!(self, Self::Stepping(_))
    }
}

/// One limb of the creature.
#[derive(Debug, Clone)]
pub struct Limb {
    name: String,
    chain: KinematicChain,
    sensor: GroundSensor,
    partners: Vec<usize>,
    phase: LimbPhase,
    bind_body: Isometry3<f32>,
    /// Chain root in body space.
    root_offset: Vector3<f32>,
    /// Pole hint in body space.
    pole_offset: Option<Vector3<f32>>,
    steps_taken: u64,
}

impl Limb {
    /// Create a limb from a chain built under the bind-time `bind_body` pose.
    ///
    /// The foot goal starts at the bind-pose leaf, oriented like the body.
    pub fn new(
        name: impl Into<String>,
        mut chain: KinematicChain,
        sensor: GroundSensor,
        bind_body: Isometry3<f32>,
        pole_offset: Option<Vector3<f32>>,
    ) -> Self {
        let root_offset = body_local(&bind_body, chain.root());
        let foot = *chain.leaf().position();
        chain.set_goal(Isometry3::from_parts(foot.into(), bind_body.rotation));
        Self {
            name: name.into(),
            chain,
            sensor,
            partners: Vec::new(),
            phase: LimbPhase::Grounded,
            bind_body,
            root_offset,
            pole_offset,
            steps_taken: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn chain(&self) -> &KinematicChain {
        &self.chain
    }

    pub const fn chain_mut(&mut self) -> &mut KinematicChain {
        &mut self.chain
    }

    pub const fn sensor(&self) -> &GroundSensor {
        &self.sensor
    }

    /// Indices of limbs that must stay grounded while this one steps.
    pub fn partners(&self) -> &[usize] {
        &self.partners
    }

    pub(crate) fn set_partners(&mut self, partners: Vec<usize>) {
        self.partners = partners;
    }

    pub const fn phase(&self) -> &LimbPhase {
        &self.phase
    }

    pub const fn is_stepping(&self) -> bool {
        self.phase.is_stepping()
    }

    pub fn is_stretched(&self) -> bool {
        self.chain.is_stretched()
    }

    /// Current foot (chain leaf) position.
    pub fn foot(&self) -> &Vector3<f32> {
        self.chain.leaf().position()
    }

    /// Current foot goal position.
    pub fn goal_position(&self) -> Option<Vector3<f32>> {
        self.chain.goal().map(|goal| goal.translation.vector)
    }

    /// Number of completed steps.
    pub const fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    pub const fn root_offset(&self) -> &Vector3<f32> {
        &self.root_offset
    }

    pub const fn pole_offset(&self) -> Option<&Vector3<f32>> {
        self.pole_offset.as_ref()
    }

    pub fn set_pole_offset(&mut self, pole_offset: Option<Vector3<f32>>) {
        self.pole_offset = pole_offset;
    }

    /// Re-initialize the chain with a new segment count.
    ///
    /// The root offset is recomputed for the new root joint. Stepping state
    /// and the foot goal are kept.
    pub fn set_segment_count(
        &mut self,
        segment_count: usize,
        body: &Isometry3<f32>,
    ) -> Result<(), IkError> {
        if segment_count == self.chain.segment_count() {
            return Ok(());
        }
        self.chain.set_segment_count(segment_count)?;
        self.root_offset = body_local(&self.bind_body, self.chain.root());
        warn!(
            limb = %self.name,
            segment_count,
            "chain re-initialized after segment count change"
        );
        self.anchor(body);
        Ok(())
    }

    /// Attach the chain root and pole to the body, and turn the foot goal
    /// with it.
    pub fn anchor(&mut self, body: &Isometry3<f32>) {
        self.chain
            .set_root(body.transform_point(&Point3::from(self.root_offset)).coords);
        let pole = self
            .pole_offset
            .map(|offset| body.transform_point(&Point3::from(offset)).coords);
        self.chain.set_pole(pole);
        if let Some(goal) = self.chain.goal().copied() {
            self.chain
                .set_goal(Isometry3::from_parts(goal.translation, body.rotation));
        }
    }

    pub fn sense<G: GroundQuery + ?Sized>(
        &mut self,
        body: &Isometry3<f32>,
        movement: &Vector3<f32>,
        ground: &G,
    ) -> Option<RayHit> {
        self.sensor.update(body, movement, ground)
    }

    pub fn solve(&mut self, solver: &FabrikSolver) -> Result<IkResult, IkError> {
        solver.solve(&mut self.chain)
    }

    /// Whether the foot has drifted past `threshold` from the contact, or the
    /// chain cannot reach its goal.
    pub fn wants_step(&self, threshold: f32) -> bool {
        (self.foot() - self.sensor.contact()).norm_squared() > threshold * threshold
            || self.is_stretched()
    }

    /// Enter [`LimbPhase::Stepping`] from the current foot position.
    ///
    /// The step ends on the contact point, or `threshold` along the way to it
    /// when the contact is closer than that.
    pub fn begin_step(&mut self, threshold: f32) {
        let start = *self.foot();
        let contact = *self.sensor.contact();
        let to_contact = contact - start;
        let end = if to_contact.norm_squared() < threshold * threshold {
            try_direction(&to_contact).map_or(start, |dir| start + dir * threshold)
        } else {
            contact
        };
        self.phase = LimbPhase::Stepping(Step {
            start,
            end,
            progress: 0.0,
        });
    }

    /// Advance an in-flight step and move the foot goal along its arc.
    ///
    /// Returns `true` when this call lands the foot.
    pub fn advance_step(&mut self, dt: f32, speed: f32, lift: f32, up: &Vector3<f32>) -> bool {
        let LimbPhase::Stepping(mut step) = self.phase else {
            return false;
        };

        let initial_sq = (step.start - step.end).norm_squared();
        let remaining_sq = (self.foot() - step.end).norm_squared();
        let factor = if initial_sq > 0.0 {
            (remaining_sq / initial_sq).max(1.0)
        } else {
            1.0
        };
        step.progress = dt.mul_add(speed * factor, step.progress).min(1.0);

        let foot = step.start.lerp(&step.end, step.progress) + up * (lift * lift_arc(step.progress));
        let rotation = self
            .chain
            .goal()
            .map_or_else(UnitQuaternion::identity, |goal| goal.rotation);
        self.chain
            .set_goal(Isometry3::from_parts(foot.into(), rotation));

        if step.progress >= 1.0 {
            self.phase = LimbPhase::Grounded;
            self.steps_taken += 1;
            true
        } else {
            self.phase = LimbPhase::Stepping(step);
            false
        }
    }
}

fn body_local(body: &Isometry3<f32>, point: &Vector3<f32>) -> Vector3<f32> {
    body.inverse_transform_point(&Point3::from(*point)).coords
}
