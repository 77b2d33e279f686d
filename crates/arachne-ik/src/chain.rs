//! Owned joint snapshot of a limb.
//!
//! A [`KinematicChain`] is built once from a bind-pose skeleton (root to
//! leaf, world space). It keeps its own copy of that skeleton so the chain
//! can be rebuilt with a different segment count later without consulting
//! the host again.

use nalgebra::{Isometry3, UnitQuaternion, Vector3};

use arachne_core::math::{DIRECTION_EPSILON, direction_or};

use crate::error::IkError;

/// A single joint of the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub(crate) position: Vector3<f32>,
    pub(crate) rotation: UnitQuaternion<f32>,
    /// Distance to the successor. Zero for the leaf.
    rest_length: f32,
    initial_rotation: UnitQuaternion<f32>,
    /// Unit direction to the successor at bind time. The leaf repeats the
    /// direction of the last segment.
    initial_direction: Vector3<f32>,
}

impl Joint {
    pub const fn position(&self) -> &Vector3<f32> {
        &self.position
    }

    pub const fn rotation(&self) -> &UnitQuaternion<f32> {
        &self.rotation
    }

    pub const fn rest_length(&self) -> f32 {
        self.rest_length
    }

    pub const fn initial_rotation(&self) -> &UnitQuaternion<f32> {
        &self.initial_rotation
    }

    pub const fn initial_direction(&self) -> &Vector3<f32> {
        &self.initial_direction
    }

    /// Current world pose of the joint.
    pub fn pose(&self) -> Isometry3<f32> {
        Isometry3::from_parts(self.position.into(), self.rotation)
    }
}

/// Outcome of the reachability test of the last solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChainState {
    /// Goal within reach, joints bent toward it.
    #[default]
    Bent,
    /// Goal at or beyond total reach, joints laid on the root-to-goal line.
    Stretched,
}

/// An ordered chain of `segment_count + 1` joints from a fixed root to a
/// free leaf.
#[derive(Debug, Clone)]
pub struct KinematicChain {
    skeleton: Vec<Isometry3<f32>>,
    joints: Vec<Joint>,
    total_length: f32,
    initial_goal_rotation: UnitQuaternion<f32>,
    goal: Option<Isometry3<f32>>,
    pole: Option<Vector3<f32>>,
    /// Pole the current joint positions were last twisted toward.
    aligned_pole: Option<Vector3<f32>>,
    state: ChainState,
}

impl KinematicChain {
    /// Build a chain from the last `segment_count + 1` joints of `skeleton`.
    ///
    /// `goal_bind_rotation` is the goal orientation at bind time; the leaf
    /// later inherits the goal's rotation relative to it.
    pub fn from_bind_pose(
        skeleton: &[Isometry3<f32>],
        goal_bind_rotation: UnitQuaternion<f32>,
        segment_count: usize,
    ) -> Result<Self, IkError> {
        let joints = build_joints(skeleton, segment_count)?;
        let total_length = joints.iter().map(Joint::rest_length).sum();
        Ok(Self {
            skeleton: skeleton.to_vec(),
            joints,
            total_length,
            initial_goal_rotation: goal_bind_rotation,
            goal: None,
            pole: None,
            aligned_pole: None,
            state: ChainState::Bent,
        })
    }

    /// Rebuild the joints from the stored skeleton with a new segment count.
    ///
    /// Goal and pole are kept. Joint positions return to the bind pose. On
    /// error the chain is left unchanged.
    pub fn set_segment_count(&mut self, segment_count: usize) -> Result<(), IkError> {
        let joints = build_joints(&self.skeleton, segment_count)?;
        self.total_length = joints.iter().map(Joint::rest_length).sum();
        self.joints = joints;
        self.aligned_pole = None;
        self.state = ChainState::Bent;
        Ok(())
    }

    pub fn segment_count(&self) -> usize {
        self.joints.len() - 1
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub(crate) fn joints_mut(&mut self) -> &mut [Joint] {
        &mut self.joints
    }

    /// Bind-pose skeleton the chain was built from.
    pub fn skeleton(&self) -> &[Isometry3<f32>] {
        &self.skeleton
    }

    /// Index into [`Self::skeleton`] of the chain's root joint.
    pub fn root_skeleton_index(&self) -> usize {
        self.skeleton.len() - self.joints.len()
    }

    /// Maximum reach (sum of rest lengths).
    pub const fn total_length(&self) -> f32 {
        self.total_length
    }

    pub fn root(&self) -> &Vector3<f32> {
        &self.joints[0].position
    }

    pub fn leaf(&self) -> &Joint {
        &self.joints[self.joints.len() - 1]
    }

    /// Move the whole chain rigidly so its root sits at `position`.
    pub fn set_root(&mut self, position: Vector3<f32>) {
        let delta = position - self.joints[0].position;
        for joint in &mut self.joints {
            joint.position += delta;
        }
    }

    pub const fn goal(&self) -> Option<&Isometry3<f32>> {
        self.goal.as_ref()
    }

    pub fn set_goal(&mut self, goal: Isometry3<f32>) {
        self.goal = Some(goal);
    }

    pub fn clear_goal(&mut self) {
        self.goal = None;
    }

    pub const fn initial_goal_rotation(&self) -> &UnitQuaternion<f32> {
        &self.initial_goal_rotation
    }

    pub const fn pole(&self) -> Option<&Vector3<f32>> {
        self.pole.as_ref()
    }

    pub fn set_pole(&mut self, pole: Option<Vector3<f32>>) {
        self.pole = pole;
    }

    pub const fn state(&self) -> ChainState {
        self.state
    }

    pub(crate) const fn aligned_pole(&self) -> Option<&Vector3<f32>> {
        self.aligned_pole.as_ref()
    }

    pub(crate) fn set_aligned_pole(&mut self, pole: Option<Vector3<f32>>) {
        self.aligned_pole = pole;
    }

    pub(crate) const fn set_state(&mut self, state: ChainState) {
        self.state = state;
    }

    pub fn is_stretched(&self) -> bool {
        self.state == ChainState::Stretched
    }
}

fn build_joints(skeleton: &[Isometry3<f32>], segment_count: usize) -> Result<Vec<Joint>, IkError> {
    if segment_count == 0 {
        return Err(IkError::NoSegments);
    }
    let needed = segment_count + 1;
    if needed > skeleton.len() {
        return Err(IkError::SegmentCountExceedsSkeleton {
            requested: segment_count,
            needed,
            available: skeleton.len(),
        });
    }

    let bind = &skeleton[skeleton.len() - needed..];
    let mut joints = Vec::with_capacity(needed);
    let mut last_direction = Vector3::zeros();
    for (index, pose) in bind.iter().enumerate() {
        let position = pose.translation.vector;
        let (rest_length, initial_direction) = match bind.get(index + 1) {
            Some(next) => {
                let offset = next.translation.vector - position;
                let length = offset.norm();
                if length <= DIRECTION_EPSILON {
                    return Err(IkError::DegenerateSegment { index });
                }
                last_direction = offset / length;
                (length, last_direction)
            }
            None => (0.0, direction_or(&last_direction, &Vector3::z())),
        };
        joints.push(Joint {
            position,
            rotation: pose.rotation,
            rest_length,
            initial_rotation: pose.rotation,
            initial_direction,
        });
    }
    Ok(joints)
}
