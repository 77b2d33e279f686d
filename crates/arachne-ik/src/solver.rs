//! FABRIK (Forward And Backward Reaching) solver.
//!
//! Each solve runs a reachability test, then either lays the chain straight
//! toward the goal or alternates leaf-anchored and root-anchored passes until
//! the leaf is within tolerance. Interior joints are then twisted toward the
//! pole hint, and joint rotations are rebuilt from the solved positions.

use nalgebra::{Unit, UnitQuaternion, Vector3};

use arachne_core::config::SolverConfig;
use arachne_core::math::{direction_or, from_to_rotation, project_on_plane, signed_angle, try_direction};

use crate::chain::{ChainState, Joint, KinematicChain};
use crate::error::IkError;

/// Configuration for the FABRIK solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FabrikConfig {
    /// Maximum backward + forward pass pairs per solve.
    pub max_iterations: u32,
    /// Leaf-to-goal distance below which bending stops.
    pub tolerance: f32,
}

impl Default for FabrikConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance: 0.01,
        }
    }
}

impl From<&SolverConfig> for FabrikConfig {
    fn from(config: &SolverConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            tolerance: config.convergence_tolerance,
        }
    }
}

/// Result of a FABRIK solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkResult {
    /// Reachability outcome.
    pub state: ChainState,
    /// Whether the leaf ended within tolerance of the goal.
    pub converged: bool,
    /// Pass pairs run. Zero when stretched or already converged.
    pub iterations: u32,
    /// Final leaf-to-goal distance.
    pub position_error: f32,
}

/// FABRIK solver.
#[derive(Debug, Clone, Default)]
pub struct FabrikSolver {
    config: FabrikConfig,
}

impl FabrikSolver {
    pub const fn new(config: FabrikConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &FabrikConfig {
        &self.config
    }

    /// Solve `chain` toward its goal in place.
    ///
    /// Returns [`IkError::MissingGoal`] without touching the chain if no goal
    /// is set.
    pub fn solve(&self, chain: &mut KinematicChain) -> Result<IkResult, IkError> {
        let goal = *chain.goal().ok_or(IkError::MissingGoal)?;
        let target = goal.translation.vector;
        let reach = chain.total_length();
        let pole = chain.pole().copied();
        let aligned_pole = chain.aligned_pole().copied();
        let goal_delta = goal.rotation * chain.initial_goal_rotation().inverse();
        let tolerance_sq = self.config.tolerance * self.config.tolerance;

        let joints = chain.joints_mut();
        let root = joints[0].position;

        let (state, iterations, aligned) = if (target - root).norm_squared() >= reach * reach {
            stretch(joints, &target);
            (ChainState::Stretched, 0, None)
        } else {
            let iterations = self.bend(joints, &target, tolerance_sq);
            // The sweep is not a fixed point on 3+ segments, so an untouched
            // pose already twisted toward the same pole is left as is.
            match pole {
                Some(pole) if iterations > 0 || aligned_pole != Some(pole) => {
                    align_to_pole(joints, &pole);
                }
                _ => {}
            }
            (ChainState::Bent, iterations, pole)
        };

        rebuild_rotations(joints, &goal_delta);

        let error_sq = (joints[joints.len() - 1].position - target).norm_squared();
        chain.set_state(state);
        chain.set_aligned_pole(aligned);

        Ok(IkResult {
            state,
            converged: error_sq < tolerance_sq,
            iterations,
            position_error: error_sq.sqrt(),
        })
    }

    fn bend(&self, joints: &mut [Joint], target: &Vector3<f32>, tolerance_sq: f32) -> u32 {
        let leaf = joints.len() - 1;
        let mut iterations = 0;

        for _ in 0..self.config.max_iterations {
            if (joints[leaf].position - target).norm_squared() < tolerance_sq {
                break;
            }

            // Backward: pin the leaf, walk toward the root (root excluded).
            joints[leaf].position = *target;
            for i in (1..leaf).rev() {
                let fallback = -joints[i].initial_direction();
                let dir = direction_or(&(joints[i].position - joints[i + 1].position), &fallback);
                joints[i].position = joints[i + 1].position + dir * joints[i].rest_length();
            }

            // Forward: root stays on its anchor, walk outward.
            for i in 1..=leaf {
                let fallback = *joints[i - 1].initial_direction();
                let dir = direction_or(&(joints[i].position - joints[i - 1].position), &fallback);
                joints[i].position = joints[i - 1].position + dir * joints[i - 1].rest_length();
            }

            iterations += 1;
        }
        iterations
    }
}

/// Lay every joint on the root-to-target ray at cumulative rest lengths.
fn stretch(joints: &mut [Joint], target: &Vector3<f32>) {
    let root = joints[0].position;
    let dir = direction_or(&(target - root), joints[0].initial_direction());
    let mut along = 0.0;
    for i in 1..joints.len() {
        along += joints[i - 1].rest_length();
        joints[i].position = root + dir * along;
    }
}

/// Twist each interior joint about the line through its neighbours so it
/// faces `pole`. Leaves neighbour distances unchanged.
fn align_to_pole(joints: &mut [Joint], pole: &Vector3<f32>) {
    for i in 1..joints.len() - 1 {
        let origin = joints[i - 1].position;
        let Some(normal) = try_direction(&(joints[i + 1].position - origin)) else {
            continue;
        };
        let projected_pole = project_on_plane(pole, &origin, &normal);
        let projected_joint = project_on_plane(&joints[i].position, &origin, &normal);
        let angle = signed_angle(
            &(projected_joint - origin),
            &(projected_pole - origin),
            &normal,
        );
        let twist = UnitQuaternion::from_axis_angle(&Unit::new_unchecked(normal), angle);
        joints[i].position = origin + twist * (joints[i].position - origin);
    }
}

/// Non-leaf joints: rotation taking the bind direction onto the solved one,
/// applied to the bind rotation. Leaf: the goal's rotation delta since bind.
fn rebuild_rotations(joints: &mut [Joint], goal_delta: &UnitQuaternion<f32>) {
    let leaf = joints.len() - 1;
    for i in 0..leaf {
        let solved = joints[i + 1].position - joints[i].position;
        joints[i].rotation =
            from_to_rotation(joints[i].initial_direction(), &solved) * joints[i].initial_rotation();
    }
    joints[leaf].rotation = goal_delta * joints[leaf].initial_rotation();
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Isometry3;
    use arachne_test_utils::{random_skeleton, seeded_rng};
    use rand::Rng;

    fn at(x: f32, y: f32, z: f32) -> Isometry3<f32> {
        Isometry3::translation(x, y, z)
    }

    /// Two unit segments bent upward at the middle joint.
    fn bent_two_segment() -> KinematicChain {
        let skeleton = [at(0.0, 0.0, 0.0), at(0.5, 0.0, 0.866_025_4), at(1.0, 0.0, 0.0)];
        KinematicChain::from_bind_pose(&skeleton, UnitQuaternion::identity(), 2).unwrap()
    }

    fn straight_two_segment() -> KinematicChain {
        let skeleton = [at(0.0, 0.0, 0.0), at(1.0, 0.0, 0.0), at(2.0, 0.0, 0.0)];
        KinematicChain::from_bind_pose(&skeleton, UnitQuaternion::identity(), 2).unwrap()
    }

    fn assert_segment_lengths(chain: &KinematicChain, tolerance: f32) {
        for pair in chain.joints().windows(2) {
            let length = (pair[1].position() - pair[0].position()).norm();
            assert_relative_eq!(length, pair[0].rest_length(), epsilon = tolerance);
        }
    }

    #[test]
    fn default_config() {
        let config = FabrikConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert_relative_eq!(config.tolerance, 0.01);
    }

    #[test]
    fn config_from_solver_section() {
        let section = SolverConfig {
            max_iterations: 4,
            convergence_tolerance: 0.05,
        };
        let config = FabrikConfig::from(&section);
        assert_eq!(config.max_iterations, 4);
        assert_relative_eq!(config.tolerance, 0.05);
    }

    #[test]
    fn missing_goal_is_error_and_leaves_chain() {
        let mut chain = bent_two_segment();
        let before: Vec<Vector3<f32>> = chain.joints().iter().map(|j| *j.position()).collect();
        let err = FabrikSolver::default().solve(&mut chain).unwrap_err();
        assert_eq!(err, IkError::MissingGoal);
        for (joint, old) in chain.joints().iter().zip(&before) {
            assert_eq!(joint.position(), old);
        }
    }

    #[test]
    fn unreachable_goal_stretches_to_reach() {
        let mut chain = bent_two_segment();
        chain.set_goal(at(3.0, 0.0, 0.0));
        let result = FabrikSolver::default().solve(&mut chain).unwrap();

        assert_eq!(result.state, ChainState::Stretched);
        assert!(chain.is_stretched());
        assert!(!result.converged);
        assert_eq!(result.iterations, 0);
        assert_relative_eq!(result.position_error, 1.0, epsilon = 1e-5);

        let p: Vec<Vector3<f32>> = chain.joints().iter().map(|j| *j.position()).collect();
        assert_relative_eq!(p[0], Vector3::new(0.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(p[1], Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(p[2], Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn goal_at_exact_reach_is_stretched() {
        let mut chain = straight_two_segment();
        chain.set_goal(at(0.0, 2.0, 0.0));
        let result = FabrikSolver::default().solve(&mut chain).unwrap();
        assert_eq!(result.state, ChainState::Stretched);
        assert_relative_eq!(
            *chain.leaf().position(),
            Vector3::new(0.0, 2.0, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn reachable_goal_converges() {
        let mut chain = bent_two_segment();
        chain.set_goal(at(1.5, 0.0, 0.0));
        let result = FabrikSolver::default().solve(&mut chain).unwrap();

        assert_eq!(result.state, ChainState::Bent);
        assert!(result.converged, "error = {}", result.position_error);
        assert_relative_eq!(
            *chain.leaf().position(),
            Vector3::new(1.5, 0.0, 0.0),
            epsilon = 0.01
        );
        assert_segment_lengths(&chain, 0.01);
        assert_relative_eq!(*chain.root(), Vector3::zeros());
        // the knee keeps bending upward
        assert!(chain.joints()[1].position().z > 0.0);
    }

    #[test]
    fn second_solve_is_idempotent() {
        let mut chain = bent_two_segment();
        chain.set_goal(at(1.5, 0.0, 0.0));
        let solver = FabrikSolver::default();
        solver.solve(&mut chain).unwrap();
        let first: Vec<Vector3<f32>> = chain.joints().iter().map(|j| *j.position()).collect();

        let result = solver.solve(&mut chain).unwrap();
        assert_eq!(result.iterations, 0);
        for (joint, old) in chain.joints().iter().zip(&first) {
            assert!((joint.position() - old).norm() < 0.01);
        }
    }

    #[test]
    fn single_segment_points_at_goal() {
        let skeleton = [at(0.0, 0.0, 0.0), at(0.0, 0.0, -1.0)];
        let mut chain =
            KinematicChain::from_bind_pose(&skeleton, UnitQuaternion::identity(), 1).unwrap();
        chain.set_goal(at(0.0, 0.5, 0.0));
        FabrikSolver::default().solve(&mut chain).unwrap();
        assert_relative_eq!(
            *chain.leaf().position(),
            Vector3::new(0.0, 1.0, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn goal_on_root_does_not_produce_nan() {
        let mut chain = bent_two_segment();
        chain.set_goal(at(0.0, 0.0, 0.0));
        FabrikSolver::default().solve(&mut chain).unwrap();
        for joint in chain.joints() {
            assert!(joint.position().iter().all(|v| v.is_finite()));
            assert!(joint.rotation().coords.iter().all(|v| v.is_finite()));
        }
        assert_segment_lengths(&chain, 1e-4);
    }

    #[test]
    fn pole_flips_knee_without_moving_leaf() {
        let mut chain = bent_two_segment();
        chain.set_goal(at(1.5, 0.0, 0.0));
        chain.set_pole(Some(Vector3::new(0.75, 0.0, -2.0)));
        let result = FabrikSolver::default().solve(&mut chain).unwrap();

        assert!(chain.joints()[1].position().z < 0.0);
        assert!(result.converged);
        assert_segment_lengths(&chain, 0.01);
    }

    #[test]
    fn pole_sideways_turns_knee_sideways() {
        let mut chain = bent_two_segment();
        chain.set_goal(at(1.5, 0.0, 0.0));
        chain.set_pole(Some(Vector3::new(0.75, 3.0, 0.0)));
        FabrikSolver::default().solve(&mut chain).unwrap();

        let knee = chain.joints()[1].position();
        assert!(knee.y > 0.6, "knee = {knee:?}");
        assert_relative_eq!(knee.z, 0.0, epsilon = 1e-2);
    }

    #[test]
    fn leaf_inherits_goal_rotation_delta() {
        let bind = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.3);
        let skeleton = [at(0.0, 0.0, 0.0), at(0.5, 0.0, 0.866_025_4), at(1.0, 0.0, 0.0)];
        let mut chain = KinematicChain::from_bind_pose(&skeleton, bind, 2).unwrap();

        let turn = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.5);
        chain.set_goal(Isometry3::from_parts(Vector3::new(1.5, 0.0, 0.0).into(), turn * bind));
        FabrikSolver::default().solve(&mut chain).unwrap();

        assert_relative_eq!(chain.leaf().rotation().angle_to(&turn), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn parent_rotation_follows_solved_direction() {
        let mut chain = straight_two_segment();
        chain.set_goal(at(0.0, 3.0, 0.0));
        FabrikSolver::default().solve(&mut chain).unwrap();

        // bind direction +X, solved direction +Y
        let rotated = chain.joints()[0].rotation() * Vector3::x();
        assert_relative_eq!(rotated, Vector3::y(), epsilon = 1e-5);
    }

    #[test]
    fn segment_lengths_hold_for_random_chains() {
        let mut rng = seeded_rng(42);
        let solver = FabrikSolver::default();

        for _ in 0..200 {
            let segments = rng.gen_range(1..=5);
            let skeleton = random_skeleton(&mut rng, segments);
            let mut chain =
                KinematicChain::from_bind_pose(&skeleton, UnitQuaternion::identity(), segments)
                    .unwrap();
            chain.set_goal(at(
                rng.gen_range(-2.0..2.0),
                rng.gen_range(-2.0..2.0),
                rng.gen_range(-2.0..2.0),
            ));
            if rng.gen_bool(0.5) {
                chain.set_pole(Some(Vector3::new(0.0, 0.0, 5.0)));
            }

            solver.solve(&mut chain).unwrap();
            assert_segment_lengths(&chain, 1e-3);
            assert_relative_eq!(*chain.root(), Vector3::zeros());
        }
    }

    #[test]
    fn resolve_with_pole_is_idempotent_on_long_chains() {
        let mut rng = seeded_rng(5);
        let solver = FabrikSolver::new(FabrikConfig {
            max_iterations: 50,
            tolerance: 0.01,
        });

        for segments in 3..=5 {
            for _ in 0..30 {
                let skeleton = random_skeleton(&mut rng, segments);
                let mut chain = KinematicChain::from_bind_pose(
                    &skeleton,
                    UnitQuaternion::identity(),
                    segments,
                )
                .unwrap();
                let reach = chain.total_length();
                let direction = Vector3::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                )
                .try_normalize(1e-3)
                .unwrap_or_else(Vector3::x);
                let goal = direction * (reach * rng.gen_range(0.5..0.9));
                chain.set_goal(at(goal.x, goal.y, goal.z));
                chain.set_pole(Some(Vector3::new(
                    rng.gen_range(-3.0..3.0),
                    rng.gen_range(-3.0..3.0),
                    rng.gen_range(-3.0..3.0),
                )));

                if !solver.solve(&mut chain).unwrap().converged {
                    continue;
                }
                let first: Vec<Vector3<f32>> =
                    chain.joints().iter().map(|j| *j.position()).collect();

                let result = solver.solve(&mut chain).unwrap();
                assert_eq!(result.iterations, 0);
                for (joint, old) in chain.joints().iter().zip(&first) {
                    assert_relative_eq!(*joint.position(), *old, epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn changed_pole_is_applied_without_goal_change() {
        let mut chain = bent_two_segment();
        chain.set_goal(at(1.5, 0.0, 0.0));
        let solver = FabrikSolver::default();
        solver.solve(&mut chain).unwrap();
        assert!(chain.joints()[1].position().z > 0.0);

        chain.set_pole(Some(Vector3::new(0.75, 0.0, -2.0)));
        let result = solver.solve(&mut chain).unwrap();
        assert_eq!(result.iterations, 0);
        assert!(chain.joints()[1].position().z < 0.0);
    }
}
