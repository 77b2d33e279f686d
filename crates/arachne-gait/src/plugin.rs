//! Bevy ECS integration for the locomotion pipeline.
//!
//! Provides [`ArachnePlugin`], which runs the rig's phases as separate
//! systems in `FixedUpdate`, ordered through [`LocomotionSet`].
//!
//! # Usage
//!
//! 1. Add [`ArachnePlugin`] to your app (the host supplies `Time`).
//! 2. Insert a [`RigResource`] wrapping a built
//!    [`LocomotionRig`](crate::LocomotionRig).
//! 3. Insert a [`GroundResource`] wrapping your terrain query.
//! 4. Write the movement signal into [`LocomotionInputResource`] each frame.

use bevy::prelude::*;

use arachne_core::ground::GroundQuery;

use crate::rig::{LocomotionInput, LocomotionRig};

/// Per-tick phases, chained in declaration order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocomotionSet {
    /// Drive the body, anchor chain roots and cast ground rays.
    Sense,
    Solve,
    Gait,
    Stabilize,
}

/// Bevy plugin that ticks a [`RigResource`] every fixed step.
pub struct ArachnePlugin;

impl Plugin for ArachnePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LocomotionInputResource>()
            .configure_sets(
                FixedUpdate,
                (
                    LocomotionSet::Sense,
                    LocomotionSet::Solve,
                    LocomotionSet::Gait,
                    LocomotionSet::Stabilize,
                )
                    .chain(),
            )
            .add_systems(
                FixedUpdate,
                (
                    sense_system.in_set(LocomotionSet::Sense),
                    solve_system.in_set(LocomotionSet::Solve),
                    gait_system.in_set(LocomotionSet::Gait),
                    stabilize_system.in_set(LocomotionSet::Stabilize),
                ),
            );
    }
}

/// The creature being animated.
#[derive(Resource, Debug)]
pub struct RigResource(pub LocomotionRig);

/// Movement signal consumed by the next fixed step.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct LocomotionInputResource(pub LocomotionInput);

/// Terrain query used by ground sensing.
#[derive(Resource)]
pub struct GroundResource(pub Box<dyn GroundQuery + Send + Sync>);

fn sense_system(
    time: Res<Time>,
    input: Res<LocomotionInputResource>,
    ground: Option<Res<GroundResource>>,
    rig: Option<ResMut<RigResource>>,
) {
    let Some(mut rig) = rig else {
        return;
    };
    rig.0.drive(&input.0, time.delta_secs());
    rig.0.anchor();
    if let Some(ground) = ground {
        rig.0.sense(ground.0.as_ref());
    }
}

fn solve_system(rig: Option<ResMut<RigResource>>) {
    if let Some(mut rig) = rig {
        rig.0.solve();
    }
}

fn gait_system(time: Res<Time>, rig: Option<ResMut<RigResource>>) {
    if let Some(mut rig) = rig {
        rig.0.step(time.delta_secs());
    }
}

fn stabilize_system(
    time: Res<Time>,
    input: Res<LocomotionInputResource>,
    rig: Option<ResMut<RigResource>>,
) {
    if let Some(mut rig) = rig {
        rig.0.stabilize(input.0.yaw_delta, time.delta_secs());
    }
}
