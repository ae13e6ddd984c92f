//! Post-step angle limiter. Reactive only: a joint outside its window has its
//! child's angular velocity zeroed for this tick, so it may stick at the edge.

use rapier3d::prelude::RigidBodySet;

use crate::rig::segment::Joint;

/// Returns how many joints were clamped.
pub fn enforce_limits(joints: &mut [Joint], bodies: &mut RigidBodySet) -> usize {
    joints
        .iter_mut()
        .map(|joint| joint.clamp_if_exceeds(bodies))
        .filter(|fired| *fired)
        .count()
}
