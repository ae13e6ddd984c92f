// ==============================================================================
// debug_builders.rs — DEBUG OVERLAY PRIMITIVES (SERVER -> CLIENT)
// ------------------------------------------------------------------------------
// Defines serializable debug primitives:
// - DebugJoint: per-hinge numeric state (angle, PD target, motor speed, limits)
// - DebugEffector: pickup sphere at the effector tip + carried count
//
// Helpers:
// - push_joint_debug(): snapshots one Joint into DebugOverlay
// - push_effector_debug(): snapshots one Effector into DebugOverlay
//
// This file is purely visualization scaffolding and should not contain physics
// side effects.
// ==============================================================================

use rapier3d::prelude::RigidBodySet;
use serde::Serialize;

use crate::rig::RigId;
use crate::rig::effector::Effector;
use crate::rig::segment::Joint;

#[derive(Debug, Clone, Default, Serialize)]
pub struct DebugOverlay {
    pub joints: Vec<DebugJoint>,
    pub effectors: Vec<DebugEffector>,
}

impl DebugOverlay {
    pub fn clear(&mut self) {
        self.joints.clear();
        self.effectors.clear();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugJoint {
    pub rig: RigId,
    pub name: &'static str,
    pub angle: f32,                // rad
    pub target: Option<f32>,       // rad, PD hold target
    pub motor_speed: f32,          // rad/s, last command
    pub limits: Option<[f32; 2]>,  // rad
    pub limiter_fired: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugEffector {
    pub rig: RigId,
    pub tip: [f32; 3],
    pub radius: f32,
    pub carried: usize,
    pub capacity: usize,
}

pub fn push_joint_debug(overlay: &mut DebugOverlay, rig: RigId, joint: &Joint, bodies: &RigidBodySet) {
    let Some(angle) = joint.relative_angle(bodies) else {
        return;
    };
    overlay.joints.push(DebugJoint {
        rig,
        name: joint.name,
        angle,
        target: joint.pd.target_angle,
        motor_speed: joint.commanded_speed(),
        limits: joint.limits.map(|l| [l.min, l.max]),
        limiter_fired: joint.limiter_fired(),
    });
}

pub fn push_effector_debug(overlay: &mut DebugOverlay, rig: RigId, effector: &Effector, bodies: &RigidBodySet) {
    let Some(tip) = effector.tip_world(bodies) else {
        return;
    };
    overlay.effectors.push(DebugEffector {
        rig,
        tip: tip.into(),
        radius: effector.pickup_radius(),
        carried: effector.carried().len(),
        capacity: effector.capacity(),
    });
}
