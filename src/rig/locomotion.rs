// ==============================================================================
// locomotion.rs — TRACK FORCE-PAIR DRIVE ON THE CHASSIS
// ==============================================================================
// Before the step:
//   v_target = ramp(±acceleration per tick, ×damping when idle)
//   F        = rig_mass · drive_gain · (v_target − v_forward)
//   F split into a left/right pair, each applied along the flattened chassis
//   forward at COM ± right·track_half_width; the pair is biased by
//   turn_bias·(ω_commanded − ω_y)/turn_speed so it never adds yaw past the
//   commanded rate
//   yaw rate written directly: ±turn_speed, or ×yaw_decay when idle
//
// After the step (keep the chassis planted):
//   horizontal speed clamped to max_velocity
//   upward velocity removed
//   pitch/roll rate clamped to ±max_tilt_rate
// ==============================================================================

use nalgebra::{UnitQuaternion, Vector3};
use rapier3d::prelude::RigidBody;

use crate::input::{Action, ActionSet};
use crate::rig::def::LocomotionConfig;
use crate::rig_servo::ramp::{ForwardRamp, track_forces, turn_correction, yaw_rate};

#[derive(Debug, Clone)]
pub struct Locomotion {
    config: LocomotionConfig,
    ramp: ForwardRamp,
    rig_mass: f32, // kg, every segment
}

/// Flattened (forward, right) of a chassis; `None` when it points straight up/down.
fn heading(rot: &UnitQuaternion<f32>) -> Option<(Vector3<f32>, Vector3<f32>)> {
    let mut forward = rot * -Vector3::z();
    forward.y = 0.0;
    let forward = forward.try_normalize(1e-4)?;
    let right = forward.cross(&Vector3::y());
    Some((forward, right))
}

impl Locomotion {
    pub fn new(config: LocomotionConfig, rig_mass: f32) -> Self {
        Self { config, ramp: ForwardRamp::default(), rig_mass }
    }

    /// Ramped target speed (m/s, + forward).
    pub fn forward_velocity(&self) -> f32 {
        self.ramp.velocity
    }

    pub fn apply_drive(&mut self, actions: &ActionSet, chassis: &mut RigidBody) {
        let c = self.config;
        let throttle = actions.axis(Action::DriveForward, Action::DriveBackward);
        let turn = actions.axis(Action::TurnLeft, Action::TurnRight);

        let target = self.ramp.update(throttle, c.acceleration, c.max_velocity, c.damping);

        let w = *chassis.angvel();
        chassis.reset_forces(false);
        if let Some((forward, right)) = heading(chassis.rotation()) {
            let v_forward = chassis.linvel().dot(&forward);
            let drive_force = self.rig_mass * c.drive_gain * (target - v_forward);
            let correction = turn_correction(turn, w.y, c.turn_speed);
            let tracks = track_forces(drive_force, correction, c.turn_bias * self.rig_mass);

            let com = *chassis.center_of_mass();
            let offset = right * c.track_half_width;
            chassis.add_force_at_point(forward * tracks.left, com - offset, true);
            chassis.add_force_at_point(forward * tracks.right, com + offset, true);
        }

        let yaw = yaw_rate(turn, w.y, c.turn_speed, c.yaw_decay);
        chassis.set_angvel(Vector3::new(w.x, yaw, w.z), true);
    }

    pub fn stabilize(&self, chassis: &mut RigidBody) {
        let c = self.config;

        let v = *chassis.linvel();
        let mut clamped = v;
        let horizontal = (v.x * v.x + v.z * v.z).sqrt();
        if horizontal > c.max_velocity {
            let scale = c.max_velocity / horizontal;
            clamped.x *= scale;
            clamped.z *= scale;
        }
        clamped.y = clamped.y.min(0.0);
        if clamped != v {
            chassis.set_linvel(clamped, true);
        }

        let w = *chassis.angvel();
        let tilt = c.max_tilt_rate;
        let limited = Vector3::new(w.x.clamp(-tilt, tilt), w.y, w.z.clamp(-tilt, tilt));
        if limited != w {
            chassis.set_angvel(limited, true);
        }
    }
}
