//! Joint controller: drive keys map to constant motor speed, idle joints hold
//! their angle (PD or zero speed, per joint).
//!
//! A drive that would carry the joint past a limit within one tick
//! (`arm_speed · dt`) is treated as idle and stops the motor, so the joint
//! halts at the boundary instead of overshooting it.

use rapier3d::prelude::{ImpulseJointSet, RigidBodySet};

use crate::input::ActionSet;
use crate::rig::segment::Joint;
use crate::rig_servo::{DriveCommand, servo_command};

pub fn drive_joints(
    joints: &mut [Joint],
    actions: &ActionSet,
    bodies: &mut RigidBodySet,
    impulse_joints: &mut ImpulseJointSet,
    dt: f32,
) {
    for joint in joints.iter_mut() {
        let Some(angle) = joint.relative_angle(bodies) else {
            continue;
        };

        let mut drive = DriveCommand::from_keys(
            actions.contains(joint.positive),
            actions.contains(joint.negative),
        );
        let step = joint.servo.arm_speed * dt;
        let blocked = joint.limits.is_some_and(|l| l.blocks(angle, drive, step));
        if blocked {
            drive = DriveCommand::Idle;
        }

        match servo_command(&mut joint.pd, drive, angle, &joint.servo, joint.limits, dt) {
            Some(speed) => joint.set_motor_speed(impulse_joints, bodies, speed),
            None if blocked => joint.set_motor_speed(impulse_joints, bodies, 0.0),
            None => {}
        }
    }
}
