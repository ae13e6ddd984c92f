//! Segment and joint handles. Control code reads and writes joints only through
//! [`Joint::relative_angle`], [`Joint::set_motor_speed`] and
//! [`Joint::clamp_if_exceeds`]; no quaternion math happens anywhere else.

use nalgebra::{UnitQuaternion, Vector3};
use rapier3d::prelude::{
    ColliderHandle, ImpulseJointHandle, ImpulseJointSet, JointAxis, RigidBodyHandle, RigidBodySet,
};

use crate::input::Action;
use crate::rig::def::{JointDef, SegmentRole};
use crate::rig_servo::angle::joint_angle;
use crate::rig_servo::{AngleLimits, HoldMode, JointServo, PdState};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub role: SegmentRole,
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

/// World position (body origin) and orientation.
pub fn body_pose(bodies: &RigidBodySet, handle: RigidBodyHandle) -> Option<(Vector3<f32>, UnitQuaternion<f32>)> {
    let body = bodies.get(handle)?;
    Some((*body.translation(), *body.rotation()))
}

#[derive(Debug, Clone)]
pub struct Joint {
    pub name: &'static str,
    pub handle: ImpulseJointHandle,
    pub parent: RigidBodyHandle,
    pub child: RigidBodyHandle,
    pub limits: Option<AngleLimits>,
    pub servo: JointServo,
    pub positive: Action,
    pub negative: Action,
    pub pd: PdState,

    axis_parent: Vector3<f32>,
    reference_parent: Vector3<f32>,
    reference_child: Vector3<f32>,
    motor_factor: f32,
    commanded_speed: f32,
    limiter_fired: bool,
}

impl Joint {
    pub fn new(
        def: &JointDef,
        handle: ImpulseJointHandle,
        parent: RigidBodyHandle,
        child: RigidBodyHandle,
    ) -> Self {
        // PD joints start out holding their spawn pose.
        let pd = match def.servo.hold {
            HoldMode::Pd(_) => PdState {
                target_angle: Some(def.limits.map_or(def.rest_angle, |l| l.clamp(def.rest_angle))),
                previous_angle: None,
            },
            HoldMode::ZeroSpeed => PdState::default(),
        };
        Self {
            name: def.name,
            handle,
            parent,
            child,
            limits: def.limits,
            servo: def.servo,
            positive: def.positive,
            negative: def.negative,
            pd,
            axis_parent: Vector3::from(def.axis_parent),
            reference_parent: Vector3::from(def.reference_parent),
            reference_child: Vector3::from(def.reference_child),
            motor_factor: def.motor_factor,
            commanded_speed: 0.0,
            limiter_fired: false,
        }
    }

    /// Signed child-relative-to-parent angle about the hinge (rad).
    pub fn relative_angle(&self, bodies: &RigidBodySet) -> Option<f32> {
        let parent = bodies.get(self.parent)?;
        let child = bodies.get(self.child)?;
        Some(joint_angle(
            parent.rotation(),
            child.rotation(),
            &self.axis_parent,
            &self.reference_parent,
            &self.reference_child,
        ))
    }

    /// Sets the hinge motor target. Both bodies are woken when the speed
    /// changes so a sleeping arm picks up the new command.
    pub fn set_motor_speed(&mut self, joints: &mut ImpulseJointSet, bodies: &mut RigidBodySet, speed: f32) {
        let Some(joint) = joints.get_mut(self.handle) else {
            return;
        };
        joint
            .data
            .set_motor_velocity(JointAxis::AngX, speed, self.motor_factor);
        if speed != self.commanded_speed {
            for handle in [self.parent, self.child] {
                if let Some(body) = bodies.get_mut(handle) {
                    body.wake_up(true);
                }
            }
        }
        self.commanded_speed = speed;
    }

    /// Zeroes the child's whole angular velocity when the angle is outside the
    /// limits. Returns whether it fired.
    pub fn clamp_if_exceeds(&mut self, bodies: &mut RigidBodySet) -> bool {
        self.limiter_fired = false;
        let Some(limits) = self.limits else {
            return false;
        };
        let Some(angle) = self.relative_angle(bodies) else {
            return false;
        };
        if limits.contains(angle) {
            return false;
        }
        if let Some(child) = bodies.get_mut(self.child) {
            child.set_angvel(Vector3::zeros(), true);
            self.limiter_fired = true;
        }
        self.limiter_fired
    }

    pub fn commanded_speed(&self) -> f32 {
        self.commanded_speed
    }

    pub fn limiter_fired(&self) -> bool {
        self.limiter_fired
    }
}
