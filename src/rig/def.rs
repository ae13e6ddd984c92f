// ==============================================================================
// def.rs — STATIC RIG TOPOLOGY (DATA ONLY)
// ==============================================================================
// A rig is a tree of segments: `segments[0]` is the root (chassis), every other
// segment is the child of exactly one joint. Joints are listed in build order,
// each joint's parent must already exist when it is reached.
//
// Frames:
// - all vectors are body-local, metres / radians
// - `axis_*` and `reference_*` must describe the same world directions at rest
//   (before `rest_angle` is applied); they may differ between the two bodies
// - `pivot_*` is where the hinge sits in each body; nothing checks that the
//   shapes actually touch there
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::input::Action;
use crate::physics::Material;
use crate::rig_servo::{AngleLimits, JointServo};

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentRole {
    Chassis,
    Turret,
    Boom,
    Stick,
    Bucket,
    TipperBed,
    PlowArm,
    PlowBlade,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Cuboid { half_extents: [f32; 3] },
    /// Along local Y.
    Cylinder { half_height: f32, radius: f32 },
    ConvexHull { points: &'static [[f32; 3]] },
}

impl Shape {
    /// Distance from the body origin to the bottom of the shape along local Y.
    pub fn half_height(&self) -> f32 {
        match self {
            Shape::Cuboid { half_extents } => half_extents[1],
            Shape::Cylinder { half_height, .. } => *half_height,
            Shape::ConvexHull { points } => points
                .iter()
                .map(|p| -p[1])
                .fold(0.0_f32, f32::max),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentDef {
    pub role: SegmentRole,
    pub shape: Shape,
    pub mass: f32,            // kg
    pub linear_damping: f32,  // drag
    pub angular_damping: f32, // rotational drag
    pub material: Material,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointDef {
    pub name: &'static str,
    pub parent: SegmentRole,
    pub child: SegmentRole,

    pub pivot_parent: [f32; 3],
    pub pivot_child: [f32; 3],
    pub axis_parent: [f32; 3],
    pub axis_child: [f32; 3],
    pub reference_parent: [f32; 3], // "up" for elevation joints, "forward" for yaw joints
    pub reference_child: [f32; 3],

    pub rest_angle: f32,   // rad, spawn pose of child relative to parent
    pub max_torque: f32,   // N·m
    pub motor_factor: f32, // velocity-motor damping
    pub limits: Option<AngleLimits>,
    pub servo: JointServo,

    pub positive: Action, // drives the angle up
    pub negative: Action,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocomotionConfig {
    pub max_velocity: f32,     // m/s
    pub acceleration: f32,     // m/s per tick of ramp
    pub damping: f32,          // ramp decay per idle tick
    pub drive_gain: f32,       // 1/s, force = rig_mass · gain · (ramp - v_forward)
    pub turn_speed: f32,       // rad/s, yaw rate while turning
    pub yaw_decay: f32,        // yaw rate decay per idle tick
    pub track_half_width: f32, // m, lateral offset of each track force
    pub turn_bias: f32,        // N per kg of rig mass moved between tracks while turning
    pub max_tilt_rate: f32,    // rad/s clamp on pitch/roll rate
}

/// Which keys pick up and release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectorTrigger {
    /// Release wins while something is carried.
    Split { pickup: Action, release: Action },
    /// One key: pressing while carrying releases, otherwise picks up while held.
    Shared(Action),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectorConfig {
    pub segment: SegmentRole,
    pub tip: [f32; 3],      // local scan point
    pub pickup_radius: f32, // m
    pub capacity: usize,
    pub trigger: EffectorTrigger,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigDef {
    pub segments: &'static [SegmentDef],
    pub joints: &'static [JointDef],
    pub locomotion: LocomotionConfig,
    pub effector: Option<EffectorConfig>,
}

impl RigDef {
    pub fn root(&self) -> Option<&SegmentDef> {
        self.segments.first()
    }

    pub fn segment(&self, role: SegmentRole) -> Option<&SegmentDef> {
        self.segments.iter().find(|s| s.role == role)
    }

    pub fn total_mass(&self) -> f32 {
        self.segments.iter().map(|s| s.mass).sum()
    }
}

pub const fn deg(d: f32) -> f32 {
    d * std::f32::consts::PI / 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hull_half_height_is_lowest_point() {
        const PTS: [[f32; 3]; 3] = [[0.0, -0.3, 0.0], [1.0, 0.5, 0.0], [0.0, -0.1, 1.0]];
        assert_eq!(Shape::ConvexHull { points: &PTS }.half_height(), 0.3);
        assert_eq!(Shape::Cuboid { half_extents: [1.0, 0.45, 2.0] }.half_height(), 0.45);
    }

    #[test]
    fn test_deg() {
        assert!((deg(-60.0) + std::f32::consts::FRAC_PI_3).abs() < 1e-6);
    }
}
