// ==============================================================================
// vehicle.rs — VEHICLE KINDS, PRESET RIGS AND DEFAULT KEY BINDINGS
// ==============================================================================
// Every vehicle is the same rig engine fed a different `RigDef`. Only the data
// below differs per kind: segment shapes, hinge placement, gains, limits and
// which keys map to which joint.
//
// Chassis local frame: forward = -Z, up = +Y, right = +X.
// Elevation joints hinge about +X with "up" as reference: a positive angle
// swings the child's +Y toward +Z.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::input::{Action, KeyBindings};
use crate::physics::Material;
use crate::rig::def::{
    EffectorConfig, EffectorTrigger, JointDef, LocomotionConfig, RigDef, SegmentDef, SegmentRole,
    Shape, deg,
};
use crate::rig_servo::{AngleLimits, HoldMode, JointServo, PdGains};

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleKind {
    Excavator,
    DumpTruck,
    SnowPlow,
}

impl VehicleKind {
    pub const ALL: [VehicleKind; 3] = [VehicleKind::Excavator, VehicleKind::DumpTruck, VehicleKind::SnowPlow];

    pub fn def(self) -> &'static RigDef {
        match self {
            VehicleKind::Excavator => &EXCAVATOR,
            VehicleKind::DumpTruck => &DUMP_TRUCK,
            VehicleKind::SnowPlow => &SNOW_PLOW,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VehicleKind::Excavator => "excavator",
            VehicleKind::DumpTruck => "dump truck",
            VehicleKind::SnowPlow => "snow plow",
        }
    }

    pub fn default_bindings(self) -> KeyBindings {
        let mut pairs = vec![
            ("KeyW", Action::DriveForward),
            ("KeyS", Action::DriveBackward),
            ("KeyA", Action::TurnLeft),
            ("KeyD", Action::TurnRight),
        ];
        match self {
            VehicleKind::Excavator => pairs.extend([
                ("KeyQ", Action::TurretLeft),
                ("KeyE", Action::TurretRight),
                ("KeyI", Action::BoomUp),
                ("KeyK", Action::BoomDown),
                ("KeyL", Action::StickOut),
                ("KeyJ", Action::StickIn),
                ("KeyO", Action::BucketDump),
                ("KeyU", Action::BucketCurl),
                ("Space", Action::Dig),
                ("KeyR", Action::Release),
            ]),
            VehicleKind::DumpTruck => pairs.extend([
                ("KeyI", Action::TipperRaise),
                ("KeyK", Action::TipperLower),
            ]),
            VehicleKind::SnowPlow => pairs.extend([
                ("KeyI", Action::PlowRaise),
                ("KeyK", Action::PlowLower),
                ("KeyJ", Action::BladeLeft),
                ("KeyL", Action::BladeRight),
            ]),
        }
        KeyBindings::from_pairs(&pairs)
    }
}

// ----- shared tuning ---------------------------------------------------------

const X: [f32; 3] = [1.0, 0.0, 0.0];
const Y: [f32; 3] = [0.0, 1.0, 0.0];
const FORWARD: [f32; 3] = [0.0, 0.0, -1.0];

const MOTOR_FACTOR: f32 = 500.0;

const ARM_HOLD: HoldMode = HoldMode::Pd(PdGains {
    kp: 20.0,               // rad/s per rad
    kd: 0.2,                // rad/s per rad/s
    max_control_speed: 0.5, // rad/s
});

const TRACKED: LocomotionConfig = LocomotionConfig {
    max_velocity: 3.0,     // m/s
    acceleration: 0.1,     // m/s per tick
    damping: 0.95,         // per idle tick
    drive_gain: 10.0,      // 1/s
    turn_speed: 0.6,       // rad/s
    yaw_decay: 0.8,        // per idle tick
    track_half_width: 1.1, // m
    turn_bias: 1.5,        // N/kg
    max_tilt_rate: 0.5,    // rad/s
};

// ----- excavator -------------------------------------------------------------

const BUCKET_HULL: [[f32; 3]; 8] = [
    [-0.45, -0.3, -0.2],
    [0.45, -0.3, -0.2],
    [-0.45, -0.3, 0.2],
    [0.45, -0.3, 0.2],
    [-0.45, 0.3, -0.25],
    [0.45, 0.3, -0.25],
    [-0.45, 0.3, 0.05],
    [0.45, 0.3, 0.05],
];

pub const EXCAVATOR_BUCKET: EffectorConfig = EffectorConfig {
    segment: SegmentRole::Bucket,
    tip: [0.0, 0.45, -0.1],
    pickup_radius: 0.4,
    capacity: 20,
    trigger: EffectorTrigger::Split {
        pickup: Action::Dig,
        release: Action::Release,
    },
};

pub const EXCAVATOR: RigDef = RigDef {
    segments: &[
        SegmentDef {
            role: SegmentRole::Chassis,
            shape: Shape::Cuboid { half_extents: [1.3, 0.45, 2.0] },
            mass: 6000.0,
            linear_damping: 0.1,
            angular_damping: 0.5,
            material: Material::Track,
        },
        SegmentDef {
            role: SegmentRole::Turret,
            shape: Shape::Cuboid { half_extents: [1.1, 0.4, 1.2] },
            mass: 3000.0,
            linear_damping: 0.1,
            angular_damping: 0.5,
            material: Material::Steel,
        },
        SegmentDef {
            role: SegmentRole::Boom,
            shape: Shape::Cuboid { half_extents: [0.15, 1.6, 0.2] },
            mass: 600.0,
            linear_damping: 0.1,
            angular_damping: 0.8,
            material: Material::Steel,
        },
        SegmentDef {
            role: SegmentRole::Stick,
            shape: Shape::Cuboid { half_extents: [0.12, 0.8, 0.15] },
            mass: 300.0,
            linear_damping: 0.1,
            angular_damping: 0.8,
            material: Material::Steel,
        },
        SegmentDef {
            role: SegmentRole::Bucket,
            shape: Shape::ConvexHull { points: &BUCKET_HULL },
            mass: 150.0,
            linear_damping: 0.1,
            angular_damping: 0.8,
            material: Material::Steel,
        },
    ],
    joints: &[
        JointDef {
            name: "turret",
            parent: SegmentRole::Chassis,
            child: SegmentRole::Turret,
            pivot_parent: [0.0, 0.45, 0.0],
            pivot_child: [0.0, -0.4, 0.0],
            axis_parent: Y,
            axis_child: Y,
            reference_parent: FORWARD,
            reference_child: FORWARD,
            rest_angle: 0.0,
            max_torque: 100_000.0,
            motor_factor: MOTOR_FACTOR,
            limits: None,
            servo: JointServo { arm_speed: 0.5, hold: HoldMode::ZeroSpeed },
            positive: Action::TurretLeft,
            negative: Action::TurretRight,
        },
        JointDef {
            name: "boom",
            parent: SegmentRole::Turret,
            child: SegmentRole::Boom,
            pivot_parent: [0.0, 0.4, -0.9],
            pivot_child: [0.0, -1.6, 0.0],
            axis_parent: X,
            axis_child: X,
            reference_parent: Y,
            reference_child: Y,
            rest_angle: deg(-60.0),
            max_torque: 200_000.0,
            motor_factor: MOTOR_FACTOR,
            limits: Some(AngleLimits::new(deg(-75.0), deg(60.0))),
            servo: JointServo { arm_speed: 0.6, hold: ARM_HOLD },
            positive: Action::BoomUp,
            negative: Action::BoomDown,
        },
        JointDef {
            name: "stick",
            parent: SegmentRole::Boom,
            child: SegmentRole::Stick,
            pivot_parent: [0.0, 1.6, 0.0],
            pivot_child: [0.0, -0.8, 0.0],
            axis_parent: X,
            axis_child: X,
            reference_parent: Y,
            reference_child: Y,
            rest_angle: deg(-120.0),
            max_torque: 80_000.0,
            motor_factor: MOTOR_FACTOR,
            limits: Some(AngleLimits::new(deg(-150.0), deg(-30.0))),
            servo: JointServo { arm_speed: 0.6, hold: ARM_HOLD },
            positive: Action::StickOut,
            negative: Action::StickIn,
        },
        JointDef {
            name: "bucket",
            parent: SegmentRole::Stick,
            child: SegmentRole::Bucket,
            pivot_parent: [0.0, 0.8, 0.0],
            pivot_child: [0.0, -0.3, 0.0],
            axis_parent: X,
            axis_child: X,
            reference_parent: Y,
            reference_child: Y,
            rest_angle: deg(-30.0),
            max_torque: 30_000.0,
            motor_factor: MOTOR_FACTOR,
            limits: Some(AngleLimits::new(deg(-120.0), deg(40.0))),
            servo: JointServo { arm_speed: 0.8, hold: ARM_HOLD },
            positive: Action::BucketDump,
            negative: Action::BucketCurl,
        },
    ],
    locomotion: TRACKED,
    effector: Some(EXCAVATOR_BUCKET),
};

// ----- dump truck ------------------------------------------------------------

pub const DUMP_TRUCK: RigDef = RigDef {
    segments: &[
        SegmentDef {
            role: SegmentRole::Chassis,
            shape: Shape::Cuboid { half_extents: [1.2, 0.5, 3.0] },
            mass: 8000.0,
            linear_damping: 0.1,
            angular_damping: 0.5,
            material: Material::Track,
        },
        SegmentDef {
            role: SegmentRole::TipperBed,
            shape: Shape::Cuboid { half_extents: [1.1, 0.3, 1.8] },
            mass: 2000.0,
            linear_damping: 0.1,
            angular_damping: 0.8,
            material: Material::Steel,
        },
    ],
    joints: &[JointDef {
        name: "tipper",
        parent: SegmentRole::Chassis,
        child: SegmentRole::TipperBed,
        pivot_parent: [0.0, 0.5, 3.0], // rear top edge
        pivot_child: [0.0, -0.3, 1.8],
        axis_parent: X,
        axis_child: X,
        reference_parent: Y,
        reference_child: Y,
        rest_angle: 0.0,
        max_torque: 150_000.0,
        motor_factor: MOTOR_FACTOR,
        limits: Some(AngleLimits::new(deg(-1.0), deg(50.0))),
        servo: JointServo { arm_speed: 0.4, hold: ARM_HOLD },
        positive: Action::TipperRaise,
        negative: Action::TipperLower,
    }],
    locomotion: LocomotionConfig {
        max_velocity: 4.0,
        acceleration: 0.12,
        track_half_width: 1.0,
        ..TRACKED
    },
    effector: None,
};

// ----- snow plow -------------------------------------------------------------

pub const SNOW_PLOW: RigDef = RigDef {
    segments: &[
        SegmentDef {
            role: SegmentRole::Chassis,
            shape: Shape::Cuboid { half_extents: [1.1, 0.5, 2.2] },
            mass: 5000.0,
            linear_damping: 0.1,
            angular_damping: 0.5,
            material: Material::Track,
        },
        SegmentDef {
            role: SegmentRole::PlowArm,
            shape: Shape::Cuboid { half_extents: [0.15, 0.15, 0.5] },
            mass: 150.0,
            linear_damping: 0.1,
            angular_damping: 0.8,
            material: Material::Steel,
        },
        SegmentDef {
            role: SegmentRole::PlowBlade,
            shape: Shape::Cuboid { half_extents: [1.6, 0.4, 0.08] },
            mass: 400.0,
            linear_damping: 0.1,
            angular_damping: 0.8,
            material: Material::Steel,
        },
    ],
    joints: &[
        JointDef {
            name: "plow_arm",
            parent: SegmentRole::Chassis,
            child: SegmentRole::PlowArm,
            pivot_parent: [0.0, 0.0, -2.2], // front face
            pivot_child: [0.0, 0.0, 0.5],
            axis_parent: X,
            axis_child: X,
            reference_parent: Y,
            reference_child: Y,
            rest_angle: 0.0,
            max_torque: 60_000.0,
            motor_factor: MOTOR_FACTOR,
            limits: Some(AngleLimits::new(deg(-10.0), deg(30.0))),
            servo: JointServo { arm_speed: 0.4, hold: ARM_HOLD },
            positive: Action::PlowRaise,
            negative: Action::PlowLower,
        },
        JointDef {
            name: "blade",
            parent: SegmentRole::PlowArm,
            child: SegmentRole::PlowBlade,
            pivot_parent: [0.0, 0.0, -0.5],
            pivot_child: [0.0, 0.0, 0.1],
            axis_parent: Y,
            axis_child: Y,
            reference_parent: FORWARD,
            reference_child: FORWARD,
            rest_angle: 0.0,
            max_torque: 20_000.0,
            motor_factor: MOTOR_FACTOR,
            limits: Some(AngleLimits::new(deg(-35.0), deg(35.0))),
            servo: JointServo { arm_speed: 0.5, hold: HoldMode::ZeroSpeed },
            positive: Action::BladeLeft,
            negative: Action::BladeRight,
        },
    ],
    locomotion: LocomotionConfig {
        max_velocity: 3.5,
        track_half_width: 1.0,
        ..TRACKED
    },
    effector: None,
};
