//! rig_servo - engine-agnostic joint servo helpers (pure types + PD + track model)

pub mod types;
pub mod angle;
pub mod pd;
pub mod ramp;
pub mod gripper;

pub use types::*;
pub use pd::servo_command;
