// ==============================================================================
// ramp.rs — TRACKED LOCOMOTION MODEL (NO PHYSICS)
// ==============================================================================
// Responsibilities:
// - Ramp the commanded forward speed toward ±max_velocity while a drive key is
//   held, decay it geometrically when idle.
// - Split a longitudinal drive force into a left/right track pair, biased
//   oppositely while turning (right track pushes harder on a left turn). The
//   bias is scaled by the yaw-rate error, so the couple only ever pushes the
//   chassis toward the commanded rate and vanishes once it is reached.
// - Produce the yaw rate to set directly on the chassis: ±turn_speed while a
//   turn key is held, geometric decay otherwise.
//
// Sign conventions (chassis local frame, forward = -Z, up = +Y):
// - throttle  +1 forward, -1 backward
// - turn      +1 left (positive yaw about +Y), -1 right
// ==============================================================================

/// Scalar forward-speed ramp (m/s).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForwardRamp {
    pub velocity: f32,
}

impl ForwardRamp {
    pub fn update(&mut self, throttle: f32, acceleration: f32, max_velocity: f32, damping: f32) -> f32 {
        if throttle > 0.0 {
            self.velocity = (self.velocity + acceleration).min(max_velocity);
        } else if throttle < 0.0 {
            self.velocity = (self.velocity - acceleration).max(-max_velocity);
        } else {
            self.velocity *= damping;
            if self.velocity.abs() < 1e-4 {
                self.velocity = 0.0;
            }
        }
        self.velocity
    }
}

/// Left/right track forces (N) along the chassis forward axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackForces {
    pub left: f32,
    pub right: f32,
}

pub fn track_forces(drive_force: f32, turn: f32, turn_bias: f32) -> TrackForces {
    let half = drive_force * 0.5;
    let bias = turn * turn_bias;
    TrackForces {
        left: half - bias,
        right: half + bias,
    }
}

/// Signed share of the track bias to apply: the yaw-rate error relative to
/// `turn_speed`, in [-1, 1]. Negative while the chassis yaws faster left than
/// commanded (or keeps yawing left after release).
pub fn turn_correction(turn: f32, current: f32, turn_speed: f32) -> f32 {
    if turn_speed <= 0.0 {
        return 0.0;
    }
    let commanded = if turn == 0.0 { 0.0 } else { turn.signum() * turn_speed };
    ((commanded - current) / turn_speed).clamp(-1.0, 1.0)
}

/// Yaw rate (rad/s) to write onto the chassis this tick.
pub fn yaw_rate(turn: f32, current: f32, turn_speed: f32, decay: f32) -> f32 {
    if turn != 0.0 {
        turn.signum() * turn_speed
    } else {
        current * decay
    }
}
