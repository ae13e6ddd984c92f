// ==============================================================================
// pd.rs — JOINT SERVO: MANUAL DRIVE OR PD POSITION HOLD
// ==============================================================================
// Per controlled joint, per tick:
//
//   drive key held   -> motor = ±arm_speed, PD memory cleared
//   idle, first tick -> target = θ clamped into the limits, previous = θ,
//                       motor untouched (no derivative yet)
//   idle, afterwards -> e     = target - θ
//                       rate  = (θ - previous) / dt
//                       motor = clamp(kp·e - kd·rate, ±max_control_speed)
//                       previous = θ
//
// `dt` must be the fixed physics step; the derivative is meaningless otherwise.
// ==============================================================================

use crate::rig_servo::types::{AngleLimits, DriveCommand, HoldMode, JointServo, PdGains, PdState};

/// Motor speed to command this tick, or `None` to leave the motor as it is.
pub fn servo_command(
    state: &mut PdState,
    drive: DriveCommand,
    angle: f32,
    servo: &JointServo,
    limits: Option<AngleLimits>,
    dt: f32,
) -> Option<f32> {
    match drive {
        DriveCommand::Positive => {
            state.reset();
            Some(servo.arm_speed)
        }
        DriveCommand::Negative => {
            state.reset();
            Some(-servo.arm_speed)
        }
        DriveCommand::Idle => match servo.hold {
            HoldMode::ZeroSpeed => {
                state.reset();
                Some(0.0)
            }
            HoldMode::Pd(gains) => pd_hold(state, angle, &gains, limits, dt),
        },
    }
}

/// Idle-tick PD update. Captures the target on the first idle sample; a
/// target is never held outside `limits`.
pub fn pd_hold(
    state: &mut PdState,
    angle: f32,
    gains: &PdGains,
    limits: Option<AngleLimits>,
    dt: f32,
) -> Option<f32> {
    let Some(target) = state.target_angle else {
        state.target_angle = Some(limits.map_or(angle, |l| l.clamp(angle)));
        state.previous_angle = Some(angle);
        return None;
    };

    let error = target - angle;
    let rate = match state.previous_angle {
        Some(prev) if dt > 0.0 => (angle - prev) / dt,
        _ => 0.0,
    };
    state.previous_angle = Some(angle);

    let control = gains.kp * error - gains.kd * rate;
    Some(control.clamp(-gains.max_control_speed, gains.max_control_speed))
}
