//! Core shared types for `rig_servo` (engine-agnostic).
// rig_servo/types.rs

// ============================================
// ----- gains / servo configs -----------------
// ============================================

/// Proportional-derivative gains for position holding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdGains {
    pub kp: f32,                // 1/s     (rad/s of motor speed per rad of error)
    pub kd: f32,                // -       (rad/s of motor speed per rad/s of joint rate)
    pub max_control_speed: f32, // rad/s   (hard clamp on the PD output)
}

/// What a joint does while none of its drive keys are held.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoldMode {
    /// Active position holding against gravity (boom, stick, bucket, tipper, plow arm).
    Pd(PdGains),
    /// Open-loop "motor speed 0" (balanced joints: turret, blade angle).
    ZeroSpeed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointServo {
    pub arm_speed: f32, // rad/s while a drive key is held
    pub hold: HoldMode,
}

/// Hard relative-angle window (radians).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleLimits {
    pub min: f32,
    pub max: f32,
}

impl AngleLimits {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, angle: f32) -> bool {
        angle >= self.min && angle <= self.max
    }

    pub fn clamp(&self, angle: f32) -> f32 {
        angle.clamp(self.min, self.max)
    }

    /// True when one more tick of `drive` (moving `step` rad) would leave the window.
    pub fn blocks(&self, angle: f32, drive: DriveCommand, step: f32) -> bool {
        match drive {
            DriveCommand::Positive => angle + step > self.max,
            DriveCommand::Negative => angle - step < self.min,
            DriveCommand::Idle => false,
        }
    }
}

// ============================================
// ----- per-tick inputs / state ---------------
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveCommand {
    Positive,
    Negative,
    #[default]
    Idle,
}

impl DriveCommand {
    /// Both keys held cancel out.
    pub fn from_keys(positive: bool, negative: bool) -> Self {
        match (positive, negative) {
            (true, false) => DriveCommand::Positive,
            (false, true) => DriveCommand::Negative,
            _ => DriveCommand::Idle,
        }
    }
}

/// PD memory for one controlled joint. Both fields are `None` while an operator drives it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PdState {
    pub target_angle: Option<f32>,   // rad
    pub previous_angle: Option<f32>, // rad
}

impl PdState {
    pub fn reset(&mut self) {
        self.target_angle = None;
        self.previous_angle = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_from_keys() {
        assert_eq!(DriveCommand::from_keys(true, false), DriveCommand::Positive);
        assert_eq!(DriveCommand::from_keys(false, true), DriveCommand::Negative);
        assert_eq!(DriveCommand::from_keys(true, true), DriveCommand::Idle);
        assert_eq!(DriveCommand::from_keys(false, false), DriveCommand::Idle);
    }

    #[test]
    fn test_limits_block_only_outward_drive() {
        let limits = AngleLimits::new(-1.0, 1.0);
        assert!(limits.blocks(1.2, DriveCommand::Positive, 0.0));
        assert!(!limits.blocks(1.2, DriveCommand::Negative, 0.0));
        assert!(limits.blocks(-1.2, DriveCommand::Negative, 0.0));
        assert!(!limits.blocks(-1.2, DriveCommand::Positive, 0.0));
        assert!(!limits.blocks(0.5, DriveCommand::Positive, 0.0));
        assert!(!limits.blocks(5.0, DriveCommand::Idle, 0.0));
    }

    #[test]
    fn test_limits_block_before_crossing() {
        let limits = AngleLimits::new(-1.0, 1.0);
        // One tick of drive would carry 0.995 past 1.0.
        assert!(limits.blocks(0.995, DriveCommand::Positive, 0.01));
        assert!(!limits.blocks(0.985, DriveCommand::Positive, 0.01));
        assert!(limits.blocks(-0.995, DriveCommand::Negative, 0.01));
        assert_eq!(limits.clamp(1.3), 1.0);
        assert_eq!(limits.clamp(-0.2), -0.2);
    }
}
