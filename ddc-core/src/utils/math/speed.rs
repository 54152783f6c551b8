//! Speed bounds for the drive motors.
//!
//! Speeds are signed: positive drives a side forward, negative backward. The
//! magnitude is used directly as an 8-bit PWM duty value.

/// Largest speed magnitude accepted by the PWM outputs (8-bit duty).
pub const MAX_SPEED: i32 = 255;

/// Restrict `speed` to `[-MAX_SPEED, MAX_SPEED]`.
pub const fn clamp_speed(speed: i32) -> i32 {
    if speed > MAX_SPEED {
        MAX_SPEED
    } else if speed < -MAX_SPEED {
        -MAX_SPEED
    } else {
        speed
    }
}
