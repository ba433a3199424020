//! Servo outputs.

pub mod servo;

pub use servo::{servo_pwm_config, PwmServo};
