//! Hobby servo driven by one hardware PWM channel.

use embassy_rp::pwm::Config as PwmConfig;
use embedded_hal::pwm::SetDutyCycle;
use fixed::traits::ToFixed;
use rcseq_core::ServoOutput;

use crate::config::{SERVO_FRAME_US, SERVO_MAX_US, SERVO_MIN_US};

/// Highest angle a servo accepts.
pub const MAX_DEGREES: u16 = 180;

/// PWM slice configuration for a 50 Hz servo frame at 1 µs resolution.
///
/// The 125 MHz system clock divided by 125 counts microseconds.
#[must_use]
pub fn servo_pwm_config() -> PwmConfig {
    let mut config = PwmConfig::default();
    config.divider = 125u8.to_fixed();
    config.top = (SERVO_FRAME_US - 1) as u16;
    config
}

/// Pulse width for `degrees`, clamped to the servo travel.
#[must_use]
pub const fn pulse_for_degrees(degrees: u16) -> u16 {
    let degrees = if degrees > MAX_DEGREES {
        MAX_DEGREES
    } else {
        degrees
    };
    let span = (SERVO_MAX_US - SERVO_MIN_US) as u32;
    SERVO_MIN_US + (span * degrees as u32 / MAX_DEGREES as u32) as u16
}

/// [`ServoOutput`] setting the duty cycle of a PWM channel.
pub struct PwmServo<P> {
    pwm: P,
    degrees: Option<u16>,
}

impl<P: SetDutyCycle> PwmServo<P> {
    /// Wrap a PWM output configured with [`servo_pwm_config`].
    ///
    /// The output stays low until the first write so the servo keeps its
    /// position through reset.
    #[must_use]
    pub fn new(pwm: P) -> Self {
        Self { pwm, degrees: None }
    }
}

impl<P: SetDutyCycle> ServoOutput for PwmServo<P> {
    fn write_degrees(&mut self, degrees: u16) {
        if self.degrees == Some(degrees) {
            return;
        }
        let pulse_us = pulse_for_degrees(degrees);
        match self.pwm.set_duty_cycle_fraction(pulse_us, SERVO_FRAME_US as u16) {
            Ok(()) => self.degrees = Some(degrees),
            Err(_) => defmt::warn!("servo duty update to {} us failed", pulse_us),
        }
    }
}
