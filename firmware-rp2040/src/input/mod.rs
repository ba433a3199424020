//! Receiver pulse capture.
//!
//! Capture runs in its own task per channel and hands widths over to the
//! sequencer through a [`PulseSlot`].

pub mod pwm_capture;

pub use pwm_capture::{PulseSlot, PwmCapture, SignalPulseInput};
