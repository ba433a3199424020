//! RC command servo sequencer for RP2040.
//!
//! Reads PWM pulses from an RC receiver, decodes stick and switch positions
//! into commands and plays servo choreographies bound to them.
//!
//! # Hardware Configuration
//!
//! | Function  | GPIO | Description |
//! |-----------|------|-------------|
//! | RC CH 0   | 2    | Stick channel (4 positions) |
//! | RC CH 1   | 3    | 3-position switch |
//! | RC CH 2   | 4    | Keypad channel (custom keymap) |
//! | Servo 0   | 16   | PWM slice 0 A |
//! | Servo 1   | 18   | PWM slice 1 A |
//! | LED       | 25   | On-board LED (lights toggle) |
//!
//! # Architecture
//!
//! One capture task per receiver channel measures pulse widths and
//! publishes them through an Embassy [`Signal`](embassy_sync::signal::Signal)
//! with "latest value wins" semantics. The main task polls the
//! [`Sequencer`](rcseq_core::Sequencer), which takes the latest width of each
//! channel once per 20 ms cycle and drives the servos.
//!
//! # Modules
//!
//! - [`config`]: Pins, channel layouts and the demo sequence tables
//! - [`clock`]: Embassy-backed millisecond clock ([`EmbassyClock`])
//! - [`input`]: Pulse capture ([`PwmCapture`], [`SignalPulseInput`])
//! - [`output`]: PWM servo output ([`PwmServo`])
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)
//!
//! # Re-exports
//!
//! This crate re-exports the commonly used items of [`rcseq_core`] so the
//! binary only needs to depend on this crate.

#![no_std]

#[cfg(all(feature = "dev-panic", feature = "prod-panic"))]
compile_error!("Cannot enable both `dev-panic` and `prod-panic` features - they install conflicting panic handlers");

// Re-export core types for convenience
pub use rcseq_core::{
    BindingId, ChannelConfig, Clock, PulseInput, SequenceEvent, SequenceLine, Sequencer,
    ServoOutput, SetupError, Timing,
};

pub mod clock;
pub mod config;
pub mod input;
pub mod output;

pub use clock::EmbassyClock;
pub use input::{PulseSlot, PwmCapture, SignalPulseInput};
pub use output::PwmServo;
