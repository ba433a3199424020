//! Platform-agnostic RC command decoding and servo sequencing.
//!
//! Turns the pulse widths of RC receiver channels into discrete commands
//! and plays timed servo choreographies in response. The crate has no
//! hardware dependency: time, pulse capture and servo output come in
//! through small traits, so the same code runs on a microcontroller and in
//! host tests.
//!
//! # Overview
//!
//! - [`channel`]: Pulse width to position decoding ([`ChannelConfig`])
//! - [`debounce`]: Dwell filter turning positions into commands ([`Debouncer`])
//! - [`sequence`]: Sequence tables ([`SequenceLine`], [`Motion`])
//! - [`registry`]: Command bindings and run state ([`Registry`])
//! - [`servo`]: Servo ownership and motion progress ([`ServoBank`])
//! - [`engine`]: Per-cycle execution of runs in progress ([`engine::advance`])
//! - [`sequencer`]: Setup API and tick driver ([`Sequencer`])
//! - [`time`], [`input`], [`output`]: Hardware seams ([`Clock`], [`PulseInput`], [`ServoOutput`])
//!
//! # Cycle
//!
//! [`Sequencer::tick`] is polled from the main loop and runs one cycle
//! every 20 ms:
//!
//! ```text
//! poll channels -> decode -> dwell filter -> trigger binding
//!                                               |
//!          refresh servos <- advance runs <-----+
//! ```
//!
//! A sequence started during a cycle is first advanced on the next one.
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt logging and formatting (for embedded targets)
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.
//! Every table is sized by const generics at compile time.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
mod fmt;

pub mod channel;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod input;
pub mod output;
pub mod registry;
pub mod sequence;
pub mod sequencer;
pub mod servo;
pub mod time;

// Re-export main types at crate root
pub use channel::{ChannelConfig, ChannelKind, PulseWindow};
pub use debounce::Debouncer;
pub use error::SetupError;
pub use input::PulseInput;
pub use output::ServoOutput;
pub use registry::{Behavior, BindingId, Control, Registry, SequenceEvent};
pub use sequence::{LineKind, Motion, SequenceLine, ShortAction};
pub use sequencer::Sequencer;
pub use servo::{LineRef, ServoBank};
pub use time::{elapsed_ms, Clock, Timing};

/// Crate version, for boot banners.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
