//! Position dwell filter.
//!
//! A decoded position only becomes a command once it has been seen
//! continuously for the hold time of the channel kind. After firing, the
//! filter forgets the position so it has to settle again before the same
//! command can fire a second time.

use crate::channel::ChannelKind;
use crate::time::{elapsed_ms, Timing};

impl Timing {
    /// Dwell time required before a position of `kind` is accepted.
    #[inline]
    #[must_use]
    pub const fn hold_ms(&self, kind: ChannelKind) -> u32 {
        match kind {
            ChannelKind::Stick => self.stick_hold_ms,
            ChannelKind::MultiPositionSwitch | ChannelKind::CustomKeymap => self.keyboard_hold_ms,
        }
    }
}

/// Per-channel runtime state of the dwell filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Debouncer {
    held: Option<u8>,
    since_ms: u32,
    last_pulse_ms: Option<u32>,
}

impl Debouncer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            held: None,
            since_ms: 0,
            last_pulse_ms: None,
        }
    }

    /// Position currently holding, if any.
    #[inline]
    #[must_use]
    pub const fn held(&self) -> Option<u8> {
        self.held
    }

    /// Feed one decoded sample taken at `now`.
    ///
    /// Returns the position once it has held for at least `hold_ms`.
    pub fn update(&mut self, position: Option<u8>, now: u32, hold_ms: u32) -> Option<u8> {
        self.mark_pulse(now);

        let Some(position) = position else {
            self.held = None;
            return None;
        };

        if self.held != Some(position) {
            self.held = Some(position);
            self.since_ms = now;
            return None;
        }

        if elapsed_ms(now, self.since_ms) >= hold_ms {
            self.held = None;
            return Some(position);
        }

        None
    }

    /// Forget the held position, keeping the pulse history.
    #[inline]
    pub fn release_hold(&mut self) {
        self.held = None;
    }

    /// Record that a pulse arrived at `now` without feeding a position.
    #[inline]
    pub fn mark_pulse(&mut self, now: u32) {
        self.last_pulse_ms = Some(now);
    }

    /// Check if no pulse was fed during the last `timeout_ms`.
    ///
    /// A channel that never received a pulse is timed out.
    #[must_use]
    pub fn timed_out(&self, now: u32, timeout_ms: u32) -> bool {
        match self.last_pulse_ms {
            Some(last) => elapsed_ms(now, last) > timeout_ms,
            None => true,
        }
    }
}
