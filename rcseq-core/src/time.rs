//! Millisecond clock abstraction and timing constants.

/// Source of the monotonically increasing millisecond counter.
///
/// The counter is allowed to wrap; every comparison in this crate goes
/// through [`elapsed_ms`].
pub trait Clock {
    /// Current time in milliseconds.
    fn now_ms(&self) -> u32;
}

impl<C: Clock> Clock for &C {
    #[inline]
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Milliseconds elapsed from `since` to `now`, correct across counter wraparound.
#[inline]
#[must_use]
pub const fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Fixed timing parameters of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Period of one sequencer cycle (servo refresh interval).
    pub tick_ms: u32,
    /// How long a stick position must hold before it becomes a command.
    pub stick_hold_ms: u32,
    /// How long a switch or keypad position must hold before it becomes a command.
    pub keyboard_hold_ms: u32,
}

impl Timing {
    /// 20 ms servo frame, 150 ms stick dwell, 50 ms keyboard dwell.
    pub const DEFAULT: Self = Self {
        tick_ms: 20,
        stick_hold_ms: 150,
        keyboard_hold_ms: 50,
    };

    /// Number of cycles a motion of `duration_ms` spans (never less than one).
    #[inline]
    #[must_use]
    pub const fn ticks_for(&self, duration_ms: u32) -> u32 {
        match duration_ms.checked_div(self.tick_ms) {
            Some(0) | None => 1,
            Some(ticks) => ticks,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::DEFAULT
    }
}
