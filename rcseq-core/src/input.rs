//! Pulse input trait.

/// Source of RC pulse width measurements for one receiver channel.
///
/// Implementations capture pulses asynchronously (pin-change interrupt,
/// PIO, timer capture...) and hand the latest measurement to the
/// sequencer when it polls.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap allocation.
pub trait PulseInput {
    /// Take the most recent pulse width in microseconds.
    ///
    /// Returns `None` when no new pulse has been measured since the previous
    /// call, in which case the channel is left alone for this cycle.
    fn take_width_us(&mut self) -> Option<u16>;
}

impl<P: PulseInput + ?Sized> PulseInput for &mut P {
    #[inline]
    fn take_width_us(&mut self) -> Option<u16> {
        (**self).take_width_us()
    }
}
