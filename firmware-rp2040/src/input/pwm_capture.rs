//! PWM pulse width capture from a receiver output pin.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Instant;
use embedded_hal_async::digital::Wait;
use rcseq_core::PulseInput;

use crate::config::{PULSE_MAX_US, PULSE_MIN_US};

/// Latest measured pulse width of one channel.
///
/// A newer measurement overwrites one the sequencer has not taken yet.
pub type PulseSlot = Signal<CriticalSectionRawMutex, u16>;

/// Measures the high time of the pulses on one pin.
pub struct PwmCapture<W> {
    pin: W,
    /// Pulses rejected as out of range since the last valid one.
    rejected: u32,
}

impl<W: Wait> PwmCapture<W> {
    #[must_use]
    pub fn new(pin: W) -> Self {
        Self { pin, rejected: 0 }
    }

    /// Wait for the next complete pulse and return its width in microseconds.
    ///
    /// Widths outside the plausible servo pulse range are dropped, so a
    /// glitch or a missed edge never reaches the decoder.
    pub async fn next_width_us(&mut self) -> Result<u16, W::Error> {
        loop {
            self.pin.wait_for_rising_edge().await?;
            let start = Instant::now();
            self.pin.wait_for_falling_edge().await?;
            let width = start.elapsed().as_micros();

            match u16::try_from(width) {
                Ok(width) if (PULSE_MIN_US..=PULSE_MAX_US).contains(&width) => {
                    if self.rejected > 0 {
                        defmt::debug!("dropped {} implausible pulses", self.rejected);
                        self.rejected = 0;
                    }
                    return Ok(width);
                }
                _ => self.rejected = self.rejected.wrapping_add(1),
            }
        }
    }

    /// Capture forever, publishing every width to `slot`.
    pub async fn run(&mut self, slot: &PulseSlot) -> Result<(), W::Error> {
        loop {
            let width = self.next_width_us().await?;
            slot.signal(width);
        }
    }
}

/// [`PulseInput`] reading the widths a capture task publishes.
#[derive(Clone, Copy)]
pub struct SignalPulseInput {
    slot: &'static PulseSlot,
}

impl SignalPulseInput {
    #[must_use]
    pub const fn new(slot: &'static PulseSlot) -> Self {
        Self { slot }
    }
}

impl PulseInput for SignalPulseInput {
    #[inline]
    fn take_width_us(&mut self) -> Option<u16> {
        self.slot.try_take()
    }
}
