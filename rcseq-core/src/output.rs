//! Servo output trait.

/// Angular output driving one servo.
///
/// The implementation owns the physical pulse generation; the sequencer
/// only tells it where the horn should be.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap allocation.
pub trait ServoOutput {
    /// Set the target position in degrees.
    fn write_degrees(&mut self, degrees: u16);

    /// Apply pending writes.
    ///
    /// Called once at the end of every sequencer cycle. Outputs that apply
    /// writes immediately can keep the default no-op.
    fn refresh(&mut self) {}
}

impl<S: ServoOutput + ?Sized> ServoOutput for &mut S {
    #[inline]
    fn write_degrees(&mut self, degrees: u16) {
        (**self).write_degrees(degrees);
    }

    #[inline]
    fn refresh(&mut self) {
        (**self).refresh();
    }
}
