//! Servo state table.
//!
//! Tracks which sequence line currently drives each servo and how many
//! cycles of its motion are left. A servo driven by one line is off limits
//! to every other line until the motion completes.

use crate::error::SetupError;
use crate::output::ServoOutput;
use crate::registry::BindingId;

/// Identifies one line of one registered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineRef {
    pub binding: BindingId,
    pub line: usize,
}

/// A declared servo and its motion progress.
#[derive(Debug)]
pub struct ServoSlot<S> {
    output: S,
    owner: Option<LineRef>,
    remaining: u32,
    total: u32,
}

impl<S: ServoOutput> ServoSlot<S> {
    fn new(output: S) -> Self {
        Self {
            output,
            owner: None,
            remaining: 0,
            total: 0,
        }
    }

    /// Line currently driving the servo.
    #[inline]
    #[must_use]
    pub fn owner(&self) -> Option<LineRef> {
        self.owner
    }

    /// Cycles left in the motion in flight (0 when idle).
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[inline]
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.owner.is_none()
    }

    /// Give the servo to `line` for `ticks` cycles and move it to `degrees`.
    pub(crate) fn claim(&mut self, line: LineRef, ticks: u32, degrees: u16) {
        let ticks = ticks.max(1);
        self.owner = Some(line);
        self.remaining = ticks;
        self.total = ticks;
        self.output.write_degrees(degrees);
    }

    /// Consume one cycle of the current motion.
    ///
    /// Returns `(elapsed, total)` cycles after the step.
    pub(crate) fn step(&mut self) -> (u32, u32) {
        self.remaining = self.remaining.saturating_sub(1);
        (self.total - self.remaining, self.total)
    }

    pub(crate) fn release(&mut self) {
        self.owner = None;
        self.remaining = 0;
        self.total = 0;
    }

    pub(crate) fn write(&mut self, degrees: u16) {
        self.output.write_degrees(degrees);
    }

    /// Access the underlying output.
    #[inline]
    pub fn output(&self) -> &S {
        &self.output
    }
}

/// Fixed-capacity table of servos indexed by their declared index.
#[derive(Debug)]
pub struct ServoBank<S, const N: usize> {
    slots: [Option<ServoSlot<S>>; N],
}

impl<S: ServoOutput, const N: usize> ServoBank<S, N> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
        }
    }

    /// Attach `output` as servo `index`, replacing any previous declaration.
    pub fn declare(&mut self, index: u8, output: S) -> Result<(), SetupError> {
        let slot = self
            .slots
            .get_mut(usize::from(index))
            .ok_or(SetupError::InvalidIndex)?;
        *slot = Some(ServoSlot::new(output));
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: u8) -> Option<&ServoSlot<S>> {
        self.slots.get(usize::from(index))?.as_ref()
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, index: u8) -> Option<&mut ServoSlot<S>> {
        self.slots.get_mut(usize::from(index))?.as_mut()
    }

    /// Write `degrees` to servo `index` right away. Unknown servos are ignored.
    pub fn write(&mut self, index: u8, degrees: u16) {
        if let Some(slot) = self.get_mut(index) {
            slot.write(degrees);
        }
    }

    /// Flush every declared output.
    pub fn refresh_all(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.output.refresh();
        }
    }
}

impl<S: ServoOutput, const N: usize> Default for ServoBank<S, N> {
    fn default() -> Self {
        Self::new()
    }
}
