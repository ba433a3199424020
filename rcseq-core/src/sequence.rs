//! Sequence tables: timed servo motions and short actions.
//!
//! A table is authored once by the application, usually as a `static`
//! array, and is only ever read by the sequencer:
//!
//! ```rust
//! use rcseq_core::SequenceLine;
//!
//! fn horn() {}
//!
//! static OPEN_HATCH: [SequenceLine; 3] = [
//!     SequenceLine::action(0, horn),
//!     SequenceLine::motion(0, 0, 1000, 0, 90),    // servo 0: 0° -> 90° in 1 s
//!     SequenceLine::motion(1, 500, 1000, 180, 0), // servo 1 starts 500 ms later
//! ];
//! ```

/// Callback of a short action.
///
/// Runs synchronously inside the sequencer cycle and must return well under
/// one cycle period (20 ms) to keep servo timing intact.
pub type ShortAction = fn();

/// Linear servo motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Motion {
    /// Index of the declared servo to move.
    pub servo: u8,
    /// Time to travel from `start_deg` to `end_deg`.
    pub duration_ms: u32,
    pub start_deg: u16,
    pub end_deg: u16,
}

impl Motion {
    /// Angle after `elapsed` of `total` cycles.
    ///
    /// Returns exactly `start_deg` at 0 and exactly `end_deg` once
    /// `elapsed >= total`.
    #[must_use]
    pub fn angle_at(&self, elapsed: u32, total: u32) -> u16 {
        if total == 0 || elapsed >= total {
            return self.end_deg;
        }
        let start = i64::from(self.start_deg);
        let span = i64::from(self.end_deg) - start;
        let angle = start + span * i64::from(elapsed) / i64::from(total);
        // Always between start and end, both u16
        angle as u16
    }
}

/// What a sequence line does when its time comes.
#[derive(Debug, Clone, Copy)]
pub enum LineKind {
    Motion(Motion),
    Action(ShortAction),
}

/// One line of a sequence table.
#[derive(Debug, Clone, Copy)]
pub struct SequenceLine {
    /// Start time relative to the beginning of the run.
    pub offset_ms: u32,
    pub kind: LineKind,
}

impl SequenceLine {
    /// Servo motion line.
    #[must_use]
    pub const fn motion(
        servo: u8,
        offset_ms: u32,
        duration_ms: u32,
        start_deg: u16,
        end_deg: u16,
    ) -> Self {
        Self {
            offset_ms,
            kind: LineKind::Motion(Motion {
                servo,
                duration_ms,
                start_deg,
                end_deg,
            }),
        }
    }

    /// Short action line.
    #[must_use]
    pub const fn action(offset_ms: u32, action: ShortAction) -> Self {
        Self {
            offset_ms,
            kind: LineKind::Action(action),
        }
    }

    /// The motion of this line, if it is a motion line.
    #[inline]
    #[must_use]
    pub const fn as_motion(&self) -> Option<&Motion> {
        match &self.kind {
            LineKind::Motion(motion) => Some(motion),
            LineKind::Action(_) => None,
        }
    }
}

/// Starting pose of a table: for every servo it moves, the start angle of
/// its earliest motion. Lines sharing the earliest offset resolve to the
/// later one in the table.
pub fn initial_angles(table: &[SequenceLine]) -> impl Iterator<Item = (u8, u16)> + '_ {
    table.iter().enumerate().filter_map(move |(idx, line)| {
        let motion = line.as_motion()?;
        let superseded = table[idx + 1..].iter().any(|later| {
            later
                .as_motion()
                .is_some_and(|m| m.servo == motion.servo && later.offset_ms <= line.offset_ms)
        });
        let preceded = table[..idx].iter().any(|earlier| {
            earlier
                .as_motion()
                .is_some_and(|m| m.servo == motion.servo && earlier.offset_ms < line.offset_ms)
        });
        (!superseded && !preceded).then_some((motion.servo, motion.start_deg))
    })
}
