//! Setup error type.

/// Reason a declaration or registration was rejected.
///
/// Rejections never affect what was registered before; a caller that sized
/// its capacities correctly can ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetupError {
    /// Registry is full.
    CapacityExceeded,
    /// Channel or servo index outside the declared capacity.
    InvalidIndex,
    /// Sequence table longer than the per-table line capacity.
    SequenceTooLong,
    /// Sequence table without any line.
    EmptySequence,
}
