//! Command registry.
//!
//! Binds a `(command, position)` pair to a behavior: a short action called
//! right away, or a sequence table run over the following cycles. Bindings
//! live for the lifetime of the registry and each carries the state of its
//! (at most one) run in progress.

use heapless::Vec;

use crate::error::SetupError;
use crate::sequence::{SequenceLine, ShortAction};

/// Handle of a registered binding (its registration order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BindingId(pub u8);

impl BindingId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Event reported to a binding's control callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequenceEvent {
    /// A run is about to start; returning `false` vetoes it.
    StartRequested,
    /// The run finished; the return value is ignored.
    RunEnded,
}

/// Gate and end-of-run notification for a sequence binding.
///
/// `RunEnded` is sent once per run, when its last line finishes, whether
/// that line is a motion or a short action.
pub type Control = fn(SequenceEvent, BindingId) -> bool;

/// What a binding does when its command fires.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    ShortAction(ShortAction),
    Sequence(&'static [SequenceLine]),
}

/// State of a sequence run in progress.
#[derive(Debug, Clone)]
pub struct Run<const LINES: usize> {
    started_ms: u32,
    armed_cycle: u32,
    finished: Vec<bool, LINES>,
}

impl<const LINES: usize> Run<LINES> {
    fn new(lines: usize, started_ms: u32, armed_cycle: u32) -> Option<Self> {
        let mut finished = Vec::new();
        finished.resize(lines, false).ok()?;
        Some(Self {
            started_ms,
            armed_cycle,
            finished,
        })
    }

    /// Time the run was triggered.
    #[inline]
    #[must_use]
    pub fn started_ms(&self) -> u32 {
        self.started_ms
    }

    /// Cycle counter value when the run was triggered.
    #[inline]
    #[must_use]
    pub fn armed_cycle(&self) -> u32 {
        self.armed_cycle
    }

    #[inline]
    #[must_use]
    pub fn is_finished(&self, line: usize) -> bool {
        self.finished.get(line).copied().unwrap_or(true)
    }

    pub(crate) fn mark_finished(&mut self, line: usize) {
        if let Some(flag) = self.finished.get_mut(line) {
            *flag = true;
        }
    }

    /// Check if every line of the table has finished.
    #[must_use]
    pub fn all_finished(&self) -> bool {
        self.finished.iter().all(|&done| done)
    }
}

/// A registered `(command, position)` binding.
#[derive(Debug, Clone)]
pub struct Binding<const LINES: usize> {
    command: u8,
    position: u8,
    behavior: Behavior,
    control: Option<Control>,
    pub(crate) run: Option<Run<LINES>>,
}

impl<const LINES: usize> Binding<LINES> {
    #[inline]
    #[must_use]
    pub fn command(&self) -> u8 {
        self.command
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> u8 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    #[inline]
    #[must_use]
    pub fn control(&self) -> Option<Control> {
        self.control
    }

    /// Sequence table of the binding, `None` for short actions.
    #[inline]
    #[must_use]
    pub fn table(&self) -> Option<&'static [SequenceLine]> {
        match self.behavior {
            Behavior::Sequence(table) => Some(table),
            Behavior::ShortAction(_) => None,
        }
    }

    /// Run in progress, if any.
    #[inline]
    #[must_use]
    pub fn run(&self) -> Option<&Run<LINES>> {
        self.run.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.run.is_some()
    }
}

/// Fixed-capacity registry of up to `BINDINGS` bindings.
///
/// Sequence tables may hold at most `LINES` lines.
#[derive(Debug)]
pub struct Registry<const BINDINGS: usize, const LINES: usize> {
    bindings: Vec<Binding<LINES>, BINDINGS>,
}

impl<const BINDINGS: usize, const LINES: usize> Registry<BINDINGS, LINES> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Bind a sequence table to `(command, position)`.
    pub fn register_sequence(
        &mut self,
        command: u8,
        position: u8,
        table: &'static [SequenceLine],
        control: Option<Control>,
    ) -> Result<BindingId, SetupError> {
        if table.is_empty() {
            return Err(SetupError::EmptySequence);
        }
        if table.len() > LINES {
            return Err(SetupError::SequenceTooLong);
        }
        self.push(Binding {
            command,
            position,
            behavior: Behavior::Sequence(table),
            control,
            run: None,
        })
    }

    /// Bind a short action to `(command, position)`.
    pub fn register_short_action(
        &mut self,
        command: u8,
        position: u8,
        action: ShortAction,
    ) -> Result<BindingId, SetupError> {
        self.push(Binding {
            command,
            position,
            behavior: Behavior::ShortAction(action),
            control: None,
            run: None,
        })
    }

    fn push(&mut self, binding: Binding<LINES>) -> Result<BindingId, SetupError> {
        let id = u8::try_from(self.bindings.len()).map_err(|_| SetupError::CapacityExceeded)?;
        self.bindings
            .push(binding)
            .map_err(|_| SetupError::CapacityExceeded)?;
        Ok(BindingId(id))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, id: BindingId) -> Option<&Binding<LINES>> {
        self.bindings.get(id.index())
    }

    #[inline]
    pub(crate) fn bindings_mut(&mut self) -> &mut [Binding<LINES>] {
        &mut self.bindings
    }

    /// First binding registered for `(command, position)`.
    #[must_use]
    pub fn find(&self, command: u8, position: u8) -> Option<BindingId> {
        self.bindings
            .iter()
            .position(|b| b.command == command && b.position == position)
            .map(|idx| BindingId(idx as u8))
    }

    /// Binding owning `table`.
    #[must_use]
    pub fn find_table(&self, table: &[SequenceLine]) -> Option<BindingId> {
        self.bindings
            .iter()
            .position(|b| b.table().is_some_and(|own| core::ptr::eq(own, table)))
            .map(|idx| BindingId(idx as u8))
    }

    /// Fire binding `id`.
    ///
    /// Short actions run immediately. A sequence starts a new run unless one
    /// is already in progress or its control callback vetoes the start.
    /// Returns `true` if something was executed or started.
    pub fn trigger(&mut self, id: BindingId, now: u32, cycle: u32) -> bool {
        let Some(binding) = self.bindings.get_mut(id.index()) else {
            return false;
        };

        let table = match binding.behavior {
            Behavior::ShortAction(action) => {
                trace!("binding {} short action", id.0);
                action();
                return true;
            }
            Behavior::Sequence(table) => table,
        };

        if binding.run.is_some() {
            debug!("binding {} already in progress", id.0);
            return false;
        }

        if let Some(control) = binding.control {
            if !control(SequenceEvent::StartRequested, id) {
                debug!("binding {} start vetoed", id.0);
                return false;
            }
        }

        binding.run = Run::new(table.len(), now, cycle);
        if binding.run.is_some() {
            debug!("binding {} started at {} ms", id.0, now);
        }
        binding.run.is_some()
    }

    /// Fire the first binding registered for `(command, position)`.
    pub fn trigger_command(&mut self, command: u8, position: u8, now: u32, cycle: u32) -> bool {
        match self.find(command, position) {
            Some(id) => self.trigger(id, now, cycle),
            None => false,
        }
    }
}

impl<const BINDINGS: usize, const LINES: usize> Default for Registry<BINDINGS, LINES> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    static CONFETTI: [SequenceLine; 2] = [
        SequenceLine::motion(0, 0, 200, 0, 90),
        SequenceLine::motion(0, 200, 200, 90, 0),
    ];
    static WAVE: [SequenceLine; 1] = [SequenceLine::motion(1, 0, 100, 0, 45)];
    static LONG: [SequenceLine; 5] = [
        SequenceLine::motion(0, 0, 20, 0, 1),
        SequenceLine::motion(0, 20, 20, 1, 2),
        SequenceLine::motion(0, 40, 20, 2, 3),
        SequenceLine::motion(0, 60, 20, 3, 4),
        SequenceLine::motion(0, 80, 20, 4, 5),
    ];

    type TestRegistry = Registry<4, 4>;

    #[test]
    fn test_register_and_find() {
        let mut registry = TestRegistry::new();
        let a = registry.register_sequence(0, 1, &CONFETTI, None).unwrap();
        let b = registry.register_sequence(0, 2, &WAVE, None).unwrap();

        assert_eq!(a, BindingId(0));
        assert_eq!(b, BindingId(1));
        assert_eq!(registry.find(0, 1), Some(a));
        assert_eq!(registry.find(0, 2), Some(b));
        assert_eq!(registry.find(1, 1), None);
        assert_eq!(registry.find_table(&WAVE), Some(b));
        assert_eq!(registry.find_table(&LONG), None);
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = TestRegistry::new();
        let first = registry.register_sequence(3, 0, &CONFETTI, None).unwrap();
        let _ = registry.register_sequence(3, 0, &WAVE, None).unwrap();
        assert_eq!(registry.find(3, 0), Some(first));
    }

    #[test]
    fn test_capacity_and_table_limits() {
        let mut registry: Registry<1, 4> = Registry::new();
        assert_eq!(
            registry.register_sequence(0, 0, &LONG, None),
            Err(SetupError::SequenceTooLong)
        );
        assert_eq!(
            registry.register_sequence(0, 0, &[], None),
            Err(SetupError::EmptySequence)
        );
        assert!(registry.register_sequence(0, 0, &WAVE, None).is_ok());
        assert_eq!(
            registry.register_sequence(0, 1, &CONFETTI, None),
            Err(SetupError::CapacityExceeded)
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_short_action_runs_immediately() {
        static CALLS: AtomicU32 = AtomicU32::new(0);
        fn beep() {
            CALLS.fetch_add(1, Ordering::SeqCst);
        }

        let mut registry = TestRegistry::new();
        let id = registry.register_short_action(2, 0, beep).unwrap();
        assert!(registry.trigger(id, 0, 0));
        assert!(registry.trigger_command(2, 0, 20, 1));
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
        assert!(!registry.get(id).unwrap().in_progress());
    }

    #[test]
    fn test_sequence_cannot_retrigger_while_running() {
        let mut registry = TestRegistry::new();
        let id = registry.register_sequence(0, 0, &CONFETTI, None).unwrap();

        assert!(registry.trigger(id, 100, 5));
        assert!(!registry.trigger(id, 180, 9));

        let run = registry.get(id).unwrap().run().unwrap();
        assert_eq!(run.started_ms(), 100);
        assert_eq!(run.armed_cycle(), 5);
        assert!(!run.is_finished(0));
        assert!(!run.is_finished(1));
    }

    #[test]
    fn test_control_can_veto() {
        static ALLOW: AtomicBool = AtomicBool::new(false);
        static ASKED: AtomicU32 = AtomicU32::new(0);
        fn gate(event: SequenceEvent, id: BindingId) -> bool {
            assert_eq!(event, SequenceEvent::StartRequested);
            assert_eq!(id, BindingId(0));
            ASKED.fetch_add(1, Ordering::SeqCst);
            ALLOW.load(Ordering::SeqCst)
        }

        let mut registry = TestRegistry::new();
        let id = registry.register_sequence(0, 0, &WAVE, Some(gate)).unwrap();

        assert!(!registry.trigger(id, 0, 0));
        assert!(!registry.get(id).unwrap().in_progress());

        ALLOW.store(true, Ordering::SeqCst);
        assert!(registry.trigger(id, 20, 1));
        assert!(registry.get(id).unwrap().in_progress());
        assert_eq!(ASKED.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unknown_binding_is_noop() {
        let mut registry = TestRegistry::new();
        assert!(!registry.trigger(BindingId(3), 0, 0));
        assert!(!registry.trigger_command(0, 0, 0, 0));
    }
}
