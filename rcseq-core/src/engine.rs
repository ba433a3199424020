//! Sequence execution engine.
//!
//! Called once per cycle, it walks every line of every run in progress:
//!
//! - a short action fires once its offset has elapsed, exactly once per run;
//! - a motion claims its servo once its offset has elapsed and the servo is
//!   free, writes the start angle, then moves one interpolation step per
//!   cycle until the end angle is reached and the servo is released.
//!
//! Lines driving different servos progress side by side. A line whose
//! servo is held by another line waits for it. The run ends when every line
//! has finished.

use crate::output::ServoOutput;
use crate::registry::{Binding, BindingId, Registry, Run, SequenceEvent};
use crate::sequence::{LineKind, Motion, SequenceLine};
use crate::servo::{LineRef, ServoBank};
use crate::time::{elapsed_ms, Timing};

/// Advance every run in progress by one cycle.
///
/// Runs armed during `cycle` itself are left for the next one.
pub fn advance<S, const SERVOS: usize, const BINDINGS: usize, const LINES: usize>(
    registry: &mut Registry<BINDINGS, LINES>,
    servos: &mut ServoBank<S, SERVOS>,
    now: u32,
    cycle: u32,
    timing: &Timing,
) where
    S: ServoOutput,
{
    for (idx, binding) in registry.bindings_mut().iter_mut().enumerate() {
        advance_binding(BindingId(idx as u8), binding, servos, now, cycle, timing);
    }
}

fn advance_binding<S, const SERVOS: usize, const LINES: usize>(
    id: BindingId,
    binding: &mut Binding<LINES>,
    servos: &mut ServoBank<S, SERVOS>,
    now: u32,
    cycle: u32,
    timing: &Timing,
) where
    S: ServoOutput,
{
    let Some(table) = binding.table() else {
        return;
    };
    let Some(run) = binding.run.as_mut() else {
        return;
    };
    if run.armed_cycle() == cycle {
        return;
    }

    let elapsed = elapsed_ms(now, run.started_ms());
    for (line_idx, line) in table.iter().enumerate() {
        if run.is_finished(line_idx) {
            continue;
        }
        let line_ref = LineRef {
            binding: id,
            line: line_idx,
        };
        match line.kind {
            LineKind::Action(action) => {
                if elapsed >= line.offset_ms {
                    trace!("binding {} line {} action", id.0, line_idx);
                    action();
                    run.mark_finished(line_idx);
                }
            }
            LineKind::Motion(motion) => {
                advance_motion(line_ref, line, &motion, run, servos, elapsed, timing);
            }
        }
    }

    if run.all_finished() {
        binding.run = None;
        debug!("binding {} run ended", id.0);
        if let Some(control) = binding.control() {
            let _ = control(SequenceEvent::RunEnded, id);
        }
    }
}

fn advance_motion<S, const SERVOS: usize, const LINES: usize>(
    line_ref: LineRef,
    line: &SequenceLine,
    motion: &Motion,
    run: &mut Run<LINES>,
    servos: &mut ServoBank<S, SERVOS>,
    elapsed: u32,
    timing: &Timing,
) where
    S: ServoOutput,
{
    let Some(servo) = servos.get_mut(motion.servo) else {
        warn!("line {} targets undeclared servo {}", line_ref.line, motion.servo);
        run.mark_finished(line_ref.line);
        return;
    };

    match servo.owner() {
        // Busy with another line, wait for it
        Some(owner) if owner != line_ref => {}
        Some(_) => {
            let (done, total) = servo.step();
            servo.write(motion.angle_at(done, total));
            if servo.remaining() == 0 {
                trace!("servo {} released by line {}", motion.servo, line_ref.line);
                servo.release();
                run.mark_finished(line_ref.line);
            }
        }
        None => {
            if elapsed >= line.offset_ms {
                trace!("servo {} claimed by line {}", motion.servo, line_ref.line);
                servo.claim(line_ref, timing.ticks_for(motion.duration_ms), motion.start_deg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};
    use std::vec::Vec;

    #[derive(Debug, Default)]
    struct MockServo {
        writes: Vec<u16>,
    }

    impl ServoOutput for MockServo {
        fn write_degrees(&mut self, degrees: u16) {
            self.writes.push(degrees);
        }
    }

    const TIMING: Timing = Timing::DEFAULT;

    type Bank = ServoBank<MockServo, 2>;
    type Reg = Registry<4, 8>;

    fn bank() -> Bank {
        let mut bank = Bank::new();
        bank.declare(0, MockServo::default()).unwrap();
        bank.declare(1, MockServo::default()).unwrap();
        bank
    }

    fn last(bank: &Bank, servo: u8) -> Option<u16> {
        bank.get(servo).unwrap().output().writes.last().copied()
    }

    /// Run cycles at 20 ms spacing from `start` until `until` (inclusive).
    fn run_cycles_from(reg: &mut Reg, bank: &mut Bank, start: u32, first_cycle: u32, until: u32) {
        let mut now = start;
        let mut cycle = first_cycle;
        while now <= until {
            advance(reg, bank, now, cycle, &TIMING);
            now += 20;
            cycle += 1;
        }
    }

    fn run_cycles(reg: &mut Reg, bank: &mut Bank, start: u32, until: u32) {
        run_cycles_from(reg, bank, start, 1, until);
    }

    #[test]
    fn test_single_motion_reaches_end_angle() {
        static TABLE: [SequenceLine; 1] = [SequenceLine::motion(0, 0, 200, 0, 100)];
        let mut reg = Reg::new();
        let mut bank = bank();
        let id = reg.register_sequence(0, 0, &TABLE, None).unwrap();
        assert!(reg.trigger(id, 0, 0));

        // Claim at 20 ms writes the start angle
        advance(&mut reg, &mut bank, 20, 1, &TIMING);
        assert_eq!(last(&bank, 0), Some(0));
        assert_eq!(bank.get(0).unwrap().remaining(), 10);

        run_cycles_from(&mut reg, &mut bank, 40, 2, 220);

        let writes = &bank.get(0).unwrap().output().writes;
        assert_eq!(writes.len(), 11);
        assert_eq!(writes.last(), Some(&100));
        assert!(writes.windows(2).all(|w| w[0] <= w[1]));
        assert!(bank.get(0).unwrap().is_idle());
        assert!(!reg.get(id).unwrap().in_progress());
    }

    #[test]
    fn test_run_armed_this_cycle_waits() {
        static TABLE: [SequenceLine; 1] = [SequenceLine::motion(0, 0, 100, 0, 50)];
        let mut reg = Reg::new();
        let mut bank = bank();
        let id = reg.register_sequence(0, 0, &TABLE, None).unwrap();
        assert!(reg.trigger(id, 40, 3));

        advance(&mut reg, &mut bank, 40, 3, &TIMING);
        assert!(bank.get(0).unwrap().is_idle());

        advance(&mut reg, &mut bank, 60, 4, &TIMING);
        assert!(!bank.get(0).unwrap().is_idle());
    }

    #[test]
    fn test_short_action_fires_once() {
        static CALLS: AtomicU32 = AtomicU32::new(0);
        fn ping() {
            CALLS.fetch_add(1, Ordering::SeqCst);
        }
        static TABLE: [SequenceLine; 2] = [
            SequenceLine::action(40, ping),
            SequenceLine::motion(0, 0, 300, 0, 30),
        ];

        let mut reg = Reg::new();
        let mut bank = bank();
        let id = reg.register_sequence(0, 0, &TABLE, None).unwrap();
        assert!(reg.trigger(id, 0, 0));

        run_cycles(&mut reg, &mut bank, 20, 100);
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        assert!(reg.get(id).unwrap().in_progress());

        run_cycles_from(&mut reg, &mut bank, 120, 6, 400);
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        assert!(!reg.get(id).unwrap().in_progress());
    }

    #[test]
    fn test_action_on_last_line_ends_run() {
        static CALLS: AtomicU32 = AtomicU32::new(0);
        fn done() {
            CALLS.fetch_add(1, Ordering::SeqCst);
        }
        static TABLE: [SequenceLine; 2] = [
            SequenceLine::motion(0, 0, 100, 0, 10),
            SequenceLine::action(200, done),
        ];

        let mut reg = Reg::new();
        let mut bank = bank();
        let id = reg.register_sequence(0, 0, &TABLE, None).unwrap();
        assert!(reg.trigger(id, 0, 0));

        run_cycles(&mut reg, &mut bank, 20, 180);
        assert!(reg.get(id).unwrap().in_progress());
        run_cycles_from(&mut reg, &mut bank, 200, 10, 200);
        assert!(!reg.get(id).unwrap().in_progress());
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);

        // A new run fires the action again
        assert!(reg.trigger(id, 300, 20));
        run_cycles_from(&mut reg, &mut bank, 320, 21, 520);
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_distinct_servos_move_together() {
        static TABLE: [SequenceLine; 2] = [
            SequenceLine::motion(0, 0, 200, 0, 90),
            SequenceLine::motion(1, 100, 200, 180, 90),
        ];
        let mut reg = Reg::new();
        let mut bank = bank();
        let id = reg.register_sequence(0, 0, &TABLE, None).unwrap();
        assert!(reg.trigger(id, 0, 0));

        // At 140 ms both servos are mid-motion
        run_cycles(&mut reg, &mut bank, 20, 140);
        assert!(!bank.get(0).unwrap().is_idle());
        assert!(!bank.get(1).unwrap().is_idle());
        let a = last(&bank, 0).unwrap();
        let b = last(&bank, 1).unwrap();
        assert!(a > 0 && a < 90);
        assert!(b < 180 && b > 90);

        run_cycles_from(&mut reg, &mut bank, 160, 8, 400);
        assert_eq!(last(&bank, 0), Some(90));
        assert_eq!(last(&bank, 1), Some(90));
        assert!(!reg.get(id).unwrap().in_progress());
    }

    #[test]
    fn test_busy_servo_stalls_other_sequence() {
        static FIRST: [SequenceLine; 1] = [SequenceLine::motion(0, 0, 200, 0, 90)];
        static SECOND: [SequenceLine; 1] = [SequenceLine::motion(0, 0, 100, 90, 0)];
        let mut reg = Reg::new();
        let mut bank = bank();
        let first = reg.register_sequence(0, 0, &FIRST, None).unwrap();
        let second = reg.register_sequence(0, 1, &SECOND, None).unwrap();
        assert!(reg.trigger(first, 0, 0));
        assert!(reg.trigger(second, 0, 0));

        run_cycles(&mut reg, &mut bank, 20, 100);
        assert_eq!(
            bank.get(0).unwrap().owner(),
            Some(LineRef {
                binding: first,
                line: 0
            })
        );

        // First releases at 220 ms and second claims the servo in the same cycle
        run_cycles_from(&mut reg, &mut bank, 120, 6, 220);
        assert!(!reg.get(first).unwrap().in_progress());
        assert_eq!(
            bank.get(0).unwrap().owner(),
            Some(LineRef {
                binding: second,
                line: 0
            })
        );
        assert_eq!(last(&bank, 0), Some(90));

        run_cycles_from(&mut reg, &mut bank, 240, 12, 400);
        assert_eq!(last(&bank, 0), Some(0));
        assert!(!reg.get(second).unwrap().in_progress());
    }

    #[test]
    fn test_back_to_back_motions_on_one_servo() {
        static TABLE: [SequenceLine; 2] = [
            SequenceLine::motion(0, 0, 100, 0, 50),
            SequenceLine::motion(0, 100, 100, 50, 0),
        ];
        let mut reg = Reg::new();
        let mut bank = bank();
        let id = reg.register_sequence(0, 0, &TABLE, None).unwrap();
        assert!(reg.trigger(id, 0, 0));

        run_cycles(&mut reg, &mut bank, 20, 500);
        let writes = &bank.get(0).unwrap().output().writes;
        assert!(writes.contains(&50));
        assert_eq!(writes.last(), Some(&0));
        assert!(!reg.get(id).unwrap().in_progress());
    }

    #[test]
    fn test_end_notification() {
        static ENDED: AtomicU32 = AtomicU32::new(0);
        fn control(event: SequenceEvent, _id: BindingId) -> bool {
            if event == SequenceEvent::RunEnded {
                ENDED.fetch_add(1, Ordering::SeqCst);
            }
            true
        }
        static TABLE: [SequenceLine; 1] = [SequenceLine::motion(1, 0, 60, 10, 20)];

        let mut reg = Reg::new();
        let mut bank = bank();
        let id = reg.register_sequence(0, 0, &TABLE, Some(control)).unwrap();
        assert!(reg.trigger(id, 0, 0));

        run_cycles(&mut reg, &mut bank, 20, 200);
        assert_eq!(ENDED.load(Ordering::SeqCst), 1);
        assert_eq!(last(&bank, 1), Some(20));
    }

    #[test]
    fn test_undeclared_servo_does_not_block_run() {
        static TABLE: [SequenceLine; 2] = [
            SequenceLine::motion(7, 0, 100, 0, 10),
            SequenceLine::motion(0, 0, 40, 0, 10),
        ];
        let mut reg = Reg::new();
        let mut bank = bank();
        let id = reg.register_sequence(0, 0, &TABLE, None).unwrap();
        assert!(reg.trigger(id, 0, 0));

        run_cycles(&mut reg, &mut bank, 20, 200);
        assert!(!reg.get(id).unwrap().in_progress());
    }

    #[test]
    fn test_run_ends_when_every_line_finished() {
        static ENDED: AtomicU32 = AtomicU32::new(0);
        fn control(event: SequenceEvent, _id: BindingId) -> bool {
            if event == SequenceEvent::RunEnded {
                ENDED.fetch_add(1, Ordering::SeqCst);
            }
            true
        }
        static TABLE: [SequenceLine; 2] = [
            SequenceLine::motion(0, 0, 400, 0, 40),
            SequenceLine::motion(1, 0, 100, 0, 10),
        ];

        let mut reg = Reg::new();
        let mut bank = bank();
        let id = reg.register_sequence(0, 0, &TABLE, Some(control)).unwrap();
        assert!(reg.trigger(id, 0, 0));

        // Last table line releases servo 1 at 120 ms, servo 0 still moving
        run_cycles(&mut reg, &mut bank, 20, 200);
        assert!(bank.get(1).unwrap().is_idle());
        assert_eq!(last(&bank, 1), Some(10));
        assert!(reg.get(id).unwrap().in_progress());
        assert_eq!(
            bank.get(0).unwrap().owner(),
            Some(LineRef {
                binding: id,
                line: 0
            })
        );
        assert_eq!(ENDED.load(Ordering::SeqCst), 0);

        run_cycles_from(&mut reg, &mut bank, 220, 11, 600);
        assert!(!reg.get(id).unwrap().in_progress());
        assert!(bank.get(0).unwrap().is_idle());
        assert_eq!(last(&bank, 0), Some(40));
        assert_eq!(ENDED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_across_clock_wraparound() {
        static CALLS: AtomicU32 = AtomicU32::new(0);
        fn chime() {
            CALLS.fetch_add(1, Ordering::SeqCst);
        }
        static TABLE: [SequenceLine; 2] = [
            SequenceLine::action(100, chime),
            SequenceLine::motion(0, 0, 200, 0, 90),
        ];

        let mut reg = Reg::new();
        let mut bank = bank();
        let id = reg.register_sequence(0, 0, &TABLE, None).unwrap();
        let start = u32::MAX - 30;
        assert!(reg.trigger(id, start, 0));

        // Action at 100 ms lands after the counter wrapped
        let mut now = start;
        for cycle in 1..=20 {
            now = now.wrapping_add(20);
            advance(&mut reg, &mut bank, now, cycle, &TIMING);
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(last(&bank, 0), Some(90));
        assert!(!reg.get(id).unwrap().in_progress());
    }

    #[test]
    fn test_end_notification_after_action_line() {
        static ENDED: AtomicU32 = AtomicU32::new(0);
        fn control(event: SequenceEvent, _id: BindingId) -> bool {
            if event == SequenceEvent::RunEnded {
                ENDED.fetch_add(1, Ordering::SeqCst);
            }
            true
        }
        fn beep() {}
        static TABLE: [SequenceLine; 2] = [
            SequenceLine::motion(0, 0, 40, 0, 10),
            SequenceLine::action(100, beep),
        ];

        let mut reg = Reg::new();
        let mut bank = bank();
        let id = reg.register_sequence(0, 0, &TABLE, Some(control)).unwrap();
        assert!(reg.trigger(id, 0, 0));

        run_cycles(&mut reg, &mut bank, 20, 80);
        assert_eq!(ENDED.load(Ordering::SeqCst), 0);
        run_cycles_from(&mut reg, &mut bank, 100, 5, 200);
        assert_eq!(ENDED.load(Ordering::SeqCst), 1);
        assert!(!reg.get(id).unwrap().in_progress());
    }
}
