//! Board wiring, channel layouts and sequence tables.

use rcseq_core::{ChannelConfig, PulseWindow, SequenceLine};

/// Receiver channels wired to the board.
pub const CHANNEL_COUNT: usize = 3;
/// Servos wired to the board.
pub const SERVO_COUNT: usize = 2;
/// Command bindings the registry can hold.
pub const BINDING_CAPACITY: usize = 8;

/// Servo refresh period.
pub const SERVO_FRAME_US: u32 = 20_000;
/// Pulse width at 0°.
pub const SERVO_MIN_US: u16 = 544;
/// Pulse width at 180°.
pub const SERVO_MAX_US: u16 = 2400;

/// Shortest pulse accepted from the receiver.
pub const PULSE_MIN_US: u16 = 500;
/// Longest pulse accepted from the receiver.
pub const PULSE_MAX_US: u16 = 2500;

/// Time without pulses after which a channel counts as lost.
pub const SIGNAL_TIMEOUT_MS: u32 = 500;

/// Channel 0: throttle-style stick split into four positions.
pub const STICK: ChannelConfig = ChannelConfig::stick(1000, 2000, 4);
/// Channel 1: three-position switch.
pub const SWITCH: ChannelConfig = ChannelConfig::multi_position(1000, 2000, 3);

/// Channel 2 keys, as sent by a resistor-ladder keypad encoder.
pub const KEYPAD_WINDOWS: [PulseWindow; 4] = [
    PulseWindow::new(1000, 1100),
    PulseWindow::new(1250, 1350),
    PulseWindow::new(1500, 1600),
    PulseWindow::new(1750, 1850),
];

/// Channel 2: keypad.
pub const KEYPAD: ChannelConfig = ChannelConfig::custom(&KEYPAD_WINDOWS);

/// Servo 0 sweeps out and back twice.
pub static WAVE: [SequenceLine; 4] = [
    SequenceLine::motion(0, 0, 600, 90, 150),
    SequenceLine::motion(0, 600, 1200, 150, 30),
    SequenceLine::motion(0, 1800, 1200, 30, 150),
    SequenceLine::motion(0, 3000, 600, 150, 90),
];

/// Servo 1 opens the hatch while servo 0 nods, then the hatch closes.
pub static HATCH: [SequenceLine; 4] = [
    SequenceLine::motion(1, 0, 1500, 0, 120),
    SequenceLine::motion(0, 500, 400, 90, 60),
    SequenceLine::motion(0, 900, 400, 60, 90),
    SequenceLine::motion(1, 4000, 1500, 120, 0),
];

