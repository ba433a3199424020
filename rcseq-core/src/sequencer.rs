//! Sequencer: registration API and the cyclic tick driver.

use crate::channel::ChannelConfig;
use crate::debounce::Debouncer;
use crate::engine;
use crate::error::SetupError;
use crate::input::PulseInput;
use crate::output::ServoOutput;
use crate::registry::{BindingId, Control, Registry};
use crate::sequence::{initial_angles, SequenceLine, ShortAction};
use crate::servo::ServoBank;
use crate::time::{elapsed_ms, Clock, Timing};

/// A declared input channel.
#[derive(Debug)]
pub struct ChannelSlot<P> {
    input: P,
    config: Option<ChannelConfig>,
    filter: Debouncer,
}

impl<P> ChannelSlot<P> {
    #[inline]
    #[must_use]
    pub fn config(&self) -> Option<&ChannelConfig> {
        self.config.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn filter(&self) -> &Debouncer {
        &self.filter
    }

    #[inline]
    pub fn input(&self) -> &P {
        &self.input
    }
}

/// RC command sequencer.
///
/// Owns up to `CHANNELS` pulse inputs, `SERVOS` servo outputs and
/// `BINDINGS` command bindings whose sequence tables hold at most `LINES`
/// lines each. Everything is declared once at startup; afterwards the
/// application only calls [`tick`](Self::tick) from its main loop.
///
/// # Example
///
/// ```rust
/// use rcseq_core::{ChannelConfig, Clock, PulseInput, SequenceLine, Sequencer, ServoOutput};
///
/// struct Millis;
/// impl Clock for Millis {
///     fn now_ms(&self) -> u32 {
///         0
///     }
/// }
///
/// struct Receiver;
/// impl PulseInput for Receiver {
///     fn take_width_us(&mut self) -> Option<u16> {
///         None
///     }
/// }
///
/// struct Servo;
/// impl ServoOutput for Servo {
///     fn write_degrees(&mut self, _degrees: u16) {}
/// }
///
/// static WAVE: [SequenceLine; 2] = [
///     SequenceLine::motion(0, 0, 1000, 0, 180),
///     SequenceLine::motion(0, 1000, 1000, 180, 0),
/// ];
///
/// let mut seq: Sequencer<Millis, Receiver, Servo, 1, 1, 4> = Sequencer::new(Millis);
/// seq.declare_servo(0, Servo).unwrap();
/// seq.declare_channel(0, Receiver).unwrap();
/// seq.configure_channel(0, ChannelConfig::stick(1000, 2000, 4)).unwrap();
/// seq.register_sequence(0, 3, &WAVE, None).unwrap();
///
/// // Main loop
/// seq.tick();
/// ```
pub struct Sequencer<
    C,
    P,
    S,
    const CHANNELS: usize,
    const SERVOS: usize,
    const BINDINGS: usize,
    const LINES: usize = 32,
> {
    clock: C,
    timing: Timing,
    channels: [Option<ChannelSlot<P>>; CHANNELS],
    servos: ServoBank<S, SERVOS>,
    registry: Registry<BINDINGS, LINES>,
    last_cycle_ms: Option<u32>,
    cycle: u32,
}

impl<C, P, S, const CHANNELS: usize, const SERVOS: usize, const BINDINGS: usize, const LINES: usize>
    Sequencer<C, P, S, CHANNELS, SERVOS, BINDINGS, LINES>
where
    C: Clock,
    P: PulseInput,
    S: ServoOutput,
{
    /// Create a sequencer with [`Timing::DEFAULT`].
    #[must_use]
    pub fn new(clock: C) -> Self {
        Self::with_timing(clock, Timing::DEFAULT)
    }

    /// Create a sequencer with custom timing.
    #[must_use]
    pub fn with_timing(clock: C, timing: Timing) -> Self {
        Self {
            clock,
            timing,
            channels: core::array::from_fn(|_| None),
            servos: ServoBank::new(),
            registry: Registry::new(),
            last_cycle_ms: None,
            cycle: 0,
        }
    }

    // -- Setup --

    /// Attach `output` as servo `index`.
    pub fn declare_servo(&mut self, index: u8, output: S) -> Result<(), SetupError> {
        self.servos.declare(index, output).inspect_err(|_| {
            warn!("servo {} rejected (capacity {})", index, SERVOS);
        })
    }

    /// Attach `input` as channel `index`. The channel stays idle until configured.
    pub fn declare_channel(&mut self, index: u8, input: P) -> Result<(), SetupError> {
        let Some(slot) = self.channels.get_mut(usize::from(index)) else {
            warn!("channel {} rejected (capacity {})", index, CHANNELS);
            return Err(SetupError::InvalidIndex);
        };
        *slot = Some(ChannelSlot {
            input,
            config: None,
            filter: Debouncer::new(),
        });
        Ok(())
    }

    /// Set how channel `index` decodes pulses into positions.
    ///
    /// A position held under the previous configuration is dropped; the
    /// signal timeout keeps counting from the last pulse.
    pub fn configure_channel(&mut self, index: u8, config: ChannelConfig) -> Result<(), SetupError> {
        let Some(slot) = self
            .channels
            .get_mut(usize::from(index))
            .and_then(Option::as_mut)
        else {
            warn!("channel {} not declared", index);
            return Err(SetupError::InvalidIndex);
        };
        slot.config = Some(config);
        slot.filter.release_hold();
        Ok(())
    }

    /// Bind a sequence table to `(command, position)`.
    ///
    /// Every servo the table moves is sent to the start angle of its
    /// earliest motion right away.
    pub fn register_sequence(
        &mut self,
        command: u8,
        position: u8,
        table: &'static [SequenceLine],
        control: Option<Control>,
    ) -> Result<BindingId, SetupError> {
        let id = self
            .registry
            .register_sequence(command, position, table, control)
            .inspect_err(|err| {
                warn!("sequence {}/{} rejected: {:?}", command, position, err);
            })?;
        for (servo, degrees) in initial_angles(table) {
            self.servos.write(servo, degrees);
        }
        Ok(id)
    }

    /// Bind a short action to `(command, position)`.
    pub fn register_short_action(
        &mut self,
        command: u8,
        position: u8,
        action: ShortAction,
    ) -> Result<BindingId, SetupError> {
        self.registry
            .register_short_action(command, position, action)
            .inspect_err(|err| {
                warn!("short action {}/{} rejected: {:?}", command, position, err);
            })
    }

    // -- Runtime --

    /// Run one cycle if the tick period has elapsed since the previous one.
    ///
    /// Call as often as possible; returns `true` when a cycle was executed.
    /// A cycle polls and decodes every channel, fires the commands that have
    /// held long enough, advances the runs in progress and refreshes the
    /// servo outputs.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now_ms();
        if let Some(last) = self.last_cycle_ms {
            if elapsed_ms(now, last) < self.timing.tick_ms {
                return false;
            }
        }
        self.last_cycle_ms = Some(now);
        self.cycle = self.cycle.wrapping_add(1);

        self.poll_channels(now);
        engine::advance(
            &mut self.registry,
            &mut self.servos,
            now,
            self.cycle,
            &self.timing,
        );
        self.servos.refresh_all();
        true
    }

    fn poll_channels(&mut self, now: u32) {
        for (index, slot) in self.channels.iter_mut().enumerate() {
            let Some(slot) = slot else {
                continue;
            };
            let Some(width_us) = slot.input.take_width_us() else {
                continue;
            };
            let Some(config) = slot.config else {
                slot.filter.mark_pulse(now);
                continue;
            };

            let position = config.decode(width_us);
            let hold_ms = self.timing.hold_ms(config.kind());
            if let Some(position) = slot.filter.update(position, now, hold_ms) {
                debug!("channel {} position {} ({} us)", index, position, width_us);
                let _ = self
                    .registry
                    .trigger_command(index as u8, position, now, self.cycle);
            }
        }
    }

    /// Fire the first binding registered for `(command, position)`.
    ///
    /// Returns `true` if a short action ran or a sequence run started.
    pub fn trigger(&mut self, command: u8, position: u8) -> bool {
        let now = self.clock.now_ms();
        self.registry
            .trigger_command(command, position, now, self.cycle)
    }

    /// Start the binding that owns `table`, as if its command had fired.
    ///
    /// Returns `false` for an unregistered table or a run already in progress.
    pub fn launch_sequence(&mut self, table: &[SequenceLine]) -> bool {
        let Some(id) = self.registry.find_table(table) else {
            debug!("launch of unregistered table ignored");
            return false;
        };
        let now = self.clock.now_ms();
        self.registry.trigger(id, now, self.cycle)
    }

    /// Move servo `index` to `degrees` outside of any sequence.
    pub fn servo_write(&mut self, index: u8, degrees: u16) {
        self.servos.write(index, degrees);
    }

    /// Check if channel `index` has gone `timeout_ms` without a pulse.
    ///
    /// Undeclared channels report `false`.
    #[must_use]
    pub fn signal_timeout(&self, index: u8, timeout_ms: u32) -> bool {
        match self.channel(index) {
            Some(slot) => slot.filter.timed_out(self.clock.now_ms(), timeout_ms),
            None => false,
        }
    }

    // -- Inspection --

    /// Check if binding `id` has a run in progress.
    #[must_use]
    pub fn is_running(&self, id: BindingId) -> bool {
        self.registry.get(id).is_some_and(|b| b.in_progress())
    }

    #[inline]
    #[must_use]
    pub fn channel(&self, index: u8) -> Option<&ChannelSlot<P>> {
        self.channels.get(usize::from(index))?.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn servos(&self) -> &ServoBank<S, SERVOS> {
        &self.servos
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Registry<BINDINGS, LINES> {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Number of cycles executed so far (wrapping).
    #[inline]
    #[must_use]
    pub fn cycle(&self) -> u32 {
        self.cycle
    }
}
