#![no_std]
#![no_main]

use defmt::{error, info, unwrap, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::pwm::{Pwm, PwmOutput};
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};
use portable_atomic::{AtomicBool, Ordering};
use rcseq_rp2040::config::{
    BINDING_CAPACITY, CHANNEL_COUNT, HATCH, KEYPAD, SERVO_COUNT, SIGNAL_TIMEOUT_MS, STICK, SWITCH,
    WAVE,
};
use rcseq_rp2040::output::servo_pwm_config;
use rcseq_rp2040::{
    BindingId, EmbassyClock, PulseSlot, PwmCapture, PwmServo, SequenceEvent, Sequencer,
    SignalPulseInput,
};
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

type Servo = PwmServo<PwmOutput<'static>>;
type Board = Sequencer<
    EmbassyClock,
    SignalPulseInput,
    Servo,
    CHANNEL_COUNT,
    SERVO_COUNT,
    BINDING_CAPACITY,
>;

/// Latest pulse width per receiver channel.
/// Signal gives "latest value wins" semantics: the sequencer only ever
/// decodes the most recent pulse of each channel.
static PULSE_SLOTS: StaticCell<[PulseSlot; CHANNEL_COUNT]> = StaticCell::new();

/// Lights state, flipped by the lights short action.
static LIGHTS: AtomicBool = AtomicBool::new(false);
/// Set by the keypad to center both servos.
static CENTER_REQUEST: AtomicBool = AtomicBool::new(false);
/// Stick channel has stopped sending pulses.
static SIGNAL_LOST: AtomicBool = AtomicBool::new(true);

fn toggle_lights() {
    LIGHTS.fetch_xor(true, Ordering::Relaxed);
}

fn request_center() {
    CENTER_REQUEST.store(true, Ordering::Relaxed);
}

/// Refuse to start choreographies while the receiver link is down.
fn guard_link(event: SequenceEvent, id: BindingId) -> bool {
    match event {
        SequenceEvent::StartRequested => {
            let lost = SIGNAL_LOST.load(Ordering::Relaxed);
            if lost {
                warn!("sequence {} refused: no signal", id.0);
            }
            !lost
        }
        SequenceEvent::RunEnded => {
            info!("sequence {} done", id.0);
            true
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("rcseq {} starting...", rcseq_core::VERSION);

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- Receiver capture ---
    let slots: &'static [PulseSlot; CHANNEL_COUNT] =
        PULSE_SLOTS.init(core::array::from_fn(|_| Signal::new()));

    spawner.spawn(capture_task(0, Input::new(p.PIN_2, Pull::Down), &slots[0])).unwrap();
    spawner.spawn(capture_task(1, Input::new(p.PIN_3, Pull::Down), &slots[1])).unwrap();
    spawner.spawn(capture_task(2, Input::new(p.PIN_4, Pull::Down), &slots[2])).unwrap();

    // --- Servo PWM ---
    let (servo0, _) = Pwm::new_output_a(p.PWM_SLICE0, p.PIN_16, servo_pwm_config()).split();
    let (servo1, _) = Pwm::new_output_a(p.PWM_SLICE1, p.PIN_18, servo_pwm_config()).split();

    let mut led = Output::new(p.PIN_25, Level::Low);

    // --- Sequencer ---
    let mut sequencer = Board::new(EmbassyClock);

    unwrap!(sequencer.declare_servo(0, PwmServo::new(unwrap!(servo0))));
    unwrap!(sequencer.declare_servo(1, PwmServo::new(unwrap!(servo1))));

    for (index, slot) in slots.iter().enumerate() {
        unwrap!(sequencer.declare_channel(index as u8, SignalPulseInput::new(slot)));
    }
    unwrap!(sequencer.configure_channel(0, STICK));
    unwrap!(sequencer.configure_channel(1, SWITCH));
    unwrap!(sequencer.configure_channel(2, KEYPAD));

    unwrap!(sequencer.register_sequence(0, 3, &WAVE, Some(guard_link)));
    unwrap!(sequencer.register_sequence(1, 0, &HATCH, Some(guard_link)));
    unwrap!(sequencer.register_short_action(1, 2, toggle_lights));
    unwrap!(sequencer.register_short_action(2, 0, toggle_lights));
    unwrap!(sequencer.register_short_action(2, 3, request_center));

    info!("rcseq initialized, {} bindings", sequencer.registry().len());

    run(&mut sequencer, &mut led).await
}

/// Main loop: poll the sequencer and mirror its side effects on the board.
async fn run(sequencer: &mut Board, led: &mut Output<'static>) -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(1));

    loop {
        if sequencer.tick() {
            let lost = sequencer.signal_timeout(0, SIGNAL_TIMEOUT_MS);
            if SIGNAL_LOST.swap(lost, Ordering::Relaxed) != lost {
                if lost {
                    warn!("receiver signal lost");
                } else {
                    info!("receiver signal acquired");
                }
            }

            if CENTER_REQUEST.swap(false, Ordering::Relaxed) {
                sequencer.servo_write(0, 90);
                sequencer.servo_write(1, 0);
            }

            led.set_level(if LIGHTS.load(Ordering::Relaxed) {
                Level::High
            } else {
                Level::Low
            });
        }
        ticker.next().await;
    }
}

/// Capture task - measures pulses on one receiver channel.
#[embassy_executor::task(pool_size = CHANNEL_COUNT)]
async fn capture_task(channel: u8, pin: Input<'static>, slot: &'static PulseSlot) {
    let mut capture = PwmCapture::new(pin);
    if capture.run(slot).await.is_err() {
        error!("channel {} capture stopped", channel);
    }
}
