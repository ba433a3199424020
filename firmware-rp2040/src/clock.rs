//! Millisecond clock backed by the Embassy time driver.

use embassy_time::Instant;
use rcseq_core::Clock;

/// [`Clock`] reading the Embassy uptime.
///
/// The 64-bit uptime is truncated to 32 bits; the sequencer handles the
/// resulting wraparound after ~49.7 days.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    #[inline]
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}
