//! Channel topology and pulse-width decoding.
//!
//! A receiver channel is split into discrete positions. How the pulse range
//! is carved into acceptance zones depends on what the transmitter control
//! physically is:
//!
//! ```text
//! STICK (inactive gaps, mirrored around the center)
//!   Pos 0       1       2       3
//!   |-----|-|-----|   |-----|-|-----|
//! min                              max
//!
//! MULTI POSITION SWITCH (every zone measured from min, center reachable)
//!   Pos 0     1     2     3     4
//!   |---|-|---|-|---|-|---|-|---|
//! min                          max
//! ```
//!
//! A zone spans three steps, the gap between two zones one step.

/// Steps covered by one acceptance zone.
const ACTIVE_STEPS: u32 = 3;

/// Steps of the inactive gap following a zone.
const INACTIVE_STEPS: u32 = 1;

/// Inclusive pulse-width window in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseWindow {
    pub min_us: u16,
    pub max_us: u16,
}

impl PulseWindow {
    #[must_use]
    pub const fn new(min_us: u16, max_us: u16) -> Self {
        Self { min_us, max_us }
    }

    /// Check if `width_us` falls inside the window (bounds included).
    #[inline]
    #[must_use]
    pub const fn contains(&self, width_us: u16) -> bool {
        width_us >= self.min_us && width_us <= self.max_us
    }
}

/// Kind of transmitter control wired to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelKind {
    /// Proportional stick with a dead zone around neutral.
    Stick,
    /// 2/3-position switch, rotary selector or equidistant keypad.
    MultiPositionSwitch,
    /// Keypad with an explicit window per key.
    CustomKeymap,
}

/// Immutable decoding configuration of one input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    kind: ChannelKind,
    min_us: u16,
    max_us: u16,
    positions: u8,
    step_us: u16,
    keymap: &'static [PulseWindow],
}

impl ChannelConfig {
    /// Build a channel configuration.
    ///
    /// `keymap` is only consulted for [`ChannelKind::CustomKeymap`]; the
    /// position count is then capped to the keymap length.
    #[must_use]
    pub const fn new(
        kind: ChannelKind,
        min_us: u16,
        max_us: u16,
        positions: u8,
        keymap: Option<&'static [PulseWindow]>,
    ) -> Self {
        let keymap: &'static [PulseWindow] = match keymap {
            Some(map) => map,
            None => &[],
        };
        let positions = match kind {
            ChannelKind::CustomKeymap if (keymap.len() as u32) < positions as u32 => {
                keymap.len() as u8
            }
            _ => positions,
        };
        Self {
            kind,
            min_us,
            max_us,
            positions,
            step_us: step_us(kind, min_us, max_us, positions),
            keymap,
        }
    }

    /// Stick channel with `positions` zones between `min_us` and `max_us`.
    #[must_use]
    pub const fn stick(min_us: u16, max_us: u16, positions: u8) -> Self {
        Self::new(ChannelKind::Stick, min_us, max_us, positions, None)
    }

    /// Multi-position switch channel with `positions` zones between `min_us` and `max_us`.
    #[must_use]
    pub const fn multi_position(min_us: u16, max_us: u16, positions: u8) -> Self {
        Self::new(ChannelKind::MultiPositionSwitch, min_us, max_us, positions, None)
    }

    /// Keypad channel, one position per keymap entry.
    #[must_use]
    pub const fn custom(keymap: &'static [PulseWindow]) -> Self {
        let positions = if keymap.len() > u8::MAX as usize {
            u8::MAX
        } else {
            keymap.len() as u8
        };
        Self::new(ChannelKind::CustomKeymap, 0, 0, positions, Some(keymap))
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ChannelKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub const fn positions(&self) -> u8 {
        self.positions
    }

    /// Width of one zone step in microseconds (0 for custom keymaps).
    #[inline]
    #[must_use]
    pub const fn step_us(&self) -> u16 {
        self.step_us
    }

    /// Acceptance window of `position`, or `None` if the position does not exist.
    #[must_use]
    pub fn window(&self, position: u8) -> Option<PulseWindow> {
        if position >= self.positions {
            return None;
        }

        let step = u32::from(self.step_us);
        let idx = u32::from(position);
        let count = u32::from(self.positions);
        let min = u32::from(self.min_us);
        let max = u32::from(self.max_us);
        let pitch = (ACTIVE_STEPS + INACTIVE_STEPS) * step;

        let (lo, hi) = match self.kind {
            ChannelKind::CustomKeymap => {
                return self.keymap.get(usize::from(position)).copied();
            }
            ChannelKind::Stick if idx >= count / 2 => {
                // Upper half mirrors the lower half from the maximum bound
                let from_top = count - 1 - idx;
                let hi = max.saturating_sub(pitch * from_top);
                (hi.saturating_sub(ACTIVE_STEPS * step), hi)
            }
            ChannelKind::Stick | ChannelKind::MultiPositionSwitch => {
                let lo = min + pitch * idx;
                (lo, lo + ACTIVE_STEPS * step)
            }
        };

        Some(PulseWindow::new(clamp_u16(lo), clamp_u16(hi)))
    }

    /// Decode a pulse width into a position index.
    ///
    /// Positions are tried in ascending order and the first matching zone
    /// wins. Returns `None` when the width falls into a gap or outside the
    /// configured range.
    #[must_use]
    pub fn decode(&self, width_us: u16) -> Option<u8> {
        (0..self.positions).find(|&pos| {
            self.window(pos)
                .is_some_and(|window| window.contains(width_us))
        })
    }
}

const fn step_us(kind: ChannelKind, min_us: u16, max_us: u16, positions: u8) -> u16 {
    let range = max_us.saturating_sub(min_us) as u32;
    let n = positions as u32;
    let steps = match kind {
        ChannelKind::Stick => n * ACTIVE_STEPS + INACTIVE_STEPS,
        ChannelKind::MultiPositionSwitch => n * (ACTIVE_STEPS + INACTIVE_STEPS),
        ChannelKind::CustomKeymap => 0,
    };
    // Multi-position switches drop the trailing gap so the last zone ends on max
    let steps = match kind {
        ChannelKind::MultiPositionSwitch if steps > 0 => steps - INACTIVE_STEPS,
        _ => steps,
    };
    if steps == 0 {
        0
    } else {
        (range / steps) as u16
    }
}

#[inline]
fn clamp_u16(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}
