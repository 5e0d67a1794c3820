// src/common/hal_traits.rs

use super::timing::Ticks;
use core::fmt::Debug;
use core::ops::{BitOr, BitOrAssign};

/// One compare channel of the free-running bit clock timer.
///
/// All channels of a timer observe the same counter; each can raise one
/// event when the counter reaches its compare value.
pub trait CompareChannel {
    /// Current value of the shared free-running counter.
    fn counter(&self) -> Ticks;

    /// Sets the absolute counter value at which the next event fires.
    fn set_compare(&mut self, at: Ticks);

    /// Enables the compare event (interrupt) for this channel.
    fn enable_event(&mut self);

    /// Stops the channel from raising events. The counter keeps running.
    fn disable_event(&mut self);
}

/// Signal transition that raises a port interrupt.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Falling,
    Rising,
}

/// Set of port lines the edge detector cares about.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineMask(u8);

impl LineMask {
    pub const NONE: LineMask = LineMask(0);
    /// Serial receive line.
    pub const RX: LineMask = LineMask(1 << 0);
    /// Auxiliary event input (the board button).
    pub const AUX: LineMask = LineMask(1 << 1);

    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        LineMask(bits)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: LineMask) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn intersects(self, other: LineMask) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn without(self, other: LineMask) -> LineMask {
        LineMask(self.0 & !other.0)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LineMask {
    type Output = LineMask;

    fn bitor(self, rhs: LineMask) -> LineMask {
        LineMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for LineMask {
    fn bitor_assign(&mut self, rhs: LineMask) {
        self.0 |= rhs.0;
    }
}

/// Edge-triggered interrupt control for the GPIO port carrying the receive
/// and auxiliary lines.
pub trait EdgeInterrupts {
    /// Selects which transition raises an interrupt on `lines`.
    fn configure_edge_interrupt(&mut self, edge: Edge, lines: LineMask);

    /// Enables interrupts for `lines`, leaving other lines untouched.
    fn enable_lines(&mut self, lines: LineMask);

    /// Disables interrupts for `lines`, leaving other lines untouched.
    fn disable_lines(&mut self, lines: LineMask);

    /// Lines with a latched edge flag.
    fn pending(&self) -> LineMask;

    /// Clears every latched edge flag on the port.
    fn clear_interrupt_flags(&mut self);
}

/// Cooperative low-power halt of the foreground context.
pub trait LowPower {
    /// Halts until any interrupt has run. May return spuriously.
    fn wait_for_interrupt(&mut self);
}

/// Factory oscillator trim values.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Trim {
    /// Coarse range selection.
    pub range: u8,
    /// Fine step and modulation within the range.
    pub step: u8,
}

impl Trim {
    /// Value of an erased information-flash byte.
    pub const ERASED: u8 = 0xFF;

    /// Builds a trim from raw calibration bytes; erased bytes mean no calibration.
    pub const fn from_raw(range: u8, step: u8) -> Option<Self> {
        if range == Self::ERASED || step == Self::ERASED {
            None
        } else {
            Some(Trim { range, step })
        }
    }
}

/// Source of the calibrated time base the bit clock depends on.
pub trait ClockCalibration {
    /// Factory trim for the target frequency, if present.
    fn calibrated_trim(&self) -> Option<Trim>;

    /// Loads `trim` into the oscillator.
    fn apply_trim(&mut self, trim: Trim);
}

/// Foreground byte sink used by the dispatcher.
///
/// Mirrors a non-blocking serial write: one byte in flight at most, callers
/// busy-wait on `WouldBlock` (usually with `nb::block!`).
pub trait TxPort {
    /// Associated error type for transmit failures.
    type Error: Debug;

    /// Hands one byte to the transmitter, or `WouldBlock` while a frame is
    /// still on the wire.
    fn try_send(&mut self, byte: u8) -> nb::Result<(), Self::Error>;

    /// `Ok` once the last frame, stop bit included, has left the line.
    fn flush(&mut self) -> nb::Result<(), Self::Error>;
}
