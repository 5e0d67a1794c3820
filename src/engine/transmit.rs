// src/engine/transmit.rs

use super::bit_clock::{BitClock, Direction};
use crate::common::{
    frame::{Frame, FRAME_BITS},
    timing::{BitTiming, Ticks},
};
use core::convert::Infallible;
use embedded_hal::digital::OutputPin;

/// Transmit slot. `Framing` doubles as the busy flag.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxState {
    Idle,
    Framing {
        /// Cells not yet on the wire, next one in bit 0.
        pattern: u16,
        /// Cells left to drive. Zero means the stop cell is being held.
        remaining: u8,
    },
}

/// Shifts one frame at a time onto the output line, one cell per bit clock event.
#[derive(Debug)]
pub struct TransmitEngine {
    state: TxState,
    deadline: Ticks,
}

impl Default for TransmitEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TransmitEngine {
    pub const fn new() -> Self {
        TransmitEngine {
            state: TxState::Idle,
            deadline: 0,
        }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        !matches!(self.state, TxState::Idle)
    }

    /// Loads `byte` into the slot and arms the first bit boundary one bit
    /// period from now. `WouldBlock` while the previous frame is on the wire.
    pub fn try_send<C: BitClock>(
        &mut self,
        byte: u8,
        clock: &mut C,
        timing: &BitTiming,
    ) -> nb::Result<(), Infallible> {
        if self.is_busy() {
            return Err(nb::Error::WouldBlock);
        }
        self.state = TxState::Framing {
            pattern: Frame::new(byte).cells(),
            remaining: FRAME_BITS,
        };
        self.deadline = clock.now().wrapping_add(timing.bit());
        clock.arm(Direction::Transmit, self.deadline);
        Ok(())
    }

    /// Bit clock step. Re-arms first, then either drives the next cell or,
    /// once the stop cell has been held a full period, frees the slot.
    pub fn on_bit_boundary<C, P>(
        &mut self,
        clock: &mut C,
        timing: &BitTiming,
        line: &mut P,
    ) -> Result<(), P::Error>
    where
        C: BitClock,
        P: OutputPin,
    {
        let TxState::Framing { pattern, remaining } = self.state else {
            // Spurious event with nothing in flight
            clock.disarm(Direction::Transmit);
            return Ok(());
        };

        self.deadline = self.deadline.wrapping_add(timing.bit());
        clock.arm(Direction::Transmit, self.deadline);

        if remaining == 0 {
            clock.disarm(Direction::Transmit);
            self.state = TxState::Idle;
            return Ok(());
        }

        self.state = TxState::Framing {
            pattern: pattern >> 1,
            remaining: remaining - 1,
        };
        if pattern & 1 == 1 {
            line.set_high()
        } else {
            line.set_low()
        }
    }
}
