// src/engine/receive.rs

use super::bit_clock::{BitClock, Direction};
use crate::common::{
    frame::{Frame, FRAME_BITS},
    timing::{BitTiming, Ticks},
};
use embedded_hal::digital::InputPin;

/// Receive slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxState {
    Idle,
    Framing {
        /// Samples so far, shifted in from the stop-cell end.
        accumulator: u16,
        /// Samples still to take.
        remaining: u8,
    },
}

/// Samples the input line at cell centres and assembles one byte per frame.
///
/// Start and stop cells are sampled but not checked. A misaligned window or a
/// glitch that looked like a start bit still produces a byte.
#[derive(Debug)]
pub struct ReceiveEngine {
    state: RxState,
    deadline: Ticks,
}

impl Default for ReceiveEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiveEngine {
    pub const fn new() -> Self {
        ReceiveEngine {
            state: RxState::Idle,
            deadline: 0,
        }
    }

    pub fn state(&self) -> RxState {
        self.state
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        !matches!(self.state, RxState::Idle)
    }

    /// Start edge seen: clear the slot and arm the first sample half a bit
    /// out, in the middle of the start cell.
    pub fn begin<C: BitClock>(&mut self, clock: &mut C, timing: &BitTiming) {
        self.state = RxState::Framing {
            accumulator: 0,
            remaining: FRAME_BITS,
        };
        self.deadline = clock.now().wrapping_add(timing.half_bit());
        clock.arm(Direction::Receive, self.deadline);
    }

    /// Bit clock step. Re-arms one bit ahead, samples, and returns the data
    /// byte once all ten cells are in.
    pub fn on_bit_boundary<C, P>(
        &mut self,
        clock: &mut C,
        timing: &BitTiming,
        line: &mut P,
    ) -> Result<Option<u8>, P::Error>
    where
        C: BitClock,
        P: InputPin,
    {
        let RxState::Framing { accumulator, remaining } = self.state else {
            clock.disarm(Direction::Receive);
            return Ok(None);
        };

        self.deadline = self.deadline.wrapping_add(timing.bit());
        clock.arm(Direction::Receive, self.deadline);

        let mark = line.is_high()?;
        let accumulator = (accumulator >> 1) | ((mark as u16) << (FRAME_BITS - 1));
        let remaining = remaining - 1;

        if remaining > 0 {
            self.state = RxState::Framing { accumulator, remaining };
            return Ok(None);
        }

        clock.disarm(Direction::Receive);
        self.state = RxState::Idle;
        Ok(Some(Frame::from_cells(accumulator).data()))
    }
}
