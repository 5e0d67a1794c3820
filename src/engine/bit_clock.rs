// src/engine/bit_clock.rs

use crate::common::{hal_traits::CompareChannel, timing::Ticks};

/// Which engine a bit clock deadline belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Transmit,
    Receive,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Transmit, Direction::Receive];

    #[inline]
    const fn index(self) -> usize {
        match self {
            Direction::Transmit => 0,
            Direction::Receive => 1,
        }
    }
}

/// Two independently schedulable one-shot bit boundary timers sharing one
/// free-running counter.
///
/// Deadlines are absolute counter values. Engines re-arm at their previous
/// deadline plus one bit, never at `now()` plus one bit, so interrupt latency
/// does not accumulate across a frame.
pub trait BitClock {
    /// Current counter value.
    fn now(&self) -> Ticks;

    /// Fires one event for `direction` when the counter reaches `at`.
    /// Replaces any deadline already armed for that direction.
    fn arm(&mut self, direction: Direction, at: Ticks);

    /// Cancels the deadline for `direction`.
    fn disarm(&mut self, direction: Direction);
}

/// Bit clock backed by one physical compare channel per direction.
#[derive(Debug)]
pub struct DualChannelClock<T, R> {
    transmit: T,
    receive: R,
}

impl<T, R> DualChannelClock<T, R>
where
    T: CompareChannel,
    R: CompareChannel,
{
    /// Both channels must belong to the same timer.
    pub fn new(mut transmit: T, mut receive: R) -> Self {
        transmit.disable_event();
        receive.disable_event();
        DualChannelClock { transmit, receive }
    }

    pub fn release(self) -> (T, R) {
        (self.transmit, self.receive)
    }
}

impl<T, R> BitClock for DualChannelClock<T, R>
where
    T: CompareChannel,
    R: CompareChannel,
{
    fn now(&self) -> Ticks {
        self.transmit.counter()
    }

    fn arm(&mut self, direction: Direction, at: Ticks) {
        match direction {
            Direction::Transmit => {
                self.transmit.set_compare(at);
                self.transmit.enable_event();
            }
            Direction::Receive => {
                self.receive.set_compare(at);
                self.receive.enable_event();
            }
        }
    }

    fn disarm(&mut self, direction: Direction) {
        match direction {
            Direction::Transmit => self.transmit.disable_event(),
            Direction::Receive => self.receive.disable_event(),
        }
    }
}

/// Directions whose deadline fired on a shared compare event.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Expired {
    pub transmit: bool,
    pub receive: bool,
}

impl Expired {
    pub const NONE: Expired = Expired {
        transmit: false,
        receive: false,
    };

    pub const fn is_empty(&self) -> bool {
        !self.transmit && !self.receive
    }

    fn mark(&mut self, direction: Direction) {
        match direction {
            Direction::Transmit => self.transmit = true,
            Direction::Receive => self.receive = true,
        }
    }
}

/// Bit clock multiplexing both directions onto a single compare channel.
///
/// Each deadline is tagged with its owning direction. The channel is always
/// programmed with the earliest pending deadline; when it fires,
/// [`take_expired`](Self::take_expired) reports which directions are due so
/// the caller can run the matching step functions.
///
/// A deadline counts as due once the counter has reached or passed it, so
/// two deadlines closer together than the interrupt latency are reported by
/// the same event instead of one of them waiting a full counter wrap.
#[derive(Debug)]
pub struct ArbitratedClock<C> {
    channel: C,
    deadlines: [Option<Ticks>; 2],
    programmed: Option<Ticks>,
}

impl<C: CompareChannel> ArbitratedClock<C> {
    pub fn new(mut channel: C) -> Self {
        channel.disable_event();
        ArbitratedClock {
            channel,
            deadlines: [None; 2],
            programmed: None,
        }
    }

    /// Pending deadline for `direction`, if armed.
    pub fn deadline(&self, direction: Direction) -> Option<Ticks> {
        self.deadlines[direction.index()]
    }

    /// Called from the compare interrupt. Clears and reports every direction
    /// whose deadline the counter has reached, then reprograms the channel for
    /// whatever is still pending.
    ///
    /// Deadlines armed after this call may already be due by the time they
    /// are armed; callers repeat until the result is empty.
    pub fn take_expired(&mut self) -> Expired {
        let mut expired = Expired::NONE;
        loop {
            let now = self.channel.counter();
            let mut found = false;
            for direction in Direction::ALL {
                let slot = &mut self.deadlines[direction.index()];
                if matches!(*slot, Some(at) if is_due(at, now)) {
                    *slot = None;
                    expired.mark(direction);
                    found = true;
                }
            }
            // The counter may have crossed the other deadline while checking
            if !found {
                break;
            }
        }
        self.reprogram();
        expired
    }

    pub fn release(self) -> C {
        self.channel
    }

    fn reprogram(&mut self) {
        let now = self.channel.counter();
        // Earliest = smallest signed distance from the counter, overdue first.
        let next = self
            .deadlines
            .iter()
            .flatten()
            .copied()
            .min_by_key(|&at| distance(at, now));

        match next {
            Some(at) => {
                if self.programmed != Some(at) {
                    self.channel.set_compare(at);
                }
                self.channel.enable_event();
                self.programmed = Some(at);
            }
            None => {
                self.channel.disable_event();
                self.programmed = None;
            }
        }
    }
}

/// Signed ticks from `now` to `at`. Deadlines never lie more than half the
/// counter range away, so the sign tells past from future.
#[inline]
fn distance(at: Ticks, now: Ticks) -> i16 {
    at.wrapping_sub(now) as i16
}

#[inline]
fn is_due(at: Ticks, now: Ticks) -> bool {
    distance(at, now) <= 0
}

impl<C: CompareChannel> BitClock for ArbitratedClock<C> {
    fn now(&self) -> Ticks {
        self.channel.counter()
    }

    fn arm(&mut self, direction: Direction, at: Ticks) {
        self.deadlines[direction.index()] = Some(at);
        self.reprogram();
    }

    fn disarm(&mut self, direction: Direction) {
        self.deadlines[direction.index()] = None;
        self.reprogram();
    }
}
