// src/common/test_support.rs

//! Tick-accurate simulation of the timer, port and lines for host tests.
//!
//! One tick is one timer count. Each tick the simulator applies scripted line
//! changes, latches edges, then runs the port interrupt followed by any
//! compare interrupt whose channel matches the counter.

use super::{
    frame::{Frame, FRAME_BITS},
    hal_traits::{CompareChannel, Edge, EdgeInterrupts, LineMask, LowPower, TxPort},
    mailbox::Mailbox,
    timing::{BitTiming, Ticks},
};
use crate::engine::{ArbitratedClock, BitClock, DualChannelClock, Transceiver};
use core::convert::Infallible;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};
use heapless::Deque;
use std::{cell::RefCell, rc::Rc, vec::Vec};

/// Ticks a single `run_until_idle` may take before the test is declared hung.
const IDLE_GUARD: u64 = 2_000_000;

#[derive(Debug, Copy, Clone, Default)]
pub struct SimCompare {
    pub compare: Ticks,
    pub enabled: bool,
}

/// Shared simulated hardware state.
#[derive(Debug)]
pub struct SimHw {
    pub now: u64,
    pub channels: [SimCompare; 2],
    pub tx_level: bool,
    /// Every write to the output line, in order.
    pub tx_trace: Vec<(u64, bool)>,
    /// Receive line follows the output line instead of the script.
    pub loopback: bool,
    pub rx_level: bool,
    pub aux_level: bool,
    rx_source: bool,
    aux_source: bool,
    rx_script: Deque<(u64, bool), 64>,
    aux_script: Deque<(u64, bool), 16>,
    pub falling: LineMask,
    pub rising: LineMask,
    pub enabled: LineMask,
    pub pending: LineMask,
}

impl SimHw {
    fn new(loopback: bool) -> Self {
        SimHw {
            now: 0,
            channels: [SimCompare::default(); 2],
            tx_level: true,
            tx_trace: Vec::new(),
            loopback,
            rx_level: true,
            aux_level: true,
            rx_source: true,
            aux_source: true,
            rx_script: Deque::new(),
            aux_script: Deque::new(),
            falling: LineMask::NONE,
            rising: LineMask::NONE,
            enabled: LineMask::NONE,
            pending: LineMask::NONE,
        }
    }

    pub fn counter(&self) -> Ticks {
        self.now as Ticks
    }

    /// Output line level at tick `t`, from the write trace.
    pub fn tx_level_at(&self, t: u64) -> bool {
        let idx = self.tx_trace.partition_point(|&(at, _)| at <= t);
        if idx == 0 {
            true
        } else {
            self.tx_trace[idx - 1].1
        }
    }

    /// Reference 8N1 decoder over the output trace.
    pub fn decode_tx(&self, bit: u64) -> Vec<u8> {
        let mut out = Vec::new();
        let mut prev = true;
        let mut resume = 0;
        for &(at, level) in &self.tx_trace {
            let falling = prev && !level;
            prev = level;
            if !falling || at < resume {
                continue;
            }
            let mut byte = 0u8;
            for i in 0..8 {
                if self.tx_level_at(at + bit / 2 + (i + 1) * bit) {
                    byte |= 1 << i;
                }
            }
            out.push(byte);
            resume = at + 9 * bit + bit / 2;
        }
        out
    }

    fn scripts_pending(&self) -> bool {
        !self.rx_script.is_empty() || !self.aux_script.is_empty()
    }

    fn advance(&mut self) {
        self.now += 1;
        while let Some(&(at, level)) = self.rx_script.front() {
            if at > self.now {
                break;
            }
            self.rx_source = level;
            self.rx_script.pop_front();
        }
        while let Some(&(at, level)) = self.aux_script.front() {
            if at > self.now {
                break;
            }
            self.aux_source = level;
            self.aux_script.pop_front();
        }

        let rx = if self.loopback { self.tx_level } else { self.rx_source };
        self.latch(LineMask::RX, self.rx_level, rx);
        self.rx_level = rx;

        let aux = self.aux_source;
        self.latch(LineMask::AUX, self.aux_level, aux);
        self.aux_level = aux;
    }

    fn latch(&mut self, line: LineMask, was: bool, is: bool) {
        let fell = was && !is && self.falling.contains(line);
        let rose = !was && is && self.rising.contains(line);
        if fell || rose {
            self.pending |= line;
        }
    }
}

pub type Shared = Rc<RefCell<SimHw>>;

pub struct SimChannel {
    hw: Shared,
    index: usize,
}

impl CompareChannel for SimChannel {
    fn counter(&self) -> Ticks {
        self.hw.borrow().counter()
    }
    fn set_compare(&mut self, at: Ticks) {
        self.hw.borrow_mut().channels[self.index].compare = at;
    }
    fn enable_event(&mut self) {
        self.hw.borrow_mut().channels[self.index].enabled = true;
    }
    fn disable_event(&mut self) {
        self.hw.borrow_mut().channels[self.index].enabled = false;
    }
}

pub struct SimTxPin(Shared);

impl ErrorType for SimTxPin {
    type Error = Infallible;
}

impl OutputPin for SimTxPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true);
        Ok(())
    }
}

impl SimTxPin {
    fn drive(&mut self, level: bool) {
        let mut hw = self.0.borrow_mut();
        let now = hw.now;
        hw.tx_level = level;
        hw.tx_trace.push((now, level));
    }
}

pub struct SimRxPin(Shared);

impl ErrorType for SimRxPin {
    type Error = Infallible;
}

impl InputPin for SimRxPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.borrow().rx_level)
    }
    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.borrow().rx_level)
    }
}

pub struct SimPort(Shared);

impl EdgeInterrupts for SimPort {
    fn configure_edge_interrupt(&mut self, edge: Edge, lines: LineMask) {
        let mut hw = self.0.borrow_mut();
        match edge {
            Edge::Falling => {
                hw.falling |= lines;
                hw.rising = hw.rising.without(lines);
            }
            Edge::Rising => {
                hw.rising |= lines;
                hw.falling = hw.falling.without(lines);
            }
        }
    }
    fn enable_lines(&mut self, lines: LineMask) {
        self.0.borrow_mut().enabled |= lines;
    }
    fn disable_lines(&mut self, lines: LineMask) {
        let mut hw = self.0.borrow_mut();
        hw.enabled = hw.enabled.without(lines);
    }
    fn pending(&self) -> LineMask {
        self.0.borrow().pending
    }
    fn clear_interrupt_flags(&mut self) {
        self.0.borrow_mut().pending = LineMask::NONE;
    }
}

/// Indicator output that counts toggles.
#[derive(Debug, Default)]
pub struct SimLed {
    pub level: bool,
    pub toggles: usize,
}

impl ErrorType for SimLed {
    type Error = Infallible;
}

impl OutputPin for SimLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level = false;
        Ok(())
    }
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level = true;
        Ok(())
    }
}

impl StatefulOutputPin for SimLed {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level)
    }
    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level)
    }
    fn toggle(&mut self) -> Result<(), Self::Error> {
        self.level = !self.level;
        self.toggles += 1;
        Ok(())
    }
}

pub type SimTransceiver<'m, C> = Transceiver<'m, C, SimTxPin, SimRxPin, SimPort>;
pub type SimDual = DualChannelClock<SimChannel, SimChannel>;
pub type SimArbitrated = ArbitratedClock<SimChannel>;

/// Bit clock flavours the simulator knows how to wire and service.
pub trait SimClock: BitClock + Sized {
    fn build(hw: &Shared) -> Self;
    fn service(xcvr: &mut SimTransceiver<'_, Self>, due: [bool; 2]);
}

impl SimClock for SimDual {
    fn build(hw: &Shared) -> Self {
        DualChannelClock::new(
            SimChannel { hw: hw.clone(), index: 0 },
            SimChannel { hw: hw.clone(), index: 1 },
        )
    }
    fn service(xcvr: &mut SimTransceiver<'_, Self>, due: [bool; 2]) {
        if due[0] {
            xcvr.on_transmit_event().unwrap();
        }
        if due[1] {
            xcvr.on_receive_event().unwrap();
        }
    }
}

impl SimClock for SimArbitrated {
    fn build(hw: &Shared) -> Self {
        ArbitratedClock::new(SimChannel { hw: hw.clone(), index: 0 })
    }
    fn service(xcvr: &mut SimTransceiver<'_, Self>, due: [bool; 2]) {
        if due[0] {
            xcvr.on_timer_event().unwrap();
        }
    }
}

/// A started transceiver on simulated hardware.
pub struct Rig<'m, C: SimClock> {
    pub hw: Shared,
    pub xcvr: SimTransceiver<'m, C>,
    pub mailbox: &'m Mailbox,
    bit: u64,
}

impl<'m, C: SimClock> Rig<'m, C> {
    pub fn new(mailbox: &'m Mailbox, timing: BitTiming, loopback: bool) -> Self {
        let hw: Shared = Rc::new(RefCell::new(SimHw::new(loopback)));
        let clock = C::build(&hw);
        let mut xcvr = Transceiver::new(
            clock,
            SimTxPin(hw.clone()),
            SimRxPin(hw.clone()),
            SimPort(hw.clone()),
            timing,
            mailbox,
        );
        xcvr.start().unwrap();
        Rig {
            hw,
            xcvr,
            mailbox,
            bit: timing.bit() as u64,
        }
    }

    pub fn now(&self) -> u64 {
        self.hw.borrow().now
    }

    pub fn tick(&mut self) {
        let (port_irq, due) = {
            let mut hw = self.hw.borrow_mut();
            hw.advance();
            let counter = hw.counter();
            let due = hw.channels.map(|ch| ch.enabled && ch.compare == counter);
            (hw.pending.intersects(hw.enabled), due)
        };
        if port_irq {
            self.xcvr.on_port_interrupt();
        }
        C::service(&mut self.xcvr, due);
    }

    pub fn run_for(&mut self, ticks: u64) {
        let until = self.now() + ticks;
        self.run_until(until);
    }

    pub fn run_until(&mut self, t: u64) {
        while self.now() < t {
            self.tick();
        }
    }

    /// Ticks until both engines are idle and every script has played out.
    pub fn run_until_idle(&mut self) {
        let guard = self.now() + IDLE_GUARD;
        while self.xcvr.is_transmitting()
            || self.xcvr.is_receiving()
            || self.hw.borrow().scripts_pending()
        {
            assert!(self.now() < guard, "simulation never went idle");
            self.tick();
        }
    }

    /// Jumps the clock forward without simulating. Only valid while idle.
    pub fn skip(&mut self, ticks: u64) {
        assert!(!self.xcvr.is_transmitting() && !self.xcvr.is_receiving());
        assert!(!self.hw.borrow().scripts_pending());
        self.hw.borrow_mut().now += ticks;
    }

    pub fn try_send(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        match self.xcvr.try_send(byte) {
            Err(nb::Error::WouldBlock) => {
                self.tick();
                Err(nb::Error::WouldBlock)
            }
            other => other,
        }
    }

    /// Schedules the receive line to `level` at tick `at`. Calls must be in time order.
    pub fn script_rx(&mut self, at: u64, level: bool) {
        self.hw
            .borrow_mut()
            .rx_script
            .push_back((at, level))
            .expect("rx script full");
    }

    pub fn script_aux(&mut self, at: u64, level: bool) {
        self.hw
            .borrow_mut()
            .aux_script
            .push_back((at, level))
            .expect("aux script full");
    }

    /// Schedules a full 8N1 frame of `byte` on the receive line starting at `at`.
    pub fn script_rx_byte(&mut self, at: u64, byte: u8) {
        let frame = Frame::new(byte);
        for cell in 0..FRAME_BITS {
            self.script_rx(at + cell as u64 * self.bit, frame.cell(cell).is_mark());
        }
    }
}

impl<'m, C: SimClock> TxPort for Rig<'m, C> {
    type Error = Infallible;

    fn try_send(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        Rig::try_send(self, byte)
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        if self.xcvr.is_transmitting() {
            self.tick();
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }
}

impl<'m, C: SimClock> LowPower for Rig<'m, C> {
    fn wait_for_interrupt(&mut self) {
        let quiet = !self.xcvr.is_transmitting()
            && !self.xcvr.is_receiving()
            && !self.hw.borrow().scripts_pending()
            && !self.mailbox.wake_pending();
        assert!(!quiet, "halted with nothing left to wake the dispatcher");
        self.tick();
    }
}
