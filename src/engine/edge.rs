// src/engine/edge.rs

use crate::common::hal_traits::{Edge, EdgeInterrupts, LineMask};

/// What a port interrupt turned out to be.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeEvent {
    /// Falling edge on the receive line: a start bit began.
    FrameStart,
    /// Falling edge on the auxiliary input.
    External,
    /// Some other source. Acknowledged and dropped.
    Ignored,
}

/// Falling-edge detection on the receive and auxiliary lines.
#[derive(Debug)]
pub struct EdgeDetector<P> {
    port: P,
    /// Lines currently enabled. Flags latch on masked lines too.
    listening: LineMask,
}

impl<P: EdgeInterrupts> EdgeDetector<P> {
    pub fn new(port: P) -> Self {
        EdgeDetector {
            port,
            listening: LineMask::NONE,
        }
    }

    /// Startup: falling edges on both lines, stale flags cleared, interrupts on.
    pub fn arm(&mut self) {
        let lines = LineMask::RX | LineMask::AUX;
        self.port.configure_edge_interrupt(Edge::Falling, lines);
        self.port.clear_interrupt_flags();
        self.port.enable_lines(lines);
        self.listening = lines;
    }

    /// Classifies and acknowledges the pending port interrupt.
    ///
    /// A start edge also masks the receive line until [`rearm_receive`]
    /// so data edges inside the frame do not retrigger it. When both lines
    /// are pending the receive line wins.
    ///
    /// [`rearm_receive`]: Self::rearm_receive
    pub fn on_interrupt(&mut self) -> EdgeEvent {
        let pending = self.port.pending();
        self.port.clear_interrupt_flags();

        let listening = self.listening;
        let live = |line| pending.contains(line) && listening.contains(line);

        if live(LineMask::RX) {
            self.port.disable_lines(LineMask::RX);
            self.listening = self.listening.without(LineMask::RX);
            EdgeEvent::FrameStart
        } else if live(LineMask::AUX) {
            EdgeEvent::External
        } else {
            EdgeEvent::Ignored
        }
    }

    /// Frame done: drop edges latched mid-frame and listen for the next start bit.
    pub fn rearm_receive(&mut self) {
        self.port.clear_interrupt_flags();
        self.port.enable_lines(LineMask::RX);
        self.listening |= LineMask::RX;
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn release(self) -> P {
        self.port
    }
}
