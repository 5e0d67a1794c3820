// src/engine/mod.rs

//! Interrupt-driven bit engines and the transceiver that binds them to hardware.
//!
//! The firmware forwards its interrupt vectors to the `on_*` methods of
//! [`Transceiver`] and keeps the transceiver in whatever interrupt-safe cell
//! its HAL provides. Completed bytes and auxiliary events reach the
//! foreground through the shared [`Mailbox`].

pub mod bit_clock;
pub mod edge;
pub mod receive;
pub mod transmit;

pub use bit_clock::{ArbitratedClock, BitClock, Direction, DualChannelClock, Expired};
pub use edge::{EdgeDetector, EdgeEvent};
pub use receive::{ReceiveEngine, RxState};
pub use transmit::{TransmitEngine, TxState};

use crate::common::{
    command::Command,
    error::UartError,
    hal_traits::{CompareChannel, EdgeInterrupts, TxPort},
    mailbox::Mailbox,
    timing::BitTiming,
};
use core::convert::Infallible;
use embedded_hal::digital::{InputPin, OutputPin};

/// Full-duplex software UART on one timer and a GPIO port.
pub struct Transceiver<'m, C, TX, RX, P>
where
    C: BitClock,
    TX: OutputPin,
    RX: InputPin<Error = TX::Error>,
    P: EdgeInterrupts,
{
    clock: C,
    tx_line: TX,
    rx_line: RX,
    edges: EdgeDetector<P>,
    transmit: TransmitEngine,
    receive: ReceiveEngine,
    timing: BitTiming,
    mailbox: &'m Mailbox,
}

impl<'m, C, TX, RX, P> Transceiver<'m, C, TX, RX, P>
where
    C: BitClock,
    TX: OutputPin,
    RX: InputPin<Error = TX::Error>,
    P: EdgeInterrupts,
{
    pub fn new(
        clock: C,
        tx_line: TX,
        rx_line: RX,
        port: P,
        timing: BitTiming,
        mailbox: &'m Mailbox,
    ) -> Self {
        Transceiver {
            clock,
            tx_line,
            rx_line,
            edges: EdgeDetector::new(port),
            transmit: TransmitEngine::new(),
            receive: ReceiveEngine::new(),
            timing,
            mailbox,
        }
    }

    /// Drives the output to mark and arms edge detection. Call once,
    /// before interrupts are enabled.
    pub fn start(&mut self) -> Result<(), UartError<TX::Error>> {
        self.tx_line.set_high().map_err(UartError::Pin)?;
        self.edges.arm();
        Ok(())
    }

    /// Foreground: queue one byte, `WouldBlock` while a frame is in flight.
    pub fn try_send(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        self.transmit.try_send(byte, &mut self.clock, &self.timing)
    }

    pub fn is_transmitting(&self) -> bool {
        self.transmit.is_busy()
    }

    pub fn is_receiving(&self) -> bool {
        self.receive.is_active()
    }

    pub fn tx_state(&self) -> TxState {
        self.transmit.state()
    }

    /// Transmit bit clock interrupt.
    pub fn on_transmit_event(&mut self) -> Result<(), UartError<TX::Error>> {
        self.transmit
            .on_bit_boundary(&mut self.clock, &self.timing, &mut self.tx_line)
            .map_err(UartError::Pin)
    }

    /// Receive bit clock interrupt. Posts the byte and re-arms start edge
    /// detection once a frame completes.
    pub fn on_receive_event(&mut self) -> Result<(), UartError<TX::Error>> {
        let received = self
            .receive
            .on_bit_boundary(&mut self.clock, &self.timing, &mut self.rx_line)
            .map_err(UartError::Pin)?;
        if let Some(byte) = received {
            self.mailbox.post(byte);
            self.edges.rearm_receive();
        }
        Ok(())
    }

    /// GPIO port interrupt.
    pub fn on_port_interrupt(&mut self) -> EdgeEvent {
        let event = self.edges.on_interrupt();
        match event {
            EdgeEvent::FrameStart => self.receive.begin(&mut self.clock, &self.timing),
            EdgeEvent::External => self.mailbox.post(Command::EXTERNAL_EVENT),
            EdgeEvent::Ignored => {}
        }
        event
    }

    pub fn release(self) -> (C, TX, RX, P) {
        (self.clock, self.tx_line, self.rx_line, self.edges.release())
    }
}

impl<'m, CH, TX, RX, P> Transceiver<'m, ArbitratedClock<CH>, TX, RX, P>
where
    CH: CompareChannel,
    TX: OutputPin,
    RX: InputPin<Error = TX::Error>,
    P: EdgeInterrupts,
{
    /// Shared compare interrupt when both directions run on one channel.
    /// Transmit steps first when both directions are due. Keeps stepping while
    /// deadlines re-armed during the step are already behind the counter.
    pub fn on_timer_event(&mut self) -> Result<(), UartError<TX::Error>> {
        loop {
            let expired = self.clock.take_expired();
            if expired.is_empty() {
                return Ok(());
            }
            if expired.transmit {
                self.on_transmit_event()?;
            }
            if expired.receive {
                self.on_receive_event()?;
            }
        }
    }
}

impl<'m, C, TX, RX, P> TxPort for Transceiver<'m, C, TX, RX, P>
where
    C: BitClock,
    TX: OutputPin,
    RX: InputPin<Error = TX::Error>,
    P: EdgeInterrupts,
{
    type Error = Infallible;

    fn try_send(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        Transceiver::try_send(self, byte)
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        if self.transmit.is_busy() {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }
}
