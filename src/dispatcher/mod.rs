// src/dispatcher/mod.rs

//! Foreground command loop.
//!
//! Reads the shared command register, acts on it, answers with a fixed line
//! through the software transmitter and sleeps whenever the register holds
//! the idle sentinel.

use crate::common::{
    command::{response_line, Command},
    error::DispatchError,
    hal_traits::{LowPower, TxPort},
    mailbox::Mailbox,
};
use embedded_hal::digital::StatefulOutputPin;

/// Command dispatcher driving the two indicator outputs.
#[derive(Debug)]
pub struct Dispatcher<'m, R, G>
where
    R: StatefulOutputPin,
    G: StatefulOutputPin<Error = R::Error>,
{
    mailbox: &'m Mailbox,
    red: R,
    green: G,
}

impl<'m, R, G> Dispatcher<'m, R, G>
where
    R: StatefulOutputPin,
    G: StatefulOutputPin<Error = R::Error>,
{
    pub fn new(mailbox: &'m Mailbox, red: R, green: G) -> Self {
        Dispatcher {
            mailbox,
            red,
            green,
        }
    }

    /// One dispatch: consume the wake, read the register once, act, answer.
    ///
    /// The register goes back to [`Command::IDLE`] before the answer is sent,
    /// so a command arriving while the answer is on the wire is kept.
    pub fn dispatch<H: TxPort>(
        &mut self,
        io: &mut H,
    ) -> Result<Command, DispatchError<H::Error, R::Error>> {
        self.mailbox.take_wake();
        let command = Command::from_byte(self.mailbox.peek());

        match command {
            Command::ToggleRed => self.red.toggle().map_err(DispatchError::Output)?,
            Command::ToggleGreen => self.green.toggle().map_err(DispatchError::Output)?,
            _ => {}
        }

        if !command.stays_awake() {
            self.mailbox.reset(Command::IDLE);
        }

        self.send_line(io, command)?;
        Ok(command)
    }

    /// `dispatch`, then wait in low power if the command was the idle sentinel.
    pub fn run_once<H: TxPort + LowPower>(
        &mut self,
        io: &mut H,
    ) -> Result<Command, DispatchError<H::Error, R::Error>> {
        let command = self.dispatch(io)?;
        if command == Command::Sleep {
            // Let the announcement finish before the core stops
            nb::block!(io.flush()).map_err(DispatchError::Transmit)?;
            while !self.mailbox.take_wake() {
                io.wait_for_interrupt();
            }
        }
        Ok(command)
    }

    /// Runs forever. Failed passes are logged and the loop carries on.
    pub fn run<H: TxPort + LowPower>(&mut self, io: &mut H) -> ! {
        loop {
            match self.run_once(io) {
                Ok(_command) => {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("dispatched {}", _command);
                }
                Err(_e) => {
                    #[cfg(feature = "defmt")]
                    defmt::error!("dispatch failed: {}", defmt::Debug2Format(&_e));
                }
            }
        }
    }

    pub fn release(self) -> (R, G) {
        (self.red, self.green)
    }

    fn send_line<H: TxPort>(
        &mut self,
        io: &mut H,
        command: Command,
    ) -> Result<(), DispatchError<H::Error, R::Error>> {
        for byte in response_line(command) {
            nb::block!(io.try_send(byte)).map_err(DispatchError::Transmit)?;
        }
        Ok(())
    }
}
