//! Single-byte command set and the fixed responses that answer it.
//!
//! Every response is exactly [`RESPONSE_LEN`] printable characters followed
//! by `\r\n`.

use arrayvec::ArrayVec;

/// Characters in every response, terminator excluded.
pub const RESPONSE_LEN: usize = 16;
/// Response plus `\r\n`.
pub const RESPONSE_LINE_LEN: usize = RESPONSE_LEN + 2;

/// A response ready for byte-by-byte transmission.
pub type ResponseLine = ArrayVec<u8, RESPONSE_LINE_LEN>;

/// Commands understood by the dispatcher.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// `r`: toggle the red indicator.
    ToggleRed,
    /// `g`: toggle the green indicator.
    ToggleGreen,
    /// Posted by the auxiliary input edge, never by the line.
    ButtonPressed,
    /// `c`: answer, keep the command, answer again on the next pass.
    Repeat,
    /// `z`: the idle sentinel. Announce and halt until woken.
    Sleep,
    /// Anything else. Answered, never propagated as an error.
    Invalid(u8),
}

impl Command {
    /// Idle sentinel held by the command register between commands.
    pub const IDLE: u8 = b'z';
    /// Sentinel posted by the auxiliary input.
    pub const EXTERNAL_EVENT: u8 = 0xAF;

    /// Maps a raw register value through the command table.
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            b'r' => Command::ToggleRed,
            b'g' => Command::ToggleGreen,
            Self::EXTERNAL_EVENT => Command::ButtonPressed,
            b'c' => Command::Repeat,
            Self::IDLE => Command::Sleep,
            other => Command::Invalid(other),
        }
    }

    /// Raw register value of this command.
    pub const fn as_byte(&self) -> u8 {
        match self {
            Command::ToggleRed => b'r',
            Command::ToggleGreen => b'g',
            Command::ButtonPressed => Self::EXTERNAL_EVENT,
            Command::Repeat => b'c',
            Command::Sleep => Self::IDLE,
            Command::Invalid(byte) => *byte,
        }
    }

    /// The fixed response text, without terminator.
    pub const fn response(&self) -> &'static [u8; RESPONSE_LEN] {
        match self {
            Command::ToggleRed => b"Toggled Red LED.",
            Command::ToggleGreen => b"Toggled Grn LED.",
            Command::ButtonPressed => b"Button Pressed!!",
            Command::Repeat => b"Repeated Message",
            Command::Sleep => b"Going to Sleep..",
            Command::Invalid(_) => b"Invalid Command!",
        }
    }

    /// True if the register keeps this command after dispatch instead of
    /// returning to idle.
    pub const fn stays_awake(&self) -> bool {
        matches!(self, Command::Repeat)
    }
}

impl From<u8> for Command {
    fn from(byte: u8) -> Self {
        Command::from_byte(byte)
    }
}

/// Builds the complete response line for `command`.
pub fn response_line(command: Command) -> ResponseLine {
    let mut line = ResponseLine::new();
    // Capacity is exactly RESPONSE_LEN + 2, so neither extend can overflow.
    line.extend(command.response().iter().copied());
    line.extend([b'\r', b'\n']);
    line
}
