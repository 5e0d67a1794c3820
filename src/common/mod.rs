// src/common/mod.rs

// --- Declare all public modules within common ---
pub mod command;
pub mod error;
pub mod frame;
pub mod hal_traits;
pub mod mailbox;
pub mod timing;

#[cfg(test)]
pub(crate) mod test_support;

// --- Re-export key types/traits/functions for easier access ---

// From command.rs
pub use command::{response_line, Command, ResponseLine, RESPONSE_LEN};

// From error.rs
pub use error::{ConfigError, DispatchError, UartError};

// From frame.rs
pub use frame::{Frame, Level};

// From hal_traits.rs
pub use hal_traits::{
    ClockCalibration, CompareChannel, Edge, EdgeInterrupts, LineMask, LowPower, Trim, TxPort,
};

// From mailbox.rs
pub use mailbox::Mailbox;

// From timing.rs (constants stay under common::timing::*)
pub use timing::{BitTiming, LinkConfig, Ticks};
