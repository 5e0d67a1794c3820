// src/common/error.rs

/// Errors raised by the transceiver and its bring-up.
///
/// Framing problems never show up here: a misaligned or glitched frame
/// produces a wrong byte, never an error.
#[derive(Debug, thiserror::Error)]
pub enum UartError<E = ()>
where
    E: core::fmt::Debug, // Still need Debug for the generic pin error
{
    /// Underlying GPIO error from the HAL pin implementation.
    #[error("pin I/O error: {0:?}")]
    Pin(E),

    /// Link parameters cannot be expressed as a timer bit period.
    #[error("invalid link configuration: {0}")]
    Config(ConfigError),

    /// The factory oscillator trim is missing or erased.
    #[error("clock calibration data missing")]
    CalibrationMissing,
}

impl<E: core::fmt::Debug> From<ConfigError> for UartError<E> {
    fn from(e: ConfigError) -> Self {
        UartError::Config(e)
    }
}

/// Rejected link configurations.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    #[error("timer clock frequency is zero")]
    ZeroClock,

    #[error("baud rate is zero")]
    ZeroBaud,

    /// Too few ticks per bit to service the interrupt between boundaries.
    #[error("bit period of {ticks} ticks is too short")]
    BitPeriodTooShort { ticks: u32 },

    /// Bit period would not fit in half the counter range, so wrapping
    /// deadline arithmetic would become ambiguous.
    #[error("bit period of {ticks} ticks is too long")]
    BitPeriodTooLong { ticks: u32 },
}

/// Errors from one pass of the command dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError<T, O>
where
    T: core::fmt::Debug,
    O: core::fmt::Debug,
{
    /// The transmit port refused a byte.
    #[error("transmit failed: {0:?}")]
    Transmit(T),

    /// An indicator output could not be driven.
    #[error("output pin failed: {0:?}")]
    Output(O),
}
