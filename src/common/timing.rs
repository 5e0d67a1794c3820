// src/common/timing.rs

use super::error::ConfigError;
use core::time::Duration;

/// Timer ticks. The bit clock counter is 16 bits wide and wraps.
pub type Ticks = u16;

// === Link defaults ===

/// Timer clock of the reference board: calibrated DCO at 7.3728 MHz.
pub const DEFAULT_CLOCK_HZ: u32 = 7_372_800;
/// Default line rate.
pub const DEFAULT_BAUD: u32 = 9_600;

/// Shortest bit period accepted, leaving room for the step ISR.
pub const MIN_BIT_TICKS: u32 = 16;
/// Longest bit period accepted: deadlines must stay within half the counter range.
pub const MAX_BIT_TICKS: u32 = (Ticks::MAX as u32) / 2;

// === Bring-up timing ===

/// Time allowed for the oscillator to settle before interrupts are enabled.
pub const SETTLE_DELAY: Duration = Duration::from_millis(200);
/// One step of the calibration fault blink (50 000 cycles at the default clock).
pub const FAULT_BLINK_STEP: Duration = Duration::from_micros(6_782);
/// Toggles per fault pattern: three flashes.
pub const FAULT_BLINK_TOGGLES: u8 = 6;
/// Dark steps closing each fault pattern.
pub const FAULT_DARK_STEPS: u8 = 3;

/// Link parameters as the firmware configures them.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    /// Frequency of the timer feeding the bit clock counter.
    pub clock_hz: u32,
    /// Line rate in bits per second.
    pub baud: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            clock_hz: DEFAULT_CLOCK_HZ,
            baud: DEFAULT_BAUD,
        }
    }
}

impl LinkConfig {
    pub const fn new(clock_hz: u32, baud: u32) -> Self {
        LinkConfig { clock_hz, baud }
    }

    /// Converts the line rate to a bit period in timer ticks, rounded to nearest.
    pub fn bit_timing(&self) -> Result<BitTiming, ConfigError> {
        if self.clock_hz == 0 {
            return Err(ConfigError::ZeroClock);
        }
        if self.baud == 0 {
            return Err(ConfigError::ZeroBaud);
        }
        let clock_hz = u64::from(self.clock_hz);
        let baud = u64::from(self.baud);
        let ticks = (clock_hz + baud / 2) / baud;
        BitTiming::from_ticks(u32::try_from(ticks).unwrap_or(u32::MAX))
    }
}

/// Bit period and the half-bit offset used to centre receive samples.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitTiming {
    bit: Ticks,
    half_bit: Ticks,
}

impl BitTiming {
    pub fn from_ticks(ticks: u32) -> Result<Self, ConfigError> {
        if ticks < MIN_BIT_TICKS {
            return Err(ConfigError::BitPeriodTooShort { ticks });
        }
        if ticks > MAX_BIT_TICKS {
            return Err(ConfigError::BitPeriodTooLong { ticks });
        }
        let bit = ticks as Ticks;
        Ok(BitTiming {
            bit,
            half_bit: bit / 2,
        })
    }

    #[inline]
    pub const fn bit(&self) -> Ticks {
        self.bit
    }

    #[inline]
    pub const fn half_bit(&self) -> Ticks {
        self.half_bit
    }
}

impl Default for BitTiming {
    /// 9600 baud off the 7.3728 MHz reference clock: 768 ticks per bit.
    fn default() -> Self {
        BitTiming {
            bit: 768,
            half_bit: 384,
        }
    }
}

impl TryFrom<LinkConfig> for BitTiming {
    type Error = ConfigError;

    fn try_from(config: LinkConfig) -> Result<Self, Self::Error> {
        config.bit_timing()
    }
}
