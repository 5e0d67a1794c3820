// src/bootstrap.rs

//! Clock bring-up ahead of the transceiver.
//!
//! The bit period is only as accurate as the oscillator behind the timer, so
//! nothing is armed until the factory trim has been applied and the clock has
//! settled. Without a trim the board signals the fault on an indicator and
//! stops there.

use crate::common::{
    error::UartError,
    hal_traits::{ClockCalibration, EdgeInterrupts, Trim},
    timing::{FAULT_BLINK_STEP, FAULT_BLINK_TOGGLES, FAULT_DARK_STEPS, SETTLE_DELAY},
};
use crate::engine::{BitClock, Transceiver};
use core::fmt::Debug;
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin, StatefulOutputPin},
};

/// Reads the factory trim, failing with [`UartError::CalibrationMissing`]
/// when it is absent or erased.
pub fn check_calibration<C, E>(calibration: &C) -> Result<Trim, UartError<E>>
where
    C: ClockCalibration,
    E: Debug,
{
    calibration
        .calibrated_trim()
        .ok_or(UartError::CalibrationMissing)
}

/// Checks and applies the factory trim.
pub fn init_clock<C, E>(calibration: &mut C) -> Result<Trim, UartError<E>>
where
    C: ClockCalibration,
    E: Debug,
{
    let trim = check_calibration::<_, E>(calibration)?;
    calibration.apply_trim(trim);
    Ok(trim)
}

/// One cycle of the fault signal: three flashes, then a dark pause.
/// Leaves the indicator in the state it started in.
pub fn fault_pattern<L, D>(led: &mut L, delay: &mut D) -> Result<(), L::Error>
where
    L: StatefulOutputPin,
    D: DelayNs,
{
    let step = FAULT_BLINK_STEP.as_micros() as u32;
    for _ in 0..FAULT_BLINK_TOGGLES {
        led.toggle()?;
        delay.delay_us(step);
    }
    for _ in 0..FAULT_DARK_STEPS {
        delay.delay_us(step);
    }
    Ok(())
}

/// Repeats the fault signal forever. Pin errors are ignored; there is nobody
/// left to report them to.
pub fn fault_trap<L, D>(led: &mut L, delay: &mut D) -> !
where
    L: StatefulOutputPin,
    D: DelayNs,
{
    let _ = led.set_low();
    loop {
        let _ = fault_pattern(led, delay);
    }
}

/// Applies the trim, waits for the oscillator to settle, then starts the
/// transceiver. On error nothing has been armed.
pub fn bring_up<C, D, CL, TX, RX, P>(
    calibration: &mut C,
    delay: &mut D,
    transceiver: &mut Transceiver<'_, CL, TX, RX, P>,
) -> Result<Trim, UartError<TX::Error>>
where
    C: ClockCalibration,
    D: DelayNs,
    CL: BitClock,
    TX: OutputPin,
    RX: InputPin<Error = TX::Error>,
    P: EdgeInterrupts,
{
    let trim = init_clock::<_, TX::Error>(calibration)?;
    delay.delay_ms(SETTLE_DELAY.as_millis() as u32);
    transceiver.start()?;
    Ok(trim)
}

/// [`bring_up`], falling into [`fault_trap`] on `fault_led` if it fails.
pub fn bring_up_or_trap<C, D, L, CL, TX, RX, P>(
    calibration: &mut C,
    delay: &mut D,
    fault_led: &mut L,
    transceiver: &mut Transceiver<'_, CL, TX, RX, P>,
) -> Trim
where
    C: ClockCalibration,
    D: DelayNs,
    L: StatefulOutputPin,
    CL: BitClock,
    TX: OutputPin,
    RX: InputPin<Error = TX::Error>,
    P: EdgeInterrupts,
{
    match bring_up(calibration, delay, transceiver) {
        Ok(trim) => {
            #[cfg(feature = "defmt")]
            defmt::info!("clock trimmed to {}, transceiver armed", trim);
            trim
        }
        Err(_e) => {
            #[cfg(feature = "defmt")]
            defmt::error!("bring-up failed: {}", defmt::Debug2Format(&_e));
            fault_trap(fault_led, delay)
        }
    }
}
