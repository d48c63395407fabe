//! Hardware reset sequencing
//!
//! RESETn must be held low for at least 500 us and the PLL needs up to
//! 1 ms to lock afterwards. The delays below are generous on purpose so the
//! sequence also covers slow board-level reset supervisors.

use crate::error::ResetError;
use crate::gpio::ResetLine;

/// Time the reset line is held active, in milliseconds
pub const RESET_ASSERT_MS: u32 = 10;

/// Time allowed for the chip to come out of reset, in milliseconds
pub const RESET_SETTLE_MS: u32 = 100;

/// Blocking delay provider
pub trait Delay {
    /// Block for at least `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);
}

impl<T: Delay + ?Sized> Delay for &mut T {
    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

#[cfg(feature = "alloc")]
impl<T: Delay + ?Sized> Delay for alloc::boxed::Box<T> {
    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

/// [`Delay`] backed by `std::thread::sleep`
///
/// `thread::sleep` never returns early, so the minimum durations hold.
#[cfg(feature = "std")]
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

#[cfg(feature = "std")]
impl Delay for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

/// Pulse the reset line: assert, wait, deassert, wait
///
/// Returns [`ResetError::Unavailable`] without touching anything when there
/// is no line; callers treat that as a degraded but valid bring-up.
pub fn hardware_reset<L, D>(line: Option<&mut L>, delay: &mut D) -> Result<(), ResetError>
where
    L: ResetLine + ?Sized,
    D: Delay + ?Sized,
{
    let Some(line) = line else {
        return Err(ResetError::Unavailable);
    };

    log::debug!("w5500: asserting reset for {} ms", RESET_ASSERT_MS);
    line.set(true).map_err(ResetError::Line)?;
    delay.delay_ms(RESET_ASSERT_MS);

    line.set(false).map_err(ResetError::Line)?;
    log::debug!("w5500: reset released, settling for {} ms", RESET_SETTLE_MS);
    delay.delay_ms(RESET_SETTLE_MS);

    Ok(())
}
