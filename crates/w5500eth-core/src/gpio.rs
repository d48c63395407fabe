//! GPIO abstractions for the reset and interrupt pins
//!
//! Both pins are optional on real boards, so the driver holds them as
//! `Option<Box<dyn ...>>` and treats absence as a normal branch.

use core::time::Duration;

use crate::error::LineFault;

/// Digital output driving the chip's RESETn pin
///
/// `set(true)` means "reset active". The implementation is responsible for
/// the electrical polarity (RESETn is active-low on the W5500, which is
/// usually expressed in the line configuration).
pub trait ResetLine {
    /// Drive the line to its logical active (`true`) or inactive state
    fn set(&mut self, active: bool) -> Result<(), LineFault>;
}

/// Edge-triggered input wired to the chip's INTn pin
///
/// Enabling and disabling delivery is handled by the driver; the source only
/// reports edges.
pub trait InterruptSource {
    /// Block until an edge arrives or `timeout` expires
    ///
    /// Returns `Ok(true)` if an edge was consumed, `Ok(false)` on timeout.
    fn wait_edge(&mut self, timeout: Duration) -> Result<bool, LineFault>;
}

impl<T: ResetLine + ?Sized> ResetLine for &mut T {
    fn set(&mut self, active: bool) -> Result<(), LineFault> {
        (**self).set(active)
    }
}

#[cfg(feature = "alloc")]
impl<T: ResetLine + ?Sized> ResetLine for alloc::boxed::Box<T> {
    fn set(&mut self, active: bool) -> Result<(), LineFault> {
        (**self).set(active)
    }
}

#[cfg(feature = "alloc")]
impl<T: InterruptSource + ?Sized> InterruptSource for alloc::boxed::Box<T> {
    fn wait_edge(&mut self, timeout: Duration) -> Result<bool, LineFault> {
        (**self).wait_edge(timeout)
    }
}
