//! Simulated RESETn and INTn pins and a recording delay

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use w5500eth_core::error::LineFault;
use w5500eth_core::gpio::{InterruptSource, ResetLine};
use w5500eth_core::reset::Delay;

use crate::SimW5500;

/// RESETn pin of a [`SimW5500`]
///
/// Asserting the line returns the chip's registers to power-on values.
pub struct SimResetLine {
    chip: SimW5500,
}

impl SimResetLine {
    pub(crate) fn new(chip: SimW5500) -> Self {
        Self { chip }
    }
}

impl ResetLine for SimResetLine {
    fn set(&mut self, active: bool) -> Result<(), LineFault> {
        if self.chip.drive_reset(active) {
            Ok(())
        } else {
            Err(LineFault::SetFailed)
        }
    }
}

/// INTn pin of a [`SimW5500`]
///
/// Reports one edge each time the chip asserts its interrupt output.
pub struct SimInterrupt {
    edges: flume::Receiver<()>,
}

impl SimInterrupt {
    pub(crate) fn new(edges: flume::Receiver<()>) -> Self {
        Self { edges }
    }
}

impl InterruptSource for SimInterrupt {
    fn wait_edge(&mut self, timeout: Duration) -> Result<bool, LineFault> {
        match self.edges.recv_timeout(timeout) {
            Ok(()) => Ok(true),
            Err(flume::RecvTimeoutError::Timeout) => Ok(false),
            Err(flume::RecvTimeoutError::Disconnected) => Err(LineFault::EventFailed),
        }
    }
}

/// Delay that records requested durations instead of sleeping
#[derive(Clone, Default)]
pub struct SimDelay {
    recorded: Arc<Mutex<Vec<u32>>>,
}

impl SimDelay {
    /// Create a new recording delay
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in milliseconds
    pub fn recorded(&self) -> Vec<u32> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Delay for SimDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ms);
    }
}
