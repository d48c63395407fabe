//! Error types for w5500eth-core
//!
//! This module provides no_std compatible error types. Lower layers only
//! report what went wrong; deciding whether an error is fatal is left to the
//! caller.

use core::fmt;

use crate::spi::RegisterAddress;

/// Bus-level failure reported by an [`SpiBus`](crate::bus::SpiBus)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusFault {
    /// The exchange did not complete in time
    Timeout,
    /// Nothing answered on the bus (device missing or not powered)
    NoResponse,
    /// The controller reported a transfer fault
    Fault,
}

/// Direction of a register transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Register or buffer read
    Read,
    /// Register or buffer write
    Write,
}

/// A failed register transaction
///
/// Carries the address and direction of the transaction that failed along
/// with the bus fault, so the caller can decide on a retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportError {
    /// Address of the failed transaction
    pub address: RegisterAddress,
    /// Whether the transaction was a read or a write
    pub direction: Direction,
    /// What the bus reported
    pub fault: BusFault,
}

impl TransportError {
    /// Create a new transport error
    pub const fn new(address: RegisterAddress, direction: Direction, fault: BusFault) -> Self {
        Self {
            address,
            direction,
            fault,
        }
    }
}

/// GPIO line failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFault {
    /// Driving an output line failed
    SetFailed,
    /// Waiting for or reading an edge event failed
    EventFailed,
}

/// Hardware reset failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetError {
    /// No reset line is wired up; bring-up continues without a reset
    Unavailable,
    /// The reset line could not be driven
    Line(LineFault),
}

impl fmt::Display for BusFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "bus timeout"),
            Self::NoResponse => write!(f, "no response on bus"),
            Self::Fault => write!(f, "bus transfer fault"),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {} failed: {}", self.direction, self.address, self.fault)
    }
}

impl fmt::Display for LineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetFailed => write!(f, "failed to drive GPIO line"),
            Self::EventFailed => write!(f, "failed to read GPIO edge event"),
        }
    }
}

impl fmt::Display for ResetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "no reset line available"),
            Self::Line(fault) => write!(f, "reset line: {}", fault),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TransportError {}

#[cfg(feature = "std")]
impl std::error::Error for ResetError {}

#[cfg(feature = "std")]
impl std::error::Error for LineFault {}
