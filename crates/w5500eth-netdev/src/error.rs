//! Error types for the network device

use thiserror::Error;
use w5500eth_core::error::{ResetError, TransportError};

use crate::state::LinkState;

/// Error raised by a network stack callback
pub type StackError = Box<dyn std::error::Error + Send + Sync>;

/// Network device errors
#[derive(Debug, Error)]
pub enum NetdevError {
    /// A register transaction failed
    #[error("register access failed: {0}")]
    Transport(#[from] TransportError),

    /// Driving the reset line failed
    #[error("hardware reset failed: {0}")]
    Reset(#[source] ResetError),

    /// Socket 0 did not reach MACRAW status after OPEN
    #[error("socket 0 did not open in MACRAW mode (status 0x{status:02X})")]
    SocketOpenFailed { status: u8 },

    /// The chip did not accept a socket command
    #[error("socket command 0x{command:02X} was not accepted")]
    CommandTimeout { command: u8 },

    /// Not enough room in the TX buffer for the frame
    #[error("TX buffer has {free} bytes free, frame needs {needed}")]
    TxBufferFull { free: u16, needed: usize },

    /// A resource needed to run the interface could not be set up
    #[error("failed to set up {what}: {source}")]
    AllocationFailure {
        what: &'static str,
        #[source]
        source: StackError,
    },

    /// Bring-up has already run on this device
    #[error("bring-up already ran (device is {0})")]
    AlreadyStarted(LinkState),

    /// The operation needs a Ready device
    #[error("device is {0}, not Ready")]
    NotReady(LinkState),

    /// The device has been torn down
    #[error("device has been torn down")]
    TornDown,
}

/// Result type for network device operations
pub type Result<T> = std::result::Result<T, NetdevError>;

/// VERSIONR did not read the expected value
///
/// Not fatal: the device still comes up, and the mismatch is kept for
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("VERSIONR = 0x{found:02X} (unexpected, expected 0x{expected:02X})")]
pub struct IdentityMismatch {
    /// Value read from VERSIONR
    pub found: u8,
    /// Value a W5500 reports
    pub expected: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_mismatch_display() {
        let mismatch = IdentityMismatch {
            found: 0x05,
            expected: 0x04,
        };
        assert_eq!(
            mismatch.to_string(),
            "VERSIONR = 0x05 (unexpected, expected 0x04)"
        );
    }

    #[test]
    fn test_netdev_error_wraps_transport() {
        use w5500eth_core::error::{BusFault, Direction};
        use w5500eth_core::regs::common;

        let err: NetdevError =
            TransportError::new(common::VERSIONR, Direction::Read, BusFault::NoResponse).into();
        assert_eq!(
            err.to_string(),
            "register access failed: read at common:0x0039 failed: no response on bus"
        );
    }
}
