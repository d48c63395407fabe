//! Error types for Linux SPI operations

use thiserror::Error;
use w5500eth_core::error::BusFault;

/// Linux SPI specific errors
#[derive(Debug, Error)]
pub enum LinuxSpiError {
    /// Failed to open device
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set SPI mode
    #[error("Failed to set SPI mode to {mode}: {source}")]
    SetModeFailed {
        mode: u8,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set bits per word
    #[error("Failed to set bits per word to {bits}: {source}")]
    SetBitsPerWordFailed {
        bits: u8,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set clock speed
    #[error("Failed to set clock speed to {speed} Hz: {source}")]
    SetSpeedFailed {
        speed: u32,
        #[source]
        source: std::io::Error,
    },

    /// SPI_IOC_MESSAGE failed
    #[error("SPI transfer failed: {0}")]
    TransferFailed(#[source] std::io::Error),

    /// The exchange cannot be expressed as one spidev message
    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    /// Device not specified
    #[error("No device specified. Use dev=/dev/spidevX.Y")]
    NoDevice,
}

impl LinuxSpiError {
    /// Classify the error as a bus fault for the register transport
    pub fn fault(&self) -> BusFault {
        match self {
            Self::TransferFailed(e) => match e.raw_os_error() {
                Some(libc::ETIMEDOUT) => BusFault::Timeout,
                Some(libc::ENODEV) | Some(libc::ENXIO) | Some(libc::ESHUTDOWN) => {
                    BusFault::NoResponse
                }
                _ => BusFault::Fault,
            },
            _ => BusFault::Fault,
        }
    }
}

/// Result type for Linux SPI operations
pub type Result<T> = std::result::Result<T, LinuxSpiError>;
