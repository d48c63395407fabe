//! Error types for Linux GPIO line operations

use thiserror::Error;

/// Linux GPIO specific errors
#[derive(Debug, Error)]
pub enum LinuxGpioError {
    /// Failed to request the GPIO line
    #[error("Failed to request GPIO line {offset} on {chip}: {source}")]
    LineRequestFailed {
        chip: String,
        offset: u32,
        #[source]
        source: gpiocdev::Error,
    },

    /// Line spec not of the form chip:offset
    #[error("Invalid GPIO line spec '{0}'. Use gpiochipN:OFFSET")]
    InvalidLineSpec(String),

    /// Invalid GPIO line number
    #[error("Invalid GPIO line number in '{spec}': {value}")]
    InvalidLineNumber { spec: String, value: String },
}

/// Result type for Linux GPIO line operations
pub type Result<T> = std::result::Result<T, LinuxGpioError>;
