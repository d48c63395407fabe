//! Reset and interrupt lines on the GPIO character device
//!
//! The W5500's RESETn and INTn pins are both active low. The reset line is
//! requested as an output whose logical "active" value drives the pin low
//! when `active_low` is set; the interrupt line is an input with falling
//! edge detection.

use std::time::Duration;

use crate::error::{LinuxGpioError, Result};

use gpiocdev::line::{EdgeDetection, Offset, Value};
use gpiocdev::request::{Config, Request};

use w5500eth_core::error::LineFault;
use w5500eth_core::gpio::{InterruptSource, ResetLine};

/// Consumer label shown by `gpioinfo`
const CONSUMER: &str = "w5500eth";

/// A GPIO line on a chip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSpec {
    /// Chip device path (e.g., "/dev/gpiochip0")
    pub chip: String,
    /// Line offset on the chip
    pub offset: Offset,
}

impl LineSpec {
    /// Create a line spec
    pub fn new(chip: impl Into<String>, offset: Offset) -> Self {
        Self {
            chip: chip.into(),
            offset,
        }
    }
}

impl std::fmt::Display for LineSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.chip, self.offset)
    }
}

/// Parse a line spec of the form `gpiochipN:OFFSET` or `/dev/gpiochipN:OFFSET`
pub fn parse_line_spec(spec: &str) -> Result<LineSpec> {
    let (chip, offset) = spec
        .rsplit_once(':')
        .ok_or_else(|| LinuxGpioError::InvalidLineSpec(spec.to_string()))?;
    let chip = chip.trim();
    if chip.is_empty() {
        return Err(LinuxGpioError::InvalidLineSpec(spec.to_string()));
    }
    let offset: Offset = offset
        .trim()
        .parse()
        .map_err(|_| LinuxGpioError::InvalidLineNumber {
            spec: spec.to_string(),
            value: offset.to_string(),
        })?;
    let chip = if chip.contains('/') {
        chip.to_string()
    } else {
        format!("/dev/{}", chip)
    };
    Ok(LineSpec::new(chip, offset))
}

/// Configuration for the reset output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetLineConfig {
    /// The line to drive
    pub line: LineSpec,
    /// Line is electrically active low (true for a direct RESETn connection)
    pub active_low: bool,
}

impl ResetLineConfig {
    /// Create a configuration for a line wired straight to RESETn
    pub fn new(line: LineSpec) -> Self {
        Self {
            line,
            active_low: true,
        }
    }

    /// Set the electrical polarity
    pub fn with_active_low(mut self, active_low: bool) -> Self {
        self.active_low = active_low;
        self
    }
}

/// RESETn output
pub struct LinuxResetLine {
    request: Request,
    offset: Offset,
}

impl LinuxResetLine {
    /// Request the reset line, leaving the chip out of reset
    pub fn open(config: &ResetLineConfig) -> Result<Self> {
        let mut req_config = Config::default();
        req_config
            .with_line(config.line.offset)
            .as_output(Value::Inactive);
        if config.active_low {
            req_config.as_active_low();
        }

        let request = Request::from_config(req_config)
            .on_chip(&config.line.chip)
            .with_consumer(CONSUMER)
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed {
                chip: config.line.chip.clone(),
                offset: config.line.offset,
                source,
            })?;

        log::info!(
            "linux_gpio: Reset line {} (active_low={})",
            config.line,
            config.active_low
        );

        Ok(Self {
            request,
            offset: config.line.offset,
        })
    }
}

impl ResetLine for LinuxResetLine {
    fn set(&mut self, active: bool) -> std::result::Result<(), LineFault> {
        let value = if active {
            Value::Active
        } else {
            Value::Inactive
        };
        self.request.set_value(self.offset, value).map_err(|e| {
            log::error!("linux_gpio: Failed to drive reset line: {}", e);
            LineFault::SetFailed
        })?;
        Ok(())
    }
}

/// INTn input with falling edge detection
pub struct LinuxIrqLine {
    request: Request,
}

impl LinuxIrqLine {
    /// Request the interrupt line
    pub fn open(line: &LineSpec) -> Result<Self> {
        let mut req_config = Config::default();
        req_config
            .with_line(line.offset)
            .as_input()
            .with_edge_detection(EdgeDetection::FallingEdge);

        let request = Request::from_config(req_config)
            .on_chip(&line.chip)
            .with_consumer(CONSUMER)
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed {
                chip: line.chip.clone(),
                offset: line.offset,
                source,
            })?;

        log::info!("linux_gpio: Interrupt line {} (falling edge)", line);

        Ok(Self { request })
    }
}

impl InterruptSource for LinuxIrqLine {
    fn wait_edge(&mut self, timeout: Duration) -> std::result::Result<bool, LineFault> {
        let ready = self.request.wait_edge_event(timeout).map_err(|e| {
            log::error!("linux_gpio: Waiting for edge failed: {}", e);
            LineFault::EventFailed
        })?;
        if !ready {
            return Ok(false);
        }
        let event = self.request.read_edge_event().map_err(|e| {
            log::error!("linux_gpio: Reading edge event failed: {}", e);
            LineFault::EventFailed
        })?;
        log::trace!("linux_gpio: Edge {:?} at {} ns", event.kind, event.timestamp_ns);
        Ok(true)
    }
}
