//! w5500eth-linux-spi - Linux spidev bus backend
//!
//! This crate lets the W5500 driver talk to a chip wired to an SPI
//! controller exposed through `/dev/spidevX.Y`.
//!
//! # Example
//!
//! ```no_run
//! use w5500eth_linux_spi::{LinuxSpiBus, LinuxSpiConfig};
//! use w5500eth_core::regs::common;
//! use w5500eth_core::transport::RegisterTransport;
//!
//! let config = LinuxSpiConfig::new("/dev/spidev0.0")
//!     .with_speed(20_000_000)
//!     .with_mode(0);
//! let bus = LinuxSpiBus::open(&config)?;
//! let mut transport = RegisterTransport::new(bus);
//! println!("VERSIONR = 0x{:02X}", transport.read8(common::VERSIONR)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with the w5500eth CLI
//!
//! ```bash
//! # Probe the chip using default settings
//! w5500eth probe -b linux_spi:dev=/dev/spidev0.0
//!
//! # Specify SPI speed in kHz and SPI mode
//! w5500eth probe -b linux_spi:dev=/dev/spidev0.0,spispeed=10000,mode=3
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y` device

mod device;
mod error;

pub use device::{mode, parse_options, LinuxSpiBus, LinuxSpiConfig};
pub use error::{LinuxSpiError, Result};
