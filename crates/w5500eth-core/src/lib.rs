//! w5500eth-core - Core library for driving a W5500 Ethernet controller
//!
//! This crate provides the pieces of the W5500 driver that talk to the chip
//! over SPI: the 3-byte frame header codec, the register transport built on
//! top of it, the register map, and the hardware reset sequence. It is
//! designed to be `no_std` compatible so the same protocol engine can run on
//! a microcontroller or behind a Linux spidev node.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable heap allocation for bulk reads returning `Vec<u8>`
//!
//! # Example
//!
//! ```ignore
//! use w5500eth_core::regs::common;
//! use w5500eth_core::transport::RegisterTransport;
//!
//! fn check_chip<B: w5500eth_core::bus::SpiBus>(bus: B) {
//!     let mut transport = RegisterTransport::new(bus);
//!     match transport.read8(common::VERSIONR) {
//!         Ok(v) => println!("VERSIONR = 0x{:02X}", v),
//!         Err(e) => println!("read failed: {}", e),
//!     }
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(feature = "alloc", test))]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod bus;
pub mod error;
pub mod gpio;
pub mod regs;
pub mod reset;
pub mod spi;
pub mod transport;

pub use error::{BusFault, Direction, LineFault, ResetError, TransportError};
