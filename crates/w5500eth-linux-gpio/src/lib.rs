//! w5500eth-linux-gpio - W5500 reset and interrupt pins on Linux
//!
//! Uses the GPIO character device (`/dev/gpiochipN`) through `gpiocdev`.
//!
//! # Example
//!
//! ```no_run
//! use w5500eth_linux_gpio::{parse_line_spec, LinuxIrqLine, LinuxResetLine, ResetLineConfig};
//!
//! let reset = LinuxResetLine::open(&ResetLineConfig::new(parse_line_spec("gpiochip0:25")?))?;
//! let irq = LinuxIrqLine::open(&parse_line_spec("gpiochip0:24")?)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod device;
mod error;

pub use device::{parse_line_spec, LineSpec, LinuxIrqLine, LinuxResetLine, ResetLineConfig};
pub use error::{LinuxGpioError, Result};
