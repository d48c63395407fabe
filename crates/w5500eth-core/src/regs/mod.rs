//! W5500 register map
//!
//! Offsets and bit definitions from the W5500 datasheet (v1.0.x), section 3.
//! Only the registers the driver touches carry typed bit definitions.

pub mod common;
pub mod socket;
