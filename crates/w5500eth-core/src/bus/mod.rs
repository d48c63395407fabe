//! Bus abstractions
//!
//! The driver consumes a single primitive from its SPI controller: an atomic
//! exchange of an ordered list of segments with chip select held asserted
//! for the whole list.

mod traits;

pub use traits::*;
