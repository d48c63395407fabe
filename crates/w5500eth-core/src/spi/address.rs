//! Block-scoped register addresses

use core::fmt;

use super::Block;

/// A 16-bit offset inside one block of the W5500 address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterAddress {
    /// Block select
    pub block: Block,
    /// Offset within the block
    pub offset: u16,
}

impl RegisterAddress {
    /// Create an address in the given block
    pub const fn new(block: Block, offset: u16) -> Self {
        Self { block, offset }
    }

    /// Create an address in the common register block
    pub const fn common(offset: u16) -> Self {
        Self::new(Block::COMMON, offset)
    }

    /// Advance the offset, wrapping at 16 bits
    ///
    /// Socket buffer pointers are free-running 16-bit counters; the chip maps
    /// them onto the buffer modulo its size, so wrapping is the right thing.
    pub const fn wrapping_add(self, n: u16) -> Self {
        Self::new(self.block, self.offset.wrapping_add(n))
    }
}

impl fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:0x{:04X}", self.block, self.offset)
    }
}
