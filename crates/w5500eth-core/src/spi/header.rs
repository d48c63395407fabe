//! SPI frame header

use super::{Block, OpMode, RegisterAddress};

/// Length of the address + control header in bytes
pub const HEADER_LEN: usize = 3;

/// Pack a W5500 frame header
///
/// - Byte 0: address bits 15:8
/// - Byte 1: address bits 7:0
/// - Byte 2: `(block & 0x1F) << 3 | write << 2 | (mode & 0x03)`
///
/// Out-of-range `block` and `mode` values are masked, not rejected; the chip
/// treats the extra bits as don't-care.
///
/// Example: reading VERSIONR (0x0039, common block, VDM) is `00 39 00`.
pub const fn build_header(address: u16, block: u8, write: bool, mode: u8) -> [u8; HEADER_LEN] {
    [
        (address >> 8) as u8,
        address as u8,
        ((block & 0x1F) << 3) | ((write as u8) << 2) | (mode & 0x03),
    ]
}

/// Read/write bit of the control byte
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Access {
    /// R/W bit clear
    Read,
    /// R/W bit set
    Write,
}

/// Typed view of a frame header
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpiHeader {
    /// Target address
    pub address: RegisterAddress,
    /// Transfer direction
    pub access: Access,
    /// Operation mode
    pub mode: OpMode,
}

impl SpiHeader {
    /// Variable-length read header
    pub const fn read(address: RegisterAddress) -> Self {
        Self {
            address,
            access: Access::Read,
            mode: OpMode::Variable,
        }
    }

    /// Variable-length write header
    pub const fn write(address: RegisterAddress) -> Self {
        Self {
            address,
            access: Access::Write,
            mode: OpMode::Variable,
        }
    }

    /// Set the operation mode
    pub const fn with_mode(mut self, mode: OpMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns true for write headers
    pub const fn is_write(&self) -> bool {
        matches!(self.access, Access::Write)
    }

    /// Encode to wire bytes
    pub const fn to_bytes(&self) -> [u8; HEADER_LEN] {
        build_header(
            self.address.offset,
            self.address.block.bits(),
            self.is_write(),
            self.mode.bits(),
        )
    }

    /// Decode wire bytes (used by chip models and bus sniffers)
    pub const fn parse(bytes: [u8; HEADER_LEN]) -> Self {
        let control = bytes[2];
        Self {
            address: RegisterAddress::new(
                Block::new(control >> 3),
                ((bytes[0] as u16) << 8) | bytes[1] as u16,
            ),
            access: if control & 0x04 != 0 {
                Access::Write
            } else {
                Access::Read
            },
            mode: OpMode::from_bits(control),
        }
    }
}
