//! SPI operation modes

/// Operation mode (OM) field of the control byte
///
/// Variable data length mode keeps chip select asserted for as long as the
/// host clocks data. The fixed modes are for hosts that cannot control chip
/// select and always move exactly 1, 2 or 4 data bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpMode {
    /// Variable data length (VDM), chip select framed
    #[default]
    Variable = 0b00,
    /// Fixed 1-byte data length (FDM)
    Fixed1 = 0b01,
    /// Fixed 2-byte data length (FDM)
    Fixed2 = 0b10,
    /// Fixed 4-byte data length (FDM)
    Fixed4 = 0b11,
}

impl OpMode {
    /// Decode from the low two bits; higher bits are ignored
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0b00 => Self::Variable,
            0b01 => Self::Fixed1,
            0b10 => Self::Fixed2,
            _ => Self::Fixed4,
        }
    }

    /// Raw 2-bit value
    pub const fn bits(self) -> u8 {
        self as u8
    }
}
