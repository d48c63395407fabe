//! Common register block (BSB 0x00)

use bitflags::bitflags;

use crate::spi::RegisterAddress;

/// Mode Register
pub const MR: RegisterAddress = RegisterAddress::common(0x0000);
/// Gateway IP Address (4 bytes)
pub const GAR: RegisterAddress = RegisterAddress::common(0x0001);
/// Subnet Mask (4 bytes)
pub const SUBR: RegisterAddress = RegisterAddress::common(0x0005);
/// Source Hardware (MAC) Address (6 bytes)
pub const SHAR: RegisterAddress = RegisterAddress::common(0x0009);
/// Source IP Address (4 bytes)
pub const SIPR: RegisterAddress = RegisterAddress::common(0x000F);
/// Interrupt Low Level Timer (2 bytes)
pub const INTLEVEL: RegisterAddress = RegisterAddress::common(0x0013);
/// Interrupt Register
pub const IR: RegisterAddress = RegisterAddress::common(0x0015);
/// Interrupt Mask
pub const IMR: RegisterAddress = RegisterAddress::common(0x0016);
/// Socket Interrupt (one bit per socket)
pub const SIR: RegisterAddress = RegisterAddress::common(0x0017);
/// Socket Interrupt Mask (one bit per socket)
pub const SIMR: RegisterAddress = RegisterAddress::common(0x0018);
/// Retry Time (2 bytes)
pub const RTR: RegisterAddress = RegisterAddress::common(0x0019);
/// Retry Count
pub const RCR: RegisterAddress = RegisterAddress::common(0x001B);
/// PHY Configuration
pub const PHYCFGR: RegisterAddress = RegisterAddress::common(0x002E);
/// Chip Version
pub const VERSIONR: RegisterAddress = RegisterAddress::common(0x0039);

/// Value of VERSIONR on the W5500
pub const CHIP_VERSION: u8 = 0x04;

/// Number of bytes covered by a full common block dump (MR..VERSIONR)
pub const COMMON_BLOCK_LEN: usize = 0x003A;

/// Length of SHAR
pub const MAC_LEN: usize = 6;

bitflags! {
    /// Mode Register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Mode: u8 {
        /// Software reset (self-clearing)
        const RST   = 1 << 7;
        /// Wake on LAN
        const WOL   = 1 << 5;
        /// Ping block
        const PB    = 1 << 4;
        /// PPPoE mode
        const PPPOE = 1 << 3;
        /// Force ARP
        const FARP  = 1 << 1;
    }
}

bitflags! {
    /// PHY Configuration Register bits
    ///
    /// Only the read-only status bits are decoded; link negotiation is
    /// left at the chip's power-on default.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PhyStatus: u8 {
        /// Full duplex
        const DPX = 1 << 2;
        /// 100 Mbps
        const SPD = 1 << 1;
        /// Link up
        const LNK = 1 << 0;
    }
}

impl PhyStatus {
    /// Decode the status bits of PHYCFGR, ignoring configuration bits
    pub const fn from_phycfgr(raw: u8) -> Self {
        Self::from_bits_truncate(raw)
    }

    /// Returns true if the PHY reports link
    pub const fn link_up(self) -> bool {
        self.contains(Self::LNK)
    }
}
