//! Block select values

use core::fmt;

/// Number of hardware sockets on the W5500
pub const SOCKET_COUNT: u8 = 8;

/// 5-bit block select field
///
/// The W5500 address space is split into blocks: the common register block,
/// and for each of the 8 sockets a register block, a TX buffer and an RX
/// buffer. Socket `n` uses blocks `4n+1`, `4n+2` and `4n+3`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Block(u8);

/// Decoded meaning of a block select value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Common registers (mode, addresses, interrupts, PHY, version)
    Common,
    /// Socket register block
    SocketRegisters(u8),
    /// Socket TX buffer
    SocketTx(u8),
    /// Socket RX buffer
    SocketRx(u8),
    /// Reserved block (4n for n > 0)
    Reserved,
}

impl Block {
    /// Common register block
    pub const COMMON: Self = Self(0x00);

    /// Create a block from a raw value, masking to 5 bits
    pub const fn new(raw: u8) -> Self {
        Self(raw & 0x1F)
    }

    /// Register block of socket `n` (n is taken modulo 8)
    pub const fn socket_registers(n: u8) -> Self {
        Self::new((n % SOCKET_COUNT) * 4 + 1)
    }

    /// TX buffer block of socket `n` (n is taken modulo 8)
    pub const fn socket_tx(n: u8) -> Self {
        Self::new((n % SOCKET_COUNT) * 4 + 2)
    }

    /// RX buffer block of socket `n` (n is taken modulo 8)
    pub const fn socket_rx(n: u8) -> Self {
        Self::new((n % SOCKET_COUNT) * 4 + 3)
    }

    /// Raw 5-bit value
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Decode what this block refers to
    pub const fn kind(self) -> BlockKind {
        let socket = self.0 >> 2;
        match self.0 & 0x03 {
            0 if self.0 == 0 => BlockKind::Common,
            0 => BlockKind::Reserved,
            1 => BlockKind::SocketRegisters(socket),
            2 => BlockKind::SocketTx(socket),
            _ => BlockKind::SocketRx(socket),
        }
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({})", self)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            BlockKind::Common => write!(f, "common"),
            BlockKind::SocketRegisters(n) => write!(f, "s{}-regs", n),
            BlockKind::SocketTx(n) => write!(f, "s{}-tx", n),
            BlockKind::SocketRx(n) => write!(f, "s{}-rx", n),
            BlockKind::Reserved => write!(f, "reserved{:02}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_blocks() {
        assert_eq!(Block::socket_registers(0).bits(), 0x01);
        assert_eq!(Block::socket_tx(0).bits(), 0x02);
        assert_eq!(Block::socket_rx(0).bits(), 0x03);
        assert_eq!(Block::socket_registers(7).bits(), 0x1D);
        assert_eq!(Block::socket_rx(7).bits(), 0x1F);
    }

    #[test]
    fn test_block_is_masked() {
        assert_eq!(Block::new(0xFF).bits(), 0x1F);
        assert_eq!(Block::new(0x20).bits(), 0x00);
    }

    #[test]
    fn test_block_kind() {
        assert_eq!(Block::COMMON.kind(), BlockKind::Common);
        assert_eq!(Block::new(0x04).kind(), BlockKind::Reserved);
        assert_eq!(Block::socket_tx(3).kind(), BlockKind::SocketTx(3));
        assert_eq!(Block::socket_rx(5).kind(), BlockKind::SocketRx(5));
    }
}
