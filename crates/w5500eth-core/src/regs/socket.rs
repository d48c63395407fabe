//! Socket register blocks (BSB 4n+1)

use bitflags::bitflags;

use crate::spi::{Block, RegisterAddress};

/// Socket n Mode
pub const SN_MR: u16 = 0x0000;
/// Socket n Command
pub const SN_CR: u16 = 0x0001;
/// Socket n Interrupt
pub const SN_IR: u16 = 0x0002;
/// Socket n Status
pub const SN_SR: u16 = 0x0003;
/// Socket n Source Port (2 bytes)
pub const SN_PORT: u16 = 0x0004;
/// Socket n RX Buffer Size (in KiB)
pub const SN_RXBUF_SIZE: u16 = 0x001E;
/// Socket n TX Buffer Size (in KiB)
pub const SN_TXBUF_SIZE: u16 = 0x001F;
/// Socket n TX Free Size (2 bytes)
pub const SN_TX_FSR: u16 = 0x0020;
/// Socket n TX Read Pointer (2 bytes)
pub const SN_TX_RD: u16 = 0x0022;
/// Socket n TX Write Pointer (2 bytes)
pub const SN_TX_WR: u16 = 0x0024;
/// Socket n RX Received Size (2 bytes)
pub const SN_RX_RSR: u16 = 0x0026;
/// Socket n RX Read Pointer (2 bytes)
pub const SN_RX_RD: u16 = 0x0028;
/// Socket n RX Write Pointer (2 bytes)
pub const SN_RX_WR: u16 = 0x002A;
/// Socket n Interrupt Mask
pub const SN_IMR: u16 = 0x002C;

/// Total TX (and RX) buffer memory shared by all sockets, in KiB
pub const TOTAL_BUFFER_KB: u8 = 16;

/// Address of a register in socket `n`'s register block
pub const fn reg(n: u8, offset: u16) -> RegisterAddress {
    RegisterAddress::new(Block::socket_registers(n), offset)
}

/// Address inside socket `n`'s TX buffer
pub const fn tx_buffer(n: u8, pointer: u16) -> RegisterAddress {
    RegisterAddress::new(Block::socket_tx(n), pointer)
}

/// Address inside socket `n`'s RX buffer
pub const fn rx_buffer(n: u8, pointer: u16) -> RegisterAddress {
    RegisterAddress::new(Block::socket_rx(n), pointer)
}

bitflags! {
    /// Socket Mode Register flag bits (upper nibble)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModeFlags: u8 {
        /// MACRAW: only accept frames for our MAC (plus broadcast/multicast)
        const MAC_FILTER      = 1 << 7;
        /// MACRAW: block broadcast frames
        const BROADCAST_BLOCK = 1 << 6;
        /// MACRAW: block multicast frames
        const MULTICAST_BLOCK = 1 << 5;
        /// MACRAW: block IPv6 frames
        const IPV6_BLOCK      = 1 << 4;
    }
}

/// Socket protocol (lower nibble of Sn_MR)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Protocol {
    /// Socket closed
    Closed = 0x00,
    /// TCP
    Tcp = 0x01,
    /// UDP
    Udp = 0x02,
    /// Raw Ethernet frames (socket 0 only)
    MacRaw = 0x04,
}

/// Compose a Sn_MR value
pub const fn mode(protocol: Protocol, flags: ModeFlags) -> u8 {
    flags.bits() | protocol as u8
}

/// Socket commands written to Sn_CR
///
/// The chip clears Sn_CR once it has accepted the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Initialize the socket according to Sn_MR
    Open = 0x01,
    /// TCP listen
    Listen = 0x02,
    /// TCP connect
    Connect = 0x04,
    /// TCP disconnect
    Disconnect = 0x08,
    /// Close the socket
    Close = 0x10,
    /// Transmit the data between Sn_TX_RD and Sn_TX_WR
    Send = 0x20,
    /// UDP send without ARP
    SendMac = 0x21,
    /// TCP keep-alive
    SendKeep = 0x22,
    /// Release the data between Sn_RX_RD and the new Sn_RX_RD
    Recv = 0x40,
}

impl Command {
    /// Decode a Sn_CR value
    pub const fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0x01 => Self::Open,
            0x02 => Self::Listen,
            0x04 => Self::Connect,
            0x08 => Self::Disconnect,
            0x10 => Self::Close,
            0x20 => Self::Send,
            0x21 => Self::SendMac,
            0x22 => Self::SendKeep,
            0x40 => Self::Recv,
            _ => return None,
        })
    }
}

bitflags! {
    /// Socket Interrupt (Sn_IR) and Interrupt Mask (Sn_IMR) bits
    ///
    /// Sn_IR bits are cleared by writing 1.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Interrupt: u8 {
        /// SEND command completed
        const SEND_OK = 1 << 4;
        /// ARP or TCP timeout
        const TIMEOUT = 1 << 3;
        /// Data received
        const RECV    = 1 << 2;
        /// FIN received
        const DISCON  = 1 << 1;
        /// Connection established
        const CON     = 1 << 0;
    }
}

/// Socket status (Sn_SR)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Closed
    Closed = 0x00,
    /// TCP opened, not yet listening or connecting
    Init = 0x13,
    /// TCP listening
    Listen = 0x14,
    /// TCP connected
    Established = 0x17,
    /// TCP peer closed
    CloseWait = 0x1C,
    /// UDP open
    Udp = 0x22,
    /// MACRAW open
    MacRaw = 0x42,
}

impl Status {
    /// Decode a Sn_SR value; transient TCP states map to `None`
    pub const fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0x00 => Self::Closed,
            0x13 => Self::Init,
            0x14 => Self::Listen,
            0x17 => Self::Established,
            0x1C => Self::CloseWait,
            0x22 => Self::Udp,
            0x42 => Self::MacRaw,
            _ => return None,
        })
    }
}
