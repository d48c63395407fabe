//! Outbound frames and transmit results

/// Largest frame accepted for transmission
pub const ETH_MTU: usize = 1500;

/// Ethernet header length (destination, source, EtherType)
pub const ETH_HEADER_LEN: usize = 14;

/// MTU registered with the stack: the payload that fits in an `ETH_MTU` frame
pub const IFACE_MTU: usize = ETH_MTU - ETH_HEADER_LEN;

/// Largest frame accepted from the chip (MTU + header + one VLAN tag)
pub const MAX_RX_FRAME: usize = ETH_MTU + ETH_HEADER_LEN + 4;

/// A frame handed to the TX path
///
/// Ownership passes to the driver; a refused frame is handed back through
/// [`TxResult::Refused`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame(Vec<u8>);

impl OutboundFrame {
    /// Wrap raw frame bytes
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Frame length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for a zero-length frame
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Frame bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Take the bytes back
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for OutboundFrame {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for OutboundFrame {
    fn from(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }
}

/// Outcome of a transmit call
///
/// Everything except `Refused` counts as accepted by the driver: the frame
/// was consumed, whether or not it reached the wire.
#[derive(Debug, PartialEq, Eq)]
pub enum TxResult {
    /// Frame written to the chip and SEND issued
    Sent,
    /// Frame discarded (oversize or empty), counted in `frames_dropped`
    Dropped,
    /// Transmission failed, counted in `transmit_errors`
    Errored,
    /// Device not ready; the frame is returned untouched
    Refused(OutboundFrame),
}
