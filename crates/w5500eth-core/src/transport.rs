//! Register transport
//!
//! Every register and buffer access goes through [`RegisterTransport`],
//! which builds the frame header and runs header and payload as a single
//! chip-select framed bus exchange. Failures are reported with the address
//! and direction of the transaction and are never retried here.

#[cfg(any(feature = "alloc", test))]
use alloc::vec::Vec;

use crate::bus::{Segment, SpiBus};
use crate::error::{Direction, TransportError};
use crate::spi::{RegisterAddress, SpiHeader, HEADER_LEN};

/// Maximum number of reads `read16_stable` performs before giving up
pub const STABLE_READ_ATTEMPTS: usize = 8;

/// Register access on top of an [`SpiBus`]
pub struct RegisterTransport<B> {
    bus: B,
}

impl<B: SpiBus> RegisterTransport<B> {
    /// Wrap a bus
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Get a reference to the underlying bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Get a mutable reference to the underlying bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Consume the transport and return the bus
    pub fn into_inner(self) -> B {
        self.bus
    }

    /// Read one byte
    pub fn read8(&mut self, address: RegisterAddress) -> Result<u8, TransportError> {
        let header = SpiHeader::read(address).to_bytes();
        let mut value = [0u8; 1];
        let mut segments = [Segment::Write(&header), Segment::Read(&mut value)];
        self.bus
            .exchange(&mut segments)
            .map_err(|fault| TransportError::new(address, Direction::Read, fault))?;
        Ok(value[0])
    }

    /// Write one byte
    ///
    /// Header and data go out as one contiguous 4-byte segment.
    pub fn write8(&mut self, address: RegisterAddress, value: u8) -> Result<(), TransportError> {
        let header = SpiHeader::write(address).to_bytes();
        let mut frame = [0u8; HEADER_LEN + 1];
        frame[..HEADER_LEN].copy_from_slice(&header);
        frame[HEADER_LEN] = value;
        self.bus
            .exchange(&mut [Segment::Write(&frame)])
            .map_err(|fault| TransportError::new(address, Direction::Write, fault))
    }

    /// Read a big-endian 16-bit register pair
    pub fn read16(&mut self, address: RegisterAddress) -> Result<u16, TransportError> {
        let mut buf = [0u8; 2];
        self.read_into(address, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Write a big-endian 16-bit register pair
    pub fn write16(&mut self, address: RegisterAddress, value: u16) -> Result<(), TransportError> {
        self.write_bulk(address, &value.to_be_bytes())
    }

    /// Read a 16-bit counter that the chip may update mid-read
    ///
    /// Sn_TX_FSR and Sn_RX_RSR are not latched, so a read can observe a torn
    /// value. Reads repeat until two consecutive values agree, for at most
    /// [`STABLE_READ_ATTEMPTS`] reads; after that the last value is returned.
    pub fn read16_stable(&mut self, address: RegisterAddress) -> Result<u16, TransportError> {
        let mut previous = self.read16(address)?;
        for _ in 1..STABLE_READ_ATTEMPTS {
            let current = self.read16(address)?;
            if current == previous {
                return Ok(current);
            }
            previous = current;
        }
        log::warn!(
            "w5500: {} did not settle after {} reads, using 0x{:04X}",
            address,
            STABLE_READ_ATTEMPTS,
            previous
        );
        Ok(previous)
    }

    /// Read `buf.len()` bytes starting at `address`
    ///
    /// Reads longer than the bus's maximum transfer length are split into
    /// several exchanges; the offset advances (wrapping) between them.
    pub fn read_into(
        &mut self,
        address: RegisterAddress,
        buf: &mut [u8],
    ) -> Result<(), TransportError> {
        let chunk_len = self.bus.max_transfer_len().max(1);
        let mut current = address;
        for chunk in buf.chunks_mut(chunk_len) {
            let header = SpiHeader::read(current).to_bytes();
            let len = chunk.len();
            let mut segments = [Segment::Write(&header), Segment::Read(chunk)];
            self.bus
                .exchange(&mut segments)
                .map_err(|fault| TransportError::new(current, Direction::Read, fault))?;
            current = current.wrapping_add(len as u16);
        }
        Ok(())
    }

    /// Read `length` bytes starting at `address`
    #[cfg(any(feature = "alloc", test))]
    pub fn read_bulk(
        &mut self,
        address: RegisterAddress,
        length: usize,
    ) -> Result<Vec<u8>, TransportError> {
        let mut buf = alloc::vec![0u8; length];
        self.read_into(address, &mut buf)?;
        Ok(buf)
    }

    /// Write `data` starting at `address`
    pub fn write_bulk(&mut self, address: RegisterAddress, data: &[u8]) -> Result<(), TransportError> {
        let chunk_len = self.bus.max_transfer_len().max(1);
        let mut current = address;
        for chunk in data.chunks(chunk_len) {
            let header = SpiHeader::write(current).to_bytes();
            self.bus
                .exchange(&mut [Segment::Write(&header), Segment::Write(chunk)])
                .map_err(|fault| TransportError::new(current, Direction::Write, fault))?;
            current = current.wrapping_add(chunk.len() as u16);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusFault;
    use crate::regs::{common, socket};
    use crate::spi::Block;
    use alloc::vec;

    /// Records every exchange as the list of segment byte strings it carried
    #[derive(Default)]
    struct RecordingBus {
        exchanges: Vec<Vec<Vec<u8>>>,
        read_fill: Vec<u8>,
        max_len: Option<usize>,
        fail: Option<BusFault>,
    }

    impl SpiBus for RecordingBus {
        fn exchange(&mut self, segments: &mut [Segment<'_>]) -> Result<(), BusFault> {
            if let Some(fault) = self.fail {
                return Err(fault);
            }
            let mut record = Vec::new();
            for segment in segments.iter_mut() {
                match segment {
                    Segment::Write(tx) => record.push(tx.to_vec()),
                    Segment::Read(rx) => {
                        for (i, b) in rx.iter_mut().enumerate() {
                            *b = self.read_fill.get(i).copied().unwrap_or(0);
                        }
                        record.push(vec![0xEE; rx.len()]);
                    }
                    Segment::Transfer { tx, .. } => record.push(tx.to_vec()),
                }
            }
            self.exchanges.push(record);
            Ok(())
        }

        fn max_transfer_len(&self) -> usize {
            self.max_len.unwrap_or(usize::MAX)
        }
    }

    #[test]
    fn test_read8_is_one_exchange_two_segments() {
        let mut t = RegisterTransport::new(RecordingBus {
            read_fill: vec![0x04],
            ..Default::default()
        });
        assert_eq!(t.read8(common::VERSIONR).unwrap(), 0x04);
        let bus = t.into_inner();
        assert_eq!(bus.exchanges.len(), 1);
        assert_eq!(bus.exchanges[0][0], vec![0x00, 0x39, 0x00]);
        assert_eq!(bus.exchanges[0][1].len(), 1);
    }

    #[test]
    fn test_write8_is_one_contiguous_segment() {
        let mut t = RegisterTransport::new(RecordingBus::default());
        t.write8(common::MR, 0x80).unwrap();
        let bus = t.into_inner();
        assert_eq!(bus.exchanges, vec![vec![vec![0x00, 0x00, 0x04, 0x80]]]);
    }

    #[test]
    fn test_read16_is_big_endian() {
        let mut t = RegisterTransport::new(RecordingBus {
            read_fill: vec![0x12, 0x34],
            ..Default::default()
        });
        assert_eq!(t.read16(socket::reg(0, socket::SN_RX_RSR)).unwrap(), 0x1234);
    }

    #[test]
    fn test_write16_is_big_endian() {
        let mut t = RegisterTransport::new(RecordingBus::default());
        t.write16(socket::reg(0, socket::SN_TX_WR), 0xABCD).unwrap();
        let bus = t.into_inner();
        assert_eq!(bus.exchanges[0][0], vec![0x00, 0x24, 0x0C]);
        assert_eq!(bus.exchanges[0][1], vec![0xAB, 0xCD]);
    }

    #[test]
    fn test_bulk_write_is_chunked() {
        let mut t = RegisterTransport::new(RecordingBus {
            max_len: Some(4),
            ..Default::default()
        });
        let data: Vec<u8> = (0..10).collect();
        t.write_bulk(RegisterAddress::new(Block::socket_tx(0), 0xFFFE), &data)
            .unwrap();
        let bus = t.into_inner();
        assert_eq!(bus.exchanges.len(), 3);
        // Offsets advance and wrap at 16 bits
        assert_eq!(&bus.exchanges[0][0][..2], &[0xFF, 0xFE]);
        assert_eq!(&bus.exchanges[1][0][..2], &[0x00, 0x02]);
        assert_eq!(&bus.exchanges[2][0][..2], &[0x00, 0x06]);
        assert_eq!(bus.exchanges[2][1], vec![8, 9]);
    }

    #[test]
    fn test_bulk_read_chunked_and_sized() {
        let mut t = RegisterTransport::new(RecordingBus {
            max_len: Some(3),
            read_fill: vec![1, 2, 3],
            ..Default::default()
        });
        let data = t
            .read_bulk(RegisterAddress::new(Block::socket_rx(0), 0x0010), 7)
            .unwrap();
        assert_eq!(data, vec![1, 2, 3, 1, 2, 3, 1]);
        assert_eq!(t.bus().exchanges.len(), 3);
    }

    #[test]
    fn test_error_carries_address_and_direction() {
        let mut t = RegisterTransport::new(RecordingBus {
            fail: Some(BusFault::NoResponse),
            ..Default::default()
        });
        let err = t.read8(common::VERSIONR).unwrap_err();
        assert_eq!(
            err,
            TransportError::new(common::VERSIONR, Direction::Read, BusFault::NoResponse)
        );
        let err = t.write8(common::SIMR, 1).unwrap_err();
        assert_eq!(err.direction, Direction::Write);
        assert_eq!(err.address, common::SIMR);
    }

    /// Bus returning a different counter value on each read
    struct CountingBus {
        values: Vec<u16>,
        next: usize,
    }

    impl SpiBus for CountingBus {
        fn exchange(&mut self, segments: &mut [Segment<'_>]) -> Result<(), BusFault> {
            let value = self.values[self.next.min(self.values.len() - 1)];
            self.next += 1;
            if let Segment::Read(rx) = &mut segments[1] {
                rx.copy_from_slice(&value.to_be_bytes());
            }
            Ok(())
        }
    }

    #[test]
    fn test_read16_stable_waits_for_agreement() {
        let mut t = RegisterTransport::new(CountingBus {
            values: vec![0x0100, 0x0140, 0x0140],
            next: 0,
        });
        assert_eq!(t.read16_stable(socket::reg(0, socket::SN_RX_RSR)).unwrap(), 0x0140);
        assert_eq!(t.bus().next, 3);
    }

    #[test]
    fn test_read16_stable_is_bounded() {
        let values: Vec<u16> = (0..32).collect();
        let mut t = RegisterTransport::new(CountingBus { values, next: 0 });
        assert_eq!(t.read16_stable(socket::reg(0, socket::SN_TX_FSR)).unwrap(), 7);
        assert_eq!(t.bus().next, STABLE_READ_ATTEMPTS);
    }
}
