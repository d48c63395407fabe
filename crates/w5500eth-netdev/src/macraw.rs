//! Socket 0 MACRAW data path
//!
//! The W5500 passes raw Ethernet frames through socket 0 when it is opened
//! in MACRAW mode. Outbound frames are copied into the socket's TX buffer at
//! Sn_TX_WR and sent with SEND. Inbound frames sit in the RX buffer at
//! Sn_RX_RD, each behind a 2-byte big-endian length that counts itself.

use std::thread;

use w5500eth_core::bus::SpiBus;
use w5500eth_core::regs::{common, socket};
use w5500eth_core::spi::SOCKET_COUNT;
use w5500eth_core::transport::RegisterTransport;

use crate::config::DeviceConfig;
use crate::error::{NetdevError, Result};
use crate::frame::{ETH_HEADER_LEN, MAX_RX_FRAME};

/// The socket used for raw frames
const SOCKET: u8 = 0;

/// Length of the per-frame header in the RX buffer
const RX_HEADER_LEN: u16 = 2;

/// Issue a socket command and wait for the chip to clear Sn_CR
pub(crate) fn command<B: SpiBus>(
    t: &mut RegisterTransport<B>,
    command: socket::Command,
    polls: u32,
) -> Result<()> {
    let cr = socket::reg(SOCKET, socket::SN_CR);
    t.write8(cr, command as u8)?;
    for _ in 0..polls.max(1) {
        if t.read8(cr)? == 0 {
            return Ok(());
        }
    }
    Err(NetdevError::CommandTimeout {
        command: command as u8,
    })
}

/// Program the MAC address and open socket 0 in MACRAW mode
///
/// Socket 0 gets all 16 KiB of TX and RX memory. When `irq` is set, the
/// socket's RECV interrupt is unmasked so the chip asserts INTn on arrival.
pub(crate) fn configure<B: SpiBus>(
    t: &mut RegisterTransport<B>,
    config: &DeviceConfig,
    irq: bool,
) -> Result<()> {
    t.write_bulk(common::SHAR, &config.mac.octets())?;

    for n in 0..SOCKET_COUNT {
        let kb = if n == SOCKET {
            socket::TOTAL_BUFFER_KB
        } else {
            0
        };
        t.write8(socket::reg(n, socket::SN_TXBUF_SIZE), kb)?;
        t.write8(socket::reg(n, socket::SN_RXBUF_SIZE), kb)?;
    }

    let flags = if config.mac_filter {
        socket::ModeFlags::MAC_FILTER
    } else {
        socket::ModeFlags::empty()
    };
    t.write8(
        socket::reg(SOCKET, socket::SN_MR),
        socket::mode(socket::Protocol::MacRaw, flags),
    )?;
    command(t, socket::Command::Open, config.command_polls)?;

    let status = t.read8(socket::reg(SOCKET, socket::SN_SR))?;
    if status != socket::Status::MacRaw as u8 {
        return Err(NetdevError::SocketOpenFailed { status });
    }

    // Drop anything latched before the socket was ours
    t.write8(socket::reg(SOCKET, socket::SN_IR), 0xFF)?;
    if irq {
        t.write8(
            socket::reg(SOCKET, socket::SN_IMR),
            socket::Interrupt::RECV.bits(),
        )?;
        t.write8(common::SIMR, 1 << SOCKET)?;
    } else {
        t.write8(common::SIMR, 0)?;
    }

    log::debug!(
        "w5500: socket 0 open in MACRAW (mac {}, filter {})",
        config.mac,
        config.mac_filter
    );
    Ok(())
}

/// Copy one frame into the TX buffer and send it
pub(crate) fn send<B: SpiBus>(
    t: &mut RegisterTransport<B>,
    frame: &[u8],
    config: &DeviceConfig,
) -> Result<()> {
    let needed = frame.len();
    let fsr = socket::reg(SOCKET, socket::SN_TX_FSR);

    let mut free = t.read16_stable(fsr)?;
    let mut polls = 1;
    while (free as usize) < needed && polls < config.tx_free_polls {
        thread::sleep(config.tx_poll_interval);
        free = t.read16_stable(fsr)?;
        polls += 1;
    }
    if (free as usize) < needed {
        return Err(NetdevError::TxBufferFull { free, needed });
    }

    let wr_reg = socket::reg(SOCKET, socket::SN_TX_WR);
    let wr = t.read16(wr_reg)?;
    t.write_bulk(socket::tx_buffer(SOCKET, wr), frame)?;
    t.write16(wr_reg, wr.wrapping_add(needed as u16))?;
    command(t, socket::Command::Send, config.command_polls)
}

/// Bytes waiting in the RX buffer
pub(crate) fn rx_pending<B: SpiBus>(t: &mut RegisterTransport<B>) -> Result<u16> {
    Ok(t.read16_stable(socket::reg(SOCKET, socket::SN_RX_RSR))?)
}

/// Result of reading one entry from the RX buffer
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RxEntry {
    /// A complete frame
    Frame(Vec<u8>),
    /// The length header made no sense; `discarded` pending bytes were dropped
    Malformed { length: u16, discarded: u16 },
}

/// Read the frame at Sn_RX_RD and release its space
///
/// `pending` is the current Sn_RX_RSR. A length header that is shorter than
/// an Ethernet header, longer than the largest frame, or longer than what
/// is pending cannot be trusted to find the next frame, so everything
/// pending is discarded.
pub(crate) fn recv<B: SpiBus>(
    t: &mut RegisterTransport<B>,
    pending: u16,
    config: &DeviceConfig,
) -> Result<RxEntry> {
    let rd_reg = socket::reg(SOCKET, socket::SN_RX_RD);
    let rd = t.read16(rd_reg)?;

    let header = t.read_bulk(socket::rx_buffer(SOCKET, rd), RX_HEADER_LEN as usize)?;
    let length = u16::from_be_bytes([header[0], header[1]]);
    let frame_len = length.saturating_sub(RX_HEADER_LEN) as usize;

    if length <= RX_HEADER_LEN
        || length > pending
        || frame_len < ETH_HEADER_LEN
        || frame_len > MAX_RX_FRAME
    {
        t.write16(rd_reg, rd.wrapping_add(pending))?;
        command(t, socket::Command::Recv, config.command_polls)?;
        return Ok(RxEntry::Malformed {
            length,
            discarded: pending,
        });
    }

    let frame = t.read_bulk(socket::rx_buffer(SOCKET, rd.wrapping_add(RX_HEADER_LEN)), frame_len)?;
    t.write16(rd_reg, rd.wrapping_add(length))?;
    command(t, socket::Command::Recv, config.command_polls)?;
    Ok(RxEntry::Frame(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use w5500eth_sim::SimW5500;

    fn opened(sim: &SimW5500) -> RegisterTransport<SimW5500> {
        let mut t = RegisterTransport::new(sim.clone());
        configure(&mut t, &DeviceConfig::default(), true).unwrap();
        t
    }

    #[test]
    fn test_configure_opens_macraw() {
        let sim = SimW5500::new_default();
        let _t = opened(&sim);
        assert_eq!(
            sim.peek(socket::reg(0, socket::SN_SR)),
            socket::Status::MacRaw as u8
        );
        assert_eq!(sim.peek(socket::reg(0, socket::SN_MR)), 0x84);
        assert_eq!(sim.peek(socket::reg(0, socket::SN_TXBUF_SIZE)), 16);
        assert_eq!(sim.peek(socket::reg(1, socket::SN_RXBUF_SIZE)), 0);
        assert_eq!(sim.peek(common::SIMR), 0x01);
        assert_eq!(sim.peek(socket::reg(0, socket::SN_IMR)), 0x04);
        assert_eq!(sim.peek(common::SHAR), 0x02);
    }

    #[test]
    fn test_send_advances_write_pointer() {
        let sim = SimW5500::new_default();
        let mut t = opened(&sim);
        let frame: Vec<u8> = (0..64).collect();
        send(&mut t, &frame, &DeviceConfig::default()).unwrap();
        send(&mut t, &frame[..60], &DeviceConfig::default()).unwrap();
        assert_eq!(sim.peek16(socket::reg(0, socket::SN_TX_WR)), 124);
        assert_eq!(sim.sent_frames(), vec![frame.clone(), frame[..60].to_vec()]);
    }

    #[test]
    fn test_command_timeout() {
        let sim = SimW5500::new_default();
        let mut t = opened(&sim);
        sim.set_hold_commands(true);
        let err = command(&mut t, socket::Command::Send, 5).unwrap_err();
        assert!(matches!(err, NetdevError::CommandTimeout { command: 0x20 }));
    }

    #[test]
    fn test_send_waits_for_room_then_gives_up() {
        let sim = SimW5500::new_default();
        let mut t = opened(&sim);
        sim.set_hold_commands(true);
        let config = DeviceConfig::default().with_tx_free_polls(3);
        let frame = vec![0u8; 1500];
        // SEND never completes, so TX_RD never catches up with TX_WR
        let mut last = None;
        for _ in 0..12 {
            if let Err(e) = send(&mut t, &frame, &config) {
                last = Some(e);
            }
        }
        assert!(matches!(last, Some(NetdevError::TxBufferFull { needed: 1500, .. })));
    }

    #[test]
    fn test_recv_frame() {
        let sim = SimW5500::new_default();
        let mut t = opened(&sim);
        let frame: Vec<u8> = (0..60).collect();
        assert!(sim.inject_rx_frame(&frame));

        let pending = rx_pending(&mut t).unwrap();
        assert_eq!(pending, 62);
        let entry = recv(&mut t, pending, &DeviceConfig::default()).unwrap();
        assert_eq!(entry, RxEntry::Frame(frame));
        assert_eq!(rx_pending(&mut t).unwrap(), 0);
    }

    #[test]
    fn test_recv_malformed_discards_pending() {
        let sim = SimW5500::new_default();
        let mut t = opened(&sim);
        assert!(sim.inject_rx_raw(&[0xFF, 0xFF, 1, 2, 3, 4]));

        let pending = rx_pending(&mut t).unwrap();
        let entry = recv(&mut t, pending, &DeviceConfig::default()).unwrap();
        assert_eq!(
            entry,
            RxEntry::Malformed {
                length: 0xFFFF,
                discarded: 6
            }
        );
        assert_eq!(rx_pending(&mut t).unwrap(), 0);
    }
}
