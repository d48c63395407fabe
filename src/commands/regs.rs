//! Register dump

use w5500eth_core::regs::common::{self, Mode, PhyStatus};
use w5500eth_core::regs::socket;
use w5500eth_core::transport::RegisterTransport;

use crate::backends;
use crate::commands::hexdump;
use crate::config::Settings;

fn field(block: &[u8], start: w5500eth_core::spi::RegisterAddress, len: usize) -> &[u8] {
    let start = start.offset as usize;
    &block[start..start + len]
}

fn dotted(bytes: &[u8]) -> String {
    let parts: Vec<String> = bytes.iter().map(|b| b.to_string()).collect();
    parts.join(".")
}

/// Read the common block and socket 0 registers without bringing the device up
pub fn run_regs(settings: &Settings, raw: bool) -> Result<(), Box<dyn std::error::Error>> {
    let backend = backends::open_backend(&settings.backend)?;
    let mut t = RegisterTransport::new(backend.bus);

    let block = t.read_bulk(common::MR, common::COMMON_BLOCK_LEN)?;
    let byte = |reg: w5500eth_core::spi::RegisterAddress| block[reg.offset as usize];
    let word = |reg: w5500eth_core::spi::RegisterAddress| {
        let f = field(&block, reg, 2);
        u16::from_be_bytes([f[0], f[1]])
    };

    println!("Common registers:");
    println!(
        "  MR       0x{:02X} {:?}",
        byte(common::MR),
        Mode::from_bits_truncate(byte(common::MR))
    );
    println!("  GAR      {}", dotted(field(&block, common::GAR, 4)));
    println!("  SUBR     {}", dotted(field(&block, common::SUBR, 4)));
    let mac: Vec<String> = field(&block, common::SHAR, common::MAC_LEN)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    println!("  SHAR     {}", mac.join(":"));
    println!("  SIPR     {}", dotted(field(&block, common::SIPR, 4)));
    println!("  INTLEVEL {}", word(common::INTLEVEL));
    println!("  IR       0x{:02X}", byte(common::IR));
    println!("  IMR      0x{:02X}", byte(common::IMR));
    println!("  SIR      0x{:02X}", byte(common::SIR));
    println!("  SIMR     0x{:02X}", byte(common::SIMR));
    println!("  RTR      {}", word(common::RTR));
    println!("  RCR      {}", byte(common::RCR));
    println!(
        "  PHYCFGR  0x{:02X} {:?}",
        byte(common::PHYCFGR),
        PhyStatus::from_phycfgr(byte(common::PHYCFGR))
    );
    let version = byte(common::VERSIONR);
    if version == common::CHIP_VERSION {
        println!("  VERSIONR 0x{:02X}", version);
    } else {
        println!(
            "  VERSIONR 0x{:02X} (unexpected, expected 0x{:02X})",
            version,
            common::CHIP_VERSION
        );
    }

    let sr = t.read8(socket::reg(0, socket::SN_SR))?;
    println!("Socket 0:");
    println!("  MR       0x{:02X}", t.read8(socket::reg(0, socket::SN_MR))?);
    match socket::Status::from_u8(sr) {
        Some(status) => println!("  SR       0x{:02X} {:?}", sr, status),
        None => println!("  SR       0x{:02X}", sr),
    }
    println!("  IR       0x{:02X}", t.read8(socket::reg(0, socket::SN_IR))?);
    println!(
        "  BUF      TX {} KiB, RX {} KiB",
        t.read8(socket::reg(0, socket::SN_TXBUF_SIZE))?,
        t.read8(socket::reg(0, socket::SN_RXBUF_SIZE))?
    );
    println!(
        "  TX       FSR {} RD 0x{:04X} WR 0x{:04X}",
        t.read16_stable(socket::reg(0, socket::SN_TX_FSR))?,
        t.read16(socket::reg(0, socket::SN_TX_RD))?,
        t.read16(socket::reg(0, socket::SN_TX_WR))?
    );
    println!(
        "  RX       RSR {} RD 0x{:04X} WR 0x{:04X}",
        t.read16_stable(socket::reg(0, socket::SN_RX_RSR))?,
        t.read16(socket::reg(0, socket::SN_RX_RD))?,
        t.read16(socket::reg(0, socket::SN_RX_WR))?
    );

    if raw {
        println!("Common block:");
        hexdump(&block);
    }

    Ok(())
}
