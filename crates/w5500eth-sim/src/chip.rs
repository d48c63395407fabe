//! Register and buffer model of one W5500

use w5500eth_core::regs::{common, socket};
use w5500eth_core::spi::{BlockKind, RegisterAddress, SOCKET_COUNT};

const COMMON_LEN: usize = 0x40;
const SOCKET_REGS_LEN: usize = 0x30;
const BUFFER_LEN: usize = socket::TOTAL_BUFFER_KB as usize * 1024;
const DEFAULT_BUFFER_KB: u8 = 2;

/// Chip state behind the bus
pub(crate) struct ChipState {
    version: u8,
    phy_status: u8,
    common: [u8; COMMON_LEN],
    sockets: [[u8; SOCKET_REGS_LEN]; SOCKET_COUNT as usize],
    tx: Vec<Vec<u8>>,
    rx: Vec<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    int_asserted: bool,
    hold_commands: bool,
    edges: flume::Sender<()>,
}

impl ChipState {
    pub(crate) fn new(version: u8, hold_commands: bool, edges: flume::Sender<()>) -> Self {
        let mut state = Self {
            version,
            phy_status: 0x07,
            common: [0; COMMON_LEN],
            sockets: [[0; SOCKET_REGS_LEN]; SOCKET_COUNT as usize],
            tx: vec![vec![0; BUFFER_LEN]; SOCKET_COUNT as usize],
            rx: vec![vec![0; BUFFER_LEN]; SOCKET_COUNT as usize],
            sent: Vec::new(),
            int_asserted: false,
            hold_commands,
            edges,
        };
        state.reset();
        state
    }

    /// Return every register to its power-on value
    ///
    /// Buffer memory and the log of sent frames survive a reset.
    pub(crate) fn reset(&mut self) {
        self.common = [0; COMMON_LEN];
        self.common[0x0019] = 0x07; // RTR = 2000
        self.common[0x001A] = 0xD0;
        self.common[0x001B] = 0x08; // RCR
        for regs in self.sockets.iter_mut() {
            *regs = [0; SOCKET_REGS_LEN];
            regs[socket::SN_RXBUF_SIZE as usize] = DEFAULT_BUFFER_KB;
            regs[socket::SN_TXBUF_SIZE as usize] = DEFAULT_BUFFER_KB;
            regs[socket::SN_IMR as usize] = 0xFF;
        }
        self.int_asserted = false;
    }

    pub(crate) fn set_version(&mut self, version: u8) {
        self.version = version;
    }

    pub(crate) fn set_hold_commands(&mut self, hold: bool) {
        self.hold_commands = hold;
    }

    pub(crate) fn sent_frames(&self) -> &[Vec<u8>] {
        &self.sent
    }

    fn reg16(&self, n: usize, offset: u16) -> u16 {
        let o = offset as usize;
        u16::from_be_bytes([self.sockets[n][o], self.sockets[n][o + 1]])
    }

    fn set_reg16(&mut self, n: usize, offset: u16, value: u16) {
        let o = offset as usize;
        self.sockets[n][o..o + 2].copy_from_slice(&value.to_be_bytes());
    }

    fn tx_size(&self, n: usize) -> usize {
        buffer_bytes(self.sockets[n][socket::SN_TXBUF_SIZE as usize])
    }

    fn rx_size(&self, n: usize) -> usize {
        buffer_bytes(self.sockets[n][socket::SN_RXBUF_SIZE as usize])
    }

    fn tx_free(&self, n: usize) -> u16 {
        let used = self
            .reg16(n, socket::SN_TX_WR)
            .wrapping_sub(self.reg16(n, socket::SN_TX_RD));
        (self.tx_size(n) as u16).saturating_sub(used)
    }

    fn rx_received(&self, n: usize) -> u16 {
        self.reg16(n, socket::SN_RX_WR)
            .wrapping_sub(self.reg16(n, socket::SN_RX_RD))
    }

    /// Byte the chip shifts out for `address`
    pub(crate) fn read(&self, address: RegisterAddress) -> u8 {
        let offset = address.offset as usize;
        match address.block.kind() {
            BlockKind::Common => match address {
                common::VERSIONR => self.version,
                common::PHYCFGR => (self.common[offset] & 0xF8) | self.phy_status,
                _ => self.common.get(offset).copied().unwrap_or(0),
            },
            BlockKind::SocketRegisters(n) => {
                let n = n as usize;
                let pick = |value: u16| value.to_be_bytes()[offset & 1];
                match address.offset & !1 {
                    socket::SN_TX_FSR => pick(self.tx_free(n)),
                    socket::SN_RX_RSR => pick(self.rx_received(n)),
                    _ => self.sockets[n].get(offset).copied().unwrap_or(0),
                }
            }
            BlockKind::SocketTx(n) => {
                let size = self.tx_size(n as usize);
                if size == 0 {
                    0
                } else {
                    self.tx[n as usize][offset & (size - 1)]
                }
            }
            BlockKind::SocketRx(n) => {
                let size = self.rx_size(n as usize);
                if size == 0 {
                    0
                } else {
                    self.rx[n as usize][offset & (size - 1)]
                }
            }
            BlockKind::Reserved => 0,
        }
    }

    /// Apply one byte written by the host to `address`
    pub(crate) fn write(&mut self, address: RegisterAddress, value: u8) {
        let offset = address.offset as usize;
        match address.block.kind() {
            BlockKind::Common => match address {
                common::VERSIONR | common::SIR => {}
                common::IR => self.common[offset] &= !value,
                common::MR if value & common::Mode::RST.bits() != 0 => {
                    log::debug!("sim: software reset");
                    self.reset();
                }
                _ => {
                    if let Some(slot) = self.common.get_mut(offset) {
                        *slot = value;
                    }
                }
            },
            BlockKind::SocketRegisters(n) => {
                let n = n as usize;
                match address.offset {
                    socket::SN_CR => self.command(n, value),
                    socket::SN_IR => self.sockets[n][offset] &= !value,
                    socket::SN_SR
                    | 0x0020..=0x0023
                    | 0x0026..=0x0027
                    | 0x002A..=0x002B => {}
                    _ => {
                        if let Some(slot) = self.sockets[n].get_mut(offset) {
                            *slot = value;
                        }
                    }
                }
            }
            BlockKind::SocketTx(n) => {
                let size = self.tx_size(n as usize);
                if size != 0 {
                    self.tx[n as usize][offset & (size - 1)] = value;
                }
            }
            BlockKind::SocketRx(n) => {
                let size = self.rx_size(n as usize);
                if size != 0 {
                    self.rx[n as usize][offset & (size - 1)] = value;
                }
            }
            BlockKind::Reserved => {}
        }
        self.update_interrupt();
    }

    fn command(&mut self, n: usize, raw: u8) {
        if self.hold_commands {
            self.sockets[n][socket::SN_CR as usize] = raw;
            return;
        }
        match socket::Command::from_u8(raw) {
            Some(socket::Command::Open) => {
                let mode = self.sockets[n][socket::SN_MR as usize] & 0x0F;
                let status = match mode {
                    0x04 if n == 0 => socket::Status::MacRaw,
                    0x01 => socket::Status::Init,
                    0x02 => socket::Status::Udp,
                    _ => socket::Status::Closed,
                };
                self.sockets[n][socket::SN_SR as usize] = status as u8;
                for reg in [
                    socket::SN_TX_RD,
                    socket::SN_TX_WR,
                    socket::SN_RX_RD,
                    socket::SN_RX_WR,
                ] {
                    self.set_reg16(n, reg, 0);
                }
            }
            Some(socket::Command::Close) => {
                self.sockets[n][socket::SN_SR as usize] = socket::Status::Closed as u8;
            }
            Some(socket::Command::Send) => {
                if self.sockets[n][socket::SN_SR as usize] != socket::Status::MacRaw as u8 {
                    log::warn!("sim: SEND on socket {} which is not in MACRAW", n);
                } else {
                    let start = self.reg16(n, socket::SN_TX_RD);
                    let end = self.reg16(n, socket::SN_TX_WR);
                    let size = self.tx_size(n);
                    let len = if size == 0 {
                        0
                    } else {
                        end.wrapping_sub(start) as usize
                    };
                    let frame = (0..len)
                        .map(|i| self.tx[n][(start as usize + i) & (size - 1)])
                        .collect();
                    self.sent.push(frame);
                    self.set_reg16(n, socket::SN_TX_RD, end);
                    self.sockets[n][socket::SN_IR as usize] |= socket::Interrupt::SEND_OK.bits();
                }
            }
            Some(socket::Command::Recv) => {
                if self.rx_received(n) != 0 {
                    self.sockets[n][socket::SN_IR as usize] |= socket::Interrupt::RECV.bits();
                }
            }
            Some(other) => log::debug!("sim: ignoring {:?} on socket {}", other, n),
            None => log::warn!("sim: unknown command 0x{:02X} on socket {}", raw, n),
        }
        self.sockets[n][socket::SN_CR as usize] = 0;
    }

    /// Copy `bytes` to socket 0's RX buffer and raise RECV
    ///
    /// Returns false if the socket is not in MACRAW or the buffer is full.
    pub(crate) fn push_rx(&mut self, bytes: &[u8]) -> bool {
        if self.sockets[0][socket::SN_SR as usize] != socket::Status::MacRaw as u8 {
            return false;
        }
        let size = self.rx_size(0);
        if size.saturating_sub(self.rx_received(0) as usize) < bytes.len() {
            return false;
        }
        let mut wr = self.reg16(0, socket::SN_RX_WR);
        for &b in bytes {
            self.rx[0][wr as usize & (size - 1)] = b;
            wr = wr.wrapping_add(1);
        }
        self.set_reg16(0, socket::SN_RX_WR, wr);
        self.sockets[0][socket::SN_IR as usize] |= socket::Interrupt::RECV.bits();
        self.update_interrupt();
        true
    }

    /// Recompute SIR and INTn; a new assertion sends an edge
    fn update_interrupt(&mut self) {
        let mut sir = 0u8;
        for (n, regs) in self.sockets.iter().enumerate() {
            if regs[socket::SN_IR as usize] & regs[socket::SN_IMR as usize] != 0 {
                sir |= 1 << n;
            }
        }
        self.common[common::SIR.offset as usize] = sir;
        let asserted = sir & self.common[common::SIMR.offset as usize] != 0;
        if asserted && !self.int_asserted {
            let _ = self.edges.send(());
        }
        self.int_asserted = asserted;
    }
}

fn buffer_bytes(kb: u8) -> usize {
    match kb {
        1 | 2 | 4 | 8 | 16 => kb as usize * 1024,
        _ => 0,
    }
}
