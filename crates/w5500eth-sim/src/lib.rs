//! w5500eth-sim - In-memory W5500 model for testing
//!
//! This crate provides a simulated W5500 that sits behind the [`SpiBus`]
//! trait. It decodes the frame header of every exchange and applies the
//! payload to a register and buffer model, so the driver can be exercised
//! end to end without hardware: socket 0 MACRAW send and receive, the reset
//! pin, the interrupt pin, bus fault injection and detection of overlapping
//! exchanges.

mod chip;
mod pins;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use w5500eth_core::bus::{Segment, SpiBus};
use w5500eth_core::error::BusFault;
use w5500eth_core::regs::common;
use w5500eth_core::spi::{RegisterAddress, SpiHeader, HEADER_LEN};

use chip::ChipState;

pub use pins::{SimDelay, SimInterrupt, SimResetLine};

/// Configuration for the simulated chip
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Value returned by VERSIONR
    pub version: u8,
    /// Time every exchange spends "on the wire"
    pub exchange_latency: Option<Duration>,
    /// Largest payload accepted per exchange
    pub max_transfer_len: usize,
    /// Leave commands in Sn_CR instead of executing them
    pub hold_commands: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            version: common::CHIP_VERSION,
            exchange_latency: None,
            max_transfer_len: usize::MAX,
            hold_commands: false,
        }
    }
}

impl SimConfig {
    /// Create a configuration for a genuine W5500
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value returned by VERSIONR
    pub fn with_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// Make every exchange take `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.exchange_latency = Some(latency);
        self
    }

    /// Limit the payload of a single exchange
    pub fn with_max_transfer_len(mut self, len: usize) -> Self {
        self.max_transfer_len = len;
        self
    }
}

/// A bus fault to inject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultRule {
    /// Fault reported by the bus
    pub fault: BusFault,
    /// Only fail exchanges whose header targets this address
    pub address: Option<RegisterAddress>,
    /// Number of exchanges to fail; `None` means forever
    pub remaining: Option<usize>,
}

impl FaultRule {
    /// Fail every exchange
    pub fn always(fault: BusFault) -> Self {
        Self {
            fault,
            address: None,
            remaining: None,
        }
    }

    /// Fail exchanges targeting `address`
    pub fn at(fault: BusFault, address: RegisterAddress) -> Self {
        Self {
            fault,
            address: Some(address),
            remaining: None,
        }
    }

    /// Only fail the next `count` matching exchanges
    pub fn times(mut self, count: usize) -> Self {
        self.remaining = Some(count);
        self
    }

    fn exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

struct Inner {
    config: SimConfig,
    state: Mutex<ChipState>,
    faults: Mutex<Vec<FaultRule>>,
    in_flight: AtomicBool,
    overlaps: AtomicUsize,
    reset_events: Mutex<Vec<bool>>,
    reset_line_fails: AtomicBool,
    edges: flume::Receiver<()>,
}

/// Simulated W5500
///
/// Cloning yields another handle to the same chip, so a test can keep one
/// handle for inspection while the driver owns the other as its bus.
#[derive(Clone)]
pub struct SimW5500 {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Phase {
    Header { len: usize, bytes: [u8; HEADER_LEN] },
    Data { header: SpiHeader, cursor: RegisterAddress },
}

impl SimW5500 {
    /// Create a new simulated chip
    pub fn new(config: SimConfig) -> Self {
        let (edge_tx, edge_rx) = flume::unbounded();
        let state = ChipState::new(config.version, config.hold_commands, edge_tx);
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(state),
                faults: Mutex::new(Vec::new()),
                in_flight: AtomicBool::new(false),
                overlaps: AtomicUsize::new(0),
                reset_events: Mutex::new(Vec::new()),
                reset_line_fails: AtomicBool::new(false),
                edges: edge_rx,
            }),
        }
    }

    /// Create a simulated W5500 with the default configuration
    pub fn new_default() -> Self {
        Self::new(SimConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &SimConfig {
        &self.inner.config
    }

    /// Change the value returned by VERSIONR
    pub fn set_version(&self, version: u8) {
        lock(&self.inner.state).set_version(version);
    }

    /// Leave socket commands pending in Sn_CR (simulates a hung chip)
    pub fn set_hold_commands(&self, hold: bool) {
        lock(&self.inner.state).set_hold_commands(hold);
    }

    /// Add a fault rule
    pub fn inject_fault(&self, rule: FaultRule) {
        lock(&self.inner.faults).push(rule);
    }

    /// Remove all fault rules
    pub fn clear_faults(&self) {
        lock(&self.inner.faults).clear();
    }

    /// Make the reset pin fail when driven
    pub fn set_reset_line_fails(&self, fails: bool) {
        self.inner.reset_line_fails.store(fails, Ordering::SeqCst);
    }

    /// Read a register without going through the bus
    pub fn peek(&self, address: RegisterAddress) -> u8 {
        lock(&self.inner.state).read(address)
    }

    /// Read a big-endian 16-bit register without going through the bus
    pub fn peek16(&self, address: RegisterAddress) -> u16 {
        let state = lock(&self.inner.state);
        u16::from_be_bytes([state.read(address), state.read(address.wrapping_add(1))])
    }

    /// Deliver an Ethernet frame to socket 0 as the MACRAW engine would
    ///
    /// The frame is stored behind its 2-byte length header (which counts
    /// itself). Returns false if the socket is not open in MACRAW mode or the
    /// RX buffer has no room.
    pub fn inject_rx_frame(&self, frame: &[u8]) -> bool {
        let total = frame.len() + 2;
        let Ok(len) = u16::try_from(total) else {
            return false;
        };
        let mut bytes = Vec::with_capacity(total);
        bytes.extend_from_slice(&len.to_be_bytes());
        bytes.extend_from_slice(frame);
        lock(&self.inner.state).push_rx(&bytes)
    }

    /// Deliver raw bytes to socket 0's RX buffer (no length header added)
    pub fn inject_rx_raw(&self, bytes: &[u8]) -> bool {
        lock(&self.inner.state).push_rx(bytes)
    }

    /// Frames sent with the SEND command so far
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        lock(&self.inner.state).sent_frames().to_vec()
    }

    /// Number of exchanges that started while another was in flight
    pub fn overlaps(&self) -> usize {
        self.inner.overlaps.load(Ordering::SeqCst)
    }

    /// Values driven on the reset pin, oldest first
    pub fn reset_events(&self) -> Vec<bool> {
        lock(&self.inner.reset_events).clone()
    }

    /// Handle to the chip's RESETn pin
    pub fn reset_line(&self) -> SimResetLine {
        SimResetLine::new(self.clone())
    }

    /// Handle to the chip's INTn pin
    pub fn interrupt_line(&self) -> SimInterrupt {
        SimInterrupt::new(self.inner.edges.clone())
    }

    fn drive_reset(&self, active: bool) -> bool {
        if self.inner.reset_line_fails.load(Ordering::SeqCst) {
            return false;
        }
        lock(&self.inner.reset_events).push(active);
        if active {
            lock(&self.inner.state).reset();
        }
        true
    }

    fn check_fault(&self, address: Option<RegisterAddress>) -> Result<(), BusFault> {
        let mut faults = lock(&self.inner.faults);
        // Unaddressed rules fire before the header, addressed ones after it
        let hit = faults
            .iter_mut()
            .find(|rule| !rule.exhausted() && rule.address == address);
        match hit {
            Some(rule) => {
                if let Some(n) = rule.remaining.as_mut() {
                    *n -= 1;
                }
                Err(rule.fault)
            }
            None => Ok(()),
        }
    }

    /// Clock one byte through the model and return what the chip shifts out
    fn clock(&self, state: &mut ChipState, phase: &mut Phase, mosi: u8) -> Result<u8, BusFault> {
        match phase {
            Phase::Header { len, bytes } => {
                bytes[*len] = mosi;
                *len += 1;
                if *len == HEADER_LEN {
                    let header = SpiHeader::parse(*bytes);
                    self.check_fault(Some(header.address))?;
                    *phase = Phase::Data {
                        header,
                        cursor: header.address,
                    };
                }
                Ok(0x00)
            }
            Phase::Data { header, cursor } => {
                let miso = if header.is_write() {
                    state.write(*cursor, mosi);
                    0x00
                } else {
                    state.read(*cursor)
                };
                *cursor = cursor.wrapping_add(1);
                Ok(miso)
            }
        }
    }

    fn run(&self, segments: &mut [Segment<'_>]) -> Result<(), BusFault> {
        self.check_fault(None)?;

        let payload: usize = segments.iter().map(Segment::len).sum::<usize>();
        if payload.saturating_sub(HEADER_LEN) > self.inner.config.max_transfer_len {
            log::warn!("sim: exchange of {} bytes exceeds bus limit", payload);
            return Err(BusFault::Fault);
        }

        // Fault rules are checked on the header before any payload byte is
        // applied, so a failed exchange has no side effects.
        let mut state = lock(&self.inner.state);
        let mut phase = Phase::Header {
            len: 0,
            bytes: [0; HEADER_LEN],
        };
        for segment in segments.iter_mut() {
            match segment {
                Segment::Write(tx) => {
                    for &b in tx.iter() {
                        self.clock(&mut state, &mut phase, b)?;
                    }
                }
                Segment::Read(rx) => {
                    for slot in rx.iter_mut() {
                        *slot = self.clock(&mut state, &mut phase, 0x00)?;
                    }
                }
                Segment::Transfer { tx, rx } => {
                    for i in 0..tx.len().max(rx.len()) {
                        let out = self.clock(&mut state, &mut phase, tx.get(i).copied().unwrap_or(0))?;
                        if let Some(slot) = rx.get_mut(i) {
                            *slot = out;
                        }
                    }
                }
            }
        }
        if let Phase::Header { len, .. } = phase {
            if len != 0 {
                log::warn!("sim: exchange ended inside the header ({} bytes)", len);
            }
        }
        Ok(())
    }
}

impl SpiBus for SimW5500 {
    fn exchange(&mut self, segments: &mut [Segment<'_>]) -> Result<(), BusFault> {
        if self.inner.in_flight.swap(true, Ordering::SeqCst) {
            log::error!("sim: overlapping bus exchange");
            self.inner.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if let Some(latency) = self.inner.config.exchange_latency {
            std::thread::sleep(latency);
        }
        let result = self.run(segments);
        self.inner.in_flight.store(false, Ordering::SeqCst);
        result
    }

    fn max_transfer_len(&self) -> usize {
        self.inner.config.max_transfer_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use w5500eth_core::regs::socket;
    use w5500eth_core::transport::RegisterTransport;

    fn open_macraw(t: &mut RegisterTransport<SimW5500>) {
        t.write8(socket::reg(0, socket::SN_TXBUF_SIZE), 16).unwrap();
        t.write8(socket::reg(0, socket::SN_RXBUF_SIZE), 16).unwrap();
        t.write8(socket::reg(0, socket::SN_MR), 0x04).unwrap();
        t.write8(socket::reg(0, socket::SN_CR), socket::Command::Open as u8)
            .unwrap();
    }

    #[test]
    fn test_read_version() {
        let mut t = RegisterTransport::new(SimW5500::new_default());
        assert_eq!(t.read8(common::VERSIONR).unwrap(), 0x04);

        let sim = SimW5500::new(SimConfig::new().with_version(0x05));
        let mut t = RegisterTransport::new(sim);
        assert_eq!(t.read8(common::VERSIONR).unwrap(), 0x05);
    }

    #[test]
    fn test_write_then_read() {
        let mut t = RegisterTransport::new(SimW5500::new_default());
        t.write8(common::SIMR, 0x01).unwrap();
        assert_eq!(t.read8(common::SIMR).unwrap(), 0x01);

        let mac = [0x02, 0x00, 0x5E, 0x10, 0x20, 0x30];
        t.write_bulk(common::SHAR, &mac).unwrap();
        assert_eq!(t.read_bulk(common::SHAR, 6).unwrap(), mac);
    }

    #[test]
    fn test_versionr_is_read_only() {
        let mut t = RegisterTransport::new(SimW5500::new_default());
        t.write8(common::VERSIONR, 0x99).unwrap();
        assert_eq!(t.read8(common::VERSIONR).unwrap(), 0x04);
    }

    #[test]
    fn test_macraw_open_and_send() {
        let sim = SimW5500::new_default();
        let mut t = RegisterTransport::new(sim.clone());
        open_macraw(&mut t);
        assert_eq!(
            t.read8(socket::reg(0, socket::SN_SR)).unwrap(),
            socket::Status::MacRaw as u8
        );
        assert_eq!(t.read8(socket::reg(0, socket::SN_CR)).unwrap(), 0);
        assert_eq!(t.read16(socket::reg(0, socket::SN_TX_FSR)).unwrap(), 16 * 1024);

        let frame = [0xAAu8; 60];
        t.write_bulk(socket::tx_buffer(0, 0), &frame).unwrap();
        t.write16(socket::reg(0, socket::SN_TX_WR), 60).unwrap();
        t.write8(socket::reg(0, socket::SN_CR), socket::Command::Send as u8)
            .unwrap();

        assert_eq!(sim.sent_frames(), vec![frame.to_vec()]);
        let ir = t.read8(socket::reg(0, socket::SN_IR)).unwrap();
        assert_ne!(ir & socket::Interrupt::SEND_OK.bits(), 0);
        t.write8(socket::reg(0, socket::SN_IR), ir).unwrap();
        assert_eq!(t.read8(socket::reg(0, socket::SN_IR)).unwrap(), 0);
    }

    #[test]
    fn test_inject_rx_frame() {
        let sim = SimW5500::new_default();
        let mut t = RegisterTransport::new(sim.clone());
        assert!(!sim.inject_rx_frame(&[1, 2, 3]));

        open_macraw(&mut t);
        assert!(sim.inject_rx_frame(&[1, 2, 3]));
        assert_eq!(t.read16(socket::reg(0, socket::SN_RX_RSR)).unwrap(), 5);
        assert_eq!(
            t.read_bulk(socket::rx_buffer(0, 0), 5).unwrap(),
            vec![0x00, 0x05, 1, 2, 3]
        );
    }

    #[test]
    fn test_interrupt_edge_requires_mask() {
        let sim = SimW5500::new_default();
        let mut t = RegisterTransport::new(sim.clone());
        let mut irq = sim.interrupt_line();
        open_macraw(&mut t);

        assert!(sim.inject_rx_frame(&[0; 14]));
        assert!(!w5500eth_core::gpio::InterruptSource::wait_edge(
            &mut irq,
            Duration::from_millis(1)
        )
        .unwrap());

        // Unmasking while RECV is pending asserts INTn
        t.write8(common::SIMR, 0x01).unwrap();
        assert!(w5500eth_core::gpio::InterruptSource::wait_edge(
            &mut irq,
            Duration::from_millis(1)
        )
        .unwrap());
    }

    #[test]
    fn test_fault_injection() {
        let sim = SimW5500::new_default();
        let mut t = RegisterTransport::new(sim.clone());
        sim.inject_fault(FaultRule::at(BusFault::Timeout, common::VERSIONR).times(1));

        let err = t.read8(common::VERSIONR).unwrap_err();
        assert_eq!(err.fault, BusFault::Timeout);
        assert_eq!(t.read8(common::VERSIONR).unwrap(), 0x04);

        sim.inject_fault(FaultRule::always(BusFault::NoResponse));
        assert_eq!(t.read8(common::MR).unwrap_err().fault, BusFault::NoResponse);
        sim.clear_faults();
        assert!(t.read8(common::MR).is_ok());
    }

    #[test]
    fn test_failed_write_has_no_effect() {
        let sim = SimW5500::new_default();
        let mut t = RegisterTransport::new(sim.clone());
        sim.inject_fault(FaultRule::at(BusFault::Fault, common::SIMR));
        assert!(t.write8(common::SIMR, 0xFF).is_err());
        assert_eq!(sim.peek(common::SIMR), 0);
    }

    #[test]
    fn test_max_transfer_len_enforced() {
        let sim = SimW5500::new(SimConfig::new().with_max_transfer_len(4));
        let mut bus = sim.clone();
        let header = SpiHeader::write(common::SHAR).to_bytes();
        let data = [0u8; 6];
        assert_eq!(
            bus.exchange(&mut [Segment::Write(&header), Segment::Write(&data)]),
            Err(BusFault::Fault)
        );

        // The transport splits the write to fit
        let mut t = RegisterTransport::new(sim);
        t.write_bulk(common::SHAR, &[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(t.read_bulk(common::SHAR, 6).unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }
}
