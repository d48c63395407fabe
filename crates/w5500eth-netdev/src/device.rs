//! Per-chip device context and bring-up state machine

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use w5500eth_core::bus::SpiBus;
use w5500eth_core::error::ResetError;
use w5500eth_core::gpio::{InterruptSource, ResetLine};
use w5500eth_core::regs::common::{self, PhyStatus};
use w5500eth_core::reset::{hardware_reset, Delay, StdDelay};
use w5500eth_core::transport::RegisterTransport;

use crate::config::DeviceConfig;
use crate::error::{IdentityMismatch, NetdevError, Result};
use crate::frame::{OutboundFrame, TxResult, ETH_MTU, IFACE_MTU};
use crate::irq::{IrqGate, IrqThreads};
use crate::macraw;
use crate::stack::{InterfaceInfo, NetStack};
use crate::state::{LinkState, StateLog, Transition};
use crate::stats::{Stats, StatsSnapshot};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Optional board resources around the chip
///
/// A missing reset line means bring-up skips the hardware reset; a missing
/// interrupt line means frames are never received asynchronously.
pub struct Resources {
    reset_line: Option<Box<dyn ResetLine + Send>>,
    irq_line: Option<Box<dyn InterruptSource + Send>>,
    delay: Box<dyn Delay + Send>,
}

impl Default for Resources {
    fn default() -> Self {
        Self {
            reset_line: None,
            irq_line: None,
            delay: Box::new(StdDelay),
        }
    }
}

impl Resources {
    /// No reset line, no interrupt line, real sleeps
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `line` to reset the chip during bring-up
    pub fn with_reset_line(mut self, line: impl ResetLine + Send + 'static) -> Self {
        self.reset_line = Some(Box::new(line));
        self
    }

    /// Use `line` for receive notifications
    pub fn with_irq_line(mut self, line: impl InterruptSource + Send + 'static) -> Self {
        self.irq_line = Some(Box::new(line));
        self
    }

    /// Replace the delay used by the reset sequence
    pub fn with_delay(mut self, delay: impl Delay + Send + 'static) -> Self {
        self.delay = Box::new(delay);
        self
    }
}

/// State shared with the interrupt threads
pub(crate) struct Shared<B> {
    /// All register traffic goes through this lock
    pub(crate) bus: Mutex<Option<RegisterTransport<B>>>,
    pub(crate) stats: Stats,
    pub(crate) stack: Arc<dyn NetStack>,
    pub(crate) gate: IrqGate,
    pub(crate) shutdown: AtomicBool,
    pub(crate) config: DeviceConfig,
}

/// One W5500 network device
///
/// Created in [`LinkState::Uninitialized`]; [`bring_up`](Self::bring_up)
/// walks it to `Ready`. Dropping the context tears it down.
pub struct DeviceContext<B: SpiBus + Send + 'static> {
    shared: Arc<Shared<B>>,
    state: Mutex<StateLog>,
    resources: Mutex<Resources>,
    threads: Mutex<Option<IrqThreads>>,
    identity: Mutex<Option<IdentityMismatch>>,
    registered: AtomicBool,
    torn_down: AtomicBool,
}

impl<B: SpiBus + Send + 'static> DeviceContext<B> {
    /// Take ownership of the bus and resources
    pub fn new(
        bus: B,
        config: DeviceConfig,
        resources: Resources,
        stack: Arc<dyn NetStack>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                bus: Mutex::new(Some(RegisterTransport::new(bus))),
                stats: Stats::default(),
                stack,
                gate: IrqGate::default(),
                shutdown: AtomicBool::new(false),
                config,
            }),
            state: Mutex::new(StateLog::default()),
            resources: Mutex::new(resources),
            threads: Mutex::new(None),
            identity: Mutex::new(None),
            registered: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Device configuration
    pub fn config(&self) -> &DeviceConfig {
        &self.shared.config
    }

    /// Current link state
    pub fn link_state(&self) -> LinkState {
        lock(&self.state).current()
    }

    /// Every state change so far, oldest first
    pub fn transitions(&self) -> Vec<Transition> {
        lock(&self.state).history().to_vec()
    }

    /// The unexpected VERSIONR value seen during bring-up, if any
    pub fn identity_mismatch(&self) -> Option<IdentityMismatch> {
        *lock(&self.identity)
    }

    /// Counter snapshot
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Read the PHY status bits of PHYCFGR
    pub fn phy_status(&self) -> Result<PhyStatus> {
        let mut guard = lock(&self.shared.bus);
        let transport = guard.as_mut().ok_or(NetdevError::TornDown)?;
        Ok(PhyStatus::from_phycfgr(transport.read8(common::PHYCFGR)?))
    }

    fn transition(&self, next: LinkState) {
        let mut state = lock(&self.state);
        let current = state.current();
        if state.advance(next) {
            log::debug!("w5500: {}: {} -> {}", self.shared.config.name, current, next);
        } else {
            log::error!(
                "w5500: {}: refusing transition {} -> {}",
                self.shared.config.name,
                current,
                next
            );
        }
    }

    /// Reset the chip, verify it, configure the data path and register
    ///
    /// Any fatal error moves the device to `Failed` and releases everything
    /// it holds before the error is returned.
    pub fn bring_up(&mut self) -> Result<()> {
        let state = self.link_state();
        if state != LinkState::Uninitialized {
            return Err(NetdevError::AlreadyStarted(state));
        }
        log::info!("w5500: {}: bringing up", self.shared.config.name);

        match self.run_bring_up() {
            Ok(()) => {
                log::info!("w5500: {}: ready", self.shared.config.name);
                Ok(())
            }
            Err(e) => {
                log::error!("w5500: {}: bring-up failed: {}", self.shared.config.name, e);
                self.transition(LinkState::Failed);
                self.teardown();
                Err(e)
            }
        }
    }

    fn run_bring_up(&mut self) -> Result<()> {
        let has_reset = lock(&self.resources).reset_line.is_some();
        if has_reset {
            self.transition(LinkState::Resetting);
            let mut guard = lock(&self.resources);
            let resources = &mut *guard;
            match hardware_reset(resources.reset_line.as_deref_mut(), resources.delay.as_mut()) {
                Ok(()) => {}
                Err(ResetError::Unavailable) => {
                    log::info!("w5500: no reset line, continuing without reset");
                }
                Err(e) => return Err(NetdevError::Reset(e)),
            }
        } else {
            log::info!("w5500: no reset line, continuing without reset");
        }

        self.transition(LinkState::Verifying);
        let has_irq = lock(&self.resources).irq_line.is_some();
        {
            let mut guard = lock(&self.shared.bus);
            let transport = guard.as_mut().ok_or(NetdevError::TornDown)?;

            let version = transport.read8(common::VERSIONR)?;
            if version == common::CHIP_VERSION {
                log::info!("w5500: VERSIONR = 0x{:02X} (OK)", version);
            } else {
                let mismatch = IdentityMismatch {
                    found: version,
                    expected: common::CHIP_VERSION,
                };
                log::warn!("w5500: {}", mismatch);
                *lock(&self.identity) = Some(mismatch);
            }

            macraw::configure(transport, &self.shared.config, has_irq)?;
        }

        self.transition(LinkState::Ready);

        let info = InterfaceInfo {
            name: self.shared.config.name.clone(),
            mac: self.shared.config.mac,
            mtu: IFACE_MTU,
        };
        self.shared
            .stack
            .register(&info)
            .map_err(|source| NetdevError::AllocationFailure {
                what: "network interface registration",
                source,
            })?;
        self.registered.store(true, Ordering::SeqCst);

        let irq_line = lock(&self.resources).irq_line.take();
        match irq_line {
            Some(line) => {
                let threads = IrqThreads::spawn(&self.shared, line)?;
                *lock(&self.threads) = Some(threads);
            }
            None => log::warn!("w5500: no IRQ line, frames will not be received"),
        }

        Ok(())
    }

    /// Start accepting frames and delivering receive notifications
    pub fn open(&self) -> Result<()> {
        let state = self.link_state();
        if state != LinkState::Ready || self.torn_down.load(Ordering::SeqCst) {
            return Err(NetdevError::NotReady(state));
        }
        if self.shared.gate.open() {
            if let Some(threads) = lock(&self.threads).as_ref() {
                threads.kick();
            }
        }
        self.shared.stack.wake_queue();
        log::debug!("w5500: {}: opened", self.shared.config.name);
        Ok(())
    }

    /// Stop delivering receive notifications and stop the TX queue
    pub fn close(&self) {
        self.shared.gate.close();
        self.shared.stack.stop_queue();
        log::debug!("w5500: {}: closed", self.shared.config.name);
    }

    /// Send one frame
    ///
    /// Never blocks indefinitely. Only `Refused` leaves the frame with the
    /// caller; every other result means the frame was consumed. Frames are
    /// refused until `open()` and again after `close()`.
    pub fn transmit(&self, frame: OutboundFrame) -> TxResult {
        if self.link_state() != LinkState::Ready
            || self.torn_down.load(Ordering::SeqCst)
            || !self.shared.gate.is_open()
        {
            return TxResult::Refused(frame);
        }

        if frame.is_empty() || frame.len() > ETH_MTU {
            log::debug!("w5500: dropping {} byte frame", frame.len());
            self.shared.stats.record_drop();
            return TxResult::Dropped;
        }

        let result = {
            let mut guard = lock(&self.shared.bus);
            // Teardown released the bus after the checks above
            let Some(transport) = guard.as_mut() else {
                return TxResult::Refused(frame);
            };
            macraw::send(transport, frame.as_slice(), &self.shared.config)
        };

        match result {
            Ok(()) => {
                self.shared.stats.record_tx(frame.len());
                TxResult::Sent
            }
            Err(e) => {
                log::warn!("w5500: transmit failed: {}", e);
                self.shared.stats.record_tx_error();
                // Pause/resume hook: the queue is restarted straight away
                self.shared.stack.stop_queue();
                self.shared.stack.wake_queue();
                TxResult::Errored
            }
        }
    }

    /// Release everything the device holds
    ///
    /// Safe to call any number of times from any state; only the first call
    /// does anything. Waits for an in-flight register transaction before
    /// the bus is released.
    pub fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        log::debug!("w5500: {}: tearing down", self.shared.config.name);

        self.shared.gate.close();
        self.shared.shutdown.store(true, Ordering::SeqCst);
        let threads = lock(&self.threads).take();
        if let Some(threads) = threads {
            threads.stop();
        }

        if self.registered.swap(false, Ordering::SeqCst) {
            self.shared.stack.unregister(&self.shared.config.name);
        }

        drop(lock(&self.shared.bus).take());

        let mut resources = lock(&self.resources);
        resources.reset_line = None;
        resources.irq_line = None;
    }
}

impl<B: SpiBus + Send + 'static> Drop for DeviceContext<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackError;
    use crate::frame::{ETH_HEADER_LEN, MAX_RX_FRAME};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use w5500eth_core::error::BusFault;
    use w5500eth_core::regs::socket;
    use w5500eth_sim::{FaultRule, SimConfig, SimDelay, SimW5500};

    #[derive(Default)]
    struct RecordingStack {
        registered: AtomicUsize,
        unregistered: AtomicUsize,
        stops: AtomicUsize,
        wakes: AtomicUsize,
        refuse: AtomicBool,
        info: Mutex<Option<InterfaceInfo>>,
        frames: Mutex<Vec<Vec<u8>>>,
    }

    impl RecordingStack {
        fn wait_frames(&self, count: usize) -> Vec<Vec<u8>> {
            for _ in 0..200 {
                let frames = lock(&self.frames);
                if frames.len() >= count {
                    return frames.clone();
                }
                drop(frames);
                std::thread::sleep(Duration::from_millis(5));
            }
            lock(&self.frames).clone()
        }
    }

    impl NetStack for RecordingStack {
        fn register(&self, info: &InterfaceInfo) -> std::result::Result<(), StackError> {
            if self.refuse.load(Ordering::SeqCst) {
                return Err("refused".into());
            }
            *lock(&self.info) = Some(info.clone());
            self.registered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn unregister(&self, _name: &str) {
            self.unregistered.fetch_add(1, Ordering::SeqCst);
        }

        fn receive(&self, frame: Vec<u8>) {
            lock(&self.frames).push(frame);
        }

        fn stop_queue(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn wake_queue(&self) {
            self.wakes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_config() -> DeviceConfig {
        DeviceConfig::default().with_irq_poll_interval(Duration::from_millis(5))
    }

    fn device(
        sim: &SimW5500,
        resources: Resources,
    ) -> (DeviceContext<SimW5500>, Arc<RecordingStack>) {
        let stack = Arc::new(RecordingStack::default());
        let dev = DeviceContext::new(sim.clone(), test_config(), resources, stack.clone());
        (dev, stack)
    }

    fn ready_device(sim: &SimW5500) -> (DeviceContext<SimW5500>, Arc<RecordingStack>) {
        let (mut dev, stack) = device(sim, Resources::new().with_irq_line(sim.interrupt_line()));
        dev.bring_up().unwrap();
        (dev, stack)
    }

    fn opened_device(sim: &SimW5500) -> (DeviceContext<SimW5500>, Arc<RecordingStack>) {
        let (dev, stack) = ready_device(sim);
        dev.open().unwrap();
        (dev, stack)
    }

    fn eth_frame(len: usize, fill: u8) -> Vec<u8> {
        let mut frame = vec![fill; len];
        frame[..6].copy_from_slice(&[0xFF; 6]);
        frame
    }

    #[test]
    fn test_bring_up_without_reset_line() {
        let sim = SimW5500::new_default();
        let (mut dev, stack) = device(&sim, Resources::new());
        assert_eq!(dev.link_state(), LinkState::Uninitialized);

        dev.bring_up().unwrap();

        assert_eq!(dev.link_state(), LinkState::Ready);
        assert_eq!(
            dev.transitions(),
            vec![
                Transition {
                    from: LinkState::Uninitialized,
                    to: LinkState::Verifying
                },
                Transition {
                    from: LinkState::Verifying,
                    to: LinkState::Ready
                },
            ]
        );
        assert!(sim.reset_events().is_empty());
        assert_eq!(stack.registered.load(Ordering::SeqCst), 1);
        assert_eq!(dev.identity_mismatch(), None);
    }

    #[test]
    fn test_bring_up_with_reset_line() {
        let sim = SimW5500::new_default();
        let delay = SimDelay::new();
        let (mut dev, _stack) = device(
            &sim,
            Resources::new()
                .with_reset_line(sim.reset_line())
                .with_delay(delay.clone()),
        );

        dev.bring_up().unwrap();

        assert_eq!(sim.reset_events(), vec![true, false]);
        assert_eq!(delay.recorded(), vec![10, 100]);
        let states: Vec<LinkState> = dev.transitions().iter().map(|t| t.to).collect();
        assert_eq!(
            states,
            vec![LinkState::Resetting, LinkState::Verifying, LinkState::Ready]
        );
    }

    #[test]
    fn test_reset_line_failure_is_fatal() {
        let sim = SimW5500::new_default();
        sim.set_reset_line_fails(true);
        let (mut dev, stack) = device(
            &sim,
            Resources::new()
                .with_reset_line(sim.reset_line())
                .with_delay(SimDelay::new()),
        );

        let err = dev.bring_up().unwrap_err();
        assert!(matches!(err, NetdevError::Reset(_)));
        assert_eq!(dev.link_state(), LinkState::Failed);
        assert_eq!(stack.registered.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_identity_mismatch_is_a_warning() {
        let sim = SimW5500::new(SimConfig::new().with_version(0x05));
        let (mut dev, stack) = device(&sim, Resources::new());

        dev.bring_up().unwrap();

        assert_eq!(dev.link_state(), LinkState::Ready);
        assert_eq!(
            dev.identity_mismatch(),
            Some(IdentityMismatch {
                found: 0x05,
                expected: 0x04
            })
        );
        assert_eq!(stack.registered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_identity_read_failure() {
        let sim = SimW5500::new_default();
        sim.inject_fault(FaultRule::at(BusFault::Timeout, common::VERSIONR));
        let (mut dev, stack) = device(&sim, Resources::new());

        let err = dev.bring_up().unwrap_err();

        assert!(matches!(err, NetdevError::Transport(e) if e.fault == BusFault::Timeout));
        assert_eq!(dev.link_state(), LinkState::Failed);
        assert_eq!(stack.registered.load(Ordering::SeqCst), 0);
        assert_eq!(stack.unregistered.load(Ordering::SeqCst), 0);
        assert!(matches!(
            dev.transmit(OutboundFrame::new(eth_frame(60, 0))),
            TxResult::Refused(_)
        ));
    }

    #[test]
    fn test_socket_that_never_opens() {
        let sim = SimW5500::new_default();
        sim.set_hold_commands(true);
        let (mut dev, stack) = device(&sim, Resources::new());

        let err = dev.bring_up().unwrap_err();
        assert!(matches!(err, NetdevError::CommandTimeout { command: 0x01 }));
        assert_eq!(dev.link_state(), LinkState::Failed);
        assert_eq!(stack.registered.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_registration_refused() {
        let sim = SimW5500::new_default();
        let (mut dev, stack) = device(&sim, Resources::new().with_irq_line(sim.interrupt_line()));
        stack.refuse.store(true, Ordering::SeqCst);

        let err = dev.bring_up().unwrap_err();
        assert!(matches!(err, NetdevError::AllocationFailure { .. }));
        assert_eq!(dev.link_state(), LinkState::Failed);
        assert_eq!(stack.unregistered.load(Ordering::SeqCst), 0);
        // Teardown already ran as part of the failure
        assert!(lock(&dev.shared.bus).is_none());
    }

    #[test]
    fn test_bring_up_only_once() {
        let sim = SimW5500::new_default();
        let (mut dev, _stack) = ready_device(&sim);
        assert!(matches!(
            dev.bring_up(),
            Err(NetdevError::AlreadyStarted(LinkState::Ready))
        ));
    }

    #[test]
    fn test_teardown_twice() {
        let sim = SimW5500::new_default();
        let (dev, stack) = ready_device(&sim);

        dev.teardown();
        dev.teardown();
        drop(dev);

        assert_eq!(stack.registered.load(Ordering::SeqCst), 1);
        assert_eq!(stack.unregistered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transmit_refused_before_bring_up() {
        let sim = SimW5500::new_default();
        let (dev, _stack) = device(&sim, Resources::new());
        let frame = OutboundFrame::new(eth_frame(60, 0xAB));

        match dev.transmit(frame.clone()) {
            TxResult::Refused(returned) => assert_eq!(returned, frame),
            other => panic!("expected Refused, got {:?}", other),
        }
        assert!(sim.sent_frames().is_empty());
    }

    #[test]
    fn test_transmit_mtu_boundary() {
        let sim = SimW5500::new_default();
        let (dev, _stack) = opened_device(&sim);

        assert_eq!(dev.transmit(OutboundFrame::new(eth_frame(1500, 1))), TxResult::Sent);
        let stats = dev.stats();
        assert_eq!(stats.frames_transmitted, 1);
        assert_eq!(stats.bytes_transmitted, 1500);

        assert_eq!(dev.transmit(OutboundFrame::new(eth_frame(1501, 2))), TxResult::Dropped);
        let stats = dev.stats();
        assert_eq!(stats.frames_dropped, 1);
        assert_eq!(stats.frames_transmitted, 1);
        assert_eq!(sim.sent_frames().len(), 1);
    }

    #[test]
    fn test_transmit_empty_frame_dropped() {
        let sim = SimW5500::new_default();
        let (dev, _stack) = opened_device(&sim);
        assert_eq!(dev.transmit(OutboundFrame::new(Vec::new())), TxResult::Dropped);
        assert_eq!(dev.stats().frames_dropped, 1);
    }

    #[test]
    fn test_transmit_lands_byte_exact() {
        let sim = SimW5500::new_default();
        let (dev, _stack) = opened_device(&sim);
        let first: Vec<u8> = (0..100u8).collect();
        let second = eth_frame(64, 0x5A);

        assert_eq!(dev.transmit(OutboundFrame::new(first.clone())), TxResult::Sent);
        assert_eq!(dev.transmit(OutboundFrame::new(second.clone())), TxResult::Sent);

        assert_eq!(sim.sent_frames(), vec![first, second]);
    }

    #[test]
    fn test_transmit_bus_failure() {
        let sim = SimW5500::new_default();
        let (dev, stack) = opened_device(&sim);
        let stops = stack.stops.load(Ordering::SeqCst);
        let wakes = stack.wakes.load(Ordering::SeqCst);
        sim.inject_fault(FaultRule::at(BusFault::Fault, socket::reg(0, socket::SN_TX_FSR)).times(1));

        assert_eq!(dev.transmit(OutboundFrame::new(eth_frame(60, 0))), TxResult::Errored);

        let stats = dev.stats();
        assert_eq!(stats.transmit_errors, 1);
        assert_eq!(stats.frames_transmitted, 0);
        assert_eq!(stack.stops.load(Ordering::SeqCst), stops + 1);
        assert_eq!(stack.wakes.load(Ordering::SeqCst), wakes + 1);

        // The next frame goes through
        assert_eq!(dev.transmit(OutboundFrame::new(eth_frame(60, 0))), TxResult::Sent);
    }

    #[test]
    fn test_concurrent_transmits_never_overlap() {
        let sim = SimW5500::new(SimConfig::new().with_latency(Duration::from_micros(200)));
        let (dev, _stack) = opened_device(&sim);

        std::thread::scope(|s| {
            for fill in [0x11u8, 0x22] {
                let dev = &dev;
                s.spawn(move || {
                    for _ in 0..10 {
                        assert_eq!(dev.transmit(OutboundFrame::new(eth_frame(200, fill))), TxResult::Sent);
                    }
                });
            }
        });

        assert_eq!(sim.overlaps(), 0);
        assert_eq!(dev.stats().frames_transmitted, 20);
        for frame in sim.sent_frames() {
            assert!(frame[6..].iter().all(|&b| b == frame[6]));
        }
    }

    #[test]
    fn test_rx_frame_delivered_after_interrupt() {
        let sim = SimW5500::new_default();
        let (dev, stack) = ready_device(&sim);
        dev.open().unwrap();

        let frame = eth_frame(60, 0x42);
        assert!(sim.inject_rx_frame(&frame));

        assert_eq!(stack.wait_frames(1), vec![frame]);
        let stats = dev.stats();
        assert_eq!(stats.frames_received, 1);
        assert_eq!(stats.bytes_received, 60);
        assert!(stats.interrupts >= 1);
    }

    #[test]
    fn test_rx_edges_while_closed_are_replayed_on_open() {
        let sim = SimW5500::new_default();
        let (dev, stack) = ready_device(&sim);

        let frame = eth_frame(MAX_RX_FRAME, 0x17);
        assert!(sim.inject_rx_frame(&frame));
        std::thread::sleep(Duration::from_millis(20));
        assert!(lock(&stack.frames).is_empty());

        dev.open().unwrap();
        assert_eq!(stack.wait_frames(1), vec![frame]);
    }

    #[test]
    fn test_rx_malformed_header_counted() {
        let sim = SimW5500::new_default();
        let (dev, stack) = ready_device(&sim);
        dev.open().unwrap();

        assert!(sim.inject_rx_raw(&[0x00, 0x01, 0xDE, 0xAD]));
        for _ in 0..200 {
            if dev.stats().receive_errors > 0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(dev.stats().receive_errors, 1);
        assert_eq!(sim.peek16(socket::reg(0, socket::SN_RX_RSR)), 0);

        // The socket keeps working afterwards
        let frame = eth_frame(60, 0x01);
        assert!(sim.inject_rx_frame(&frame));
        assert_eq!(stack.wait_frames(1), vec![frame]);
    }

    #[test]
    fn test_open_requires_ready() {
        let sim = SimW5500::new_default();
        let (dev, _stack) = device(&sim, Resources::new());
        assert!(matches!(
            dev.open(),
            Err(NetdevError::NotReady(LinkState::Uninitialized))
        ));
    }

    #[test]
    fn test_phy_status() {
        let sim = SimW5500::new_default();
        let (dev, _stack) = ready_device(&sim);
        let phy = dev.phy_status().unwrap();
        assert!(phy.link_up());
        assert!(phy.contains(PhyStatus::SPD | PhyStatus::DPX));

        dev.teardown();
        assert!(matches!(dev.phy_status(), Err(NetdevError::TornDown)));
    }

    #[test]
    fn test_transmit_refused_after_teardown() {
        let sim = SimW5500::new_default();
        let (dev, _stack) = opened_device(&sim);
        dev.teardown();
        assert!(matches!(
            dev.transmit(OutboundFrame::new(eth_frame(60, 0))),
            TxResult::Refused(_)
        ));
    }

    #[test]
    fn test_advertised_mtu_frame_is_sent() {
        let sim = SimW5500::new_default();
        let (dev, stack) = opened_device(&sim);
        let mtu = lock(&stack.info).as_ref().map(|info| info.mtu).unwrap();
        assert_eq!(mtu, IFACE_MTU);

        let full = eth_frame(mtu + ETH_HEADER_LEN, 0x33);
        assert_eq!(dev.transmit(OutboundFrame::new(full.clone())), TxResult::Sent);
        assert_eq!(
            dev.transmit(OutboundFrame::new(eth_frame(mtu + ETH_HEADER_LEN + 1, 0x34))),
            TxResult::Dropped
        );

        assert_eq!(sim.sent_frames(), vec![full]);
        let stats = dev.stats();
        assert_eq!(stats.frames_transmitted, 1);
        assert_eq!(stats.frames_dropped, 1);
    }

    #[test]
    fn test_transmit_refused_while_closed() {
        let sim = SimW5500::new_default();
        let (dev, _stack) = ready_device(&sim);
        let frame = OutboundFrame::new(eth_frame(60, 0x21));

        // Ready but never opened
        assert!(matches!(dev.transmit(frame.clone()), TxResult::Refused(_)));

        dev.open().unwrap();
        assert_eq!(dev.transmit(frame.clone()), TxResult::Sent);

        dev.close();
        match dev.transmit(frame.clone()) {
            TxResult::Refused(returned) => assert_eq!(returned, frame),
            other => panic!("expected Refused, got {:?}", other),
        }

        dev.open().unwrap();
        assert_eq!(dev.transmit(frame), TxResult::Sent);
        assert_eq!(sim.sent_frames().len(), 2);
        assert_eq!(dev.stats().frames_dropped, 0);
    }

    #[test]
    fn test_identity_checked_on_every_bring_up() {
        let sim = SimW5500::new_default();
        let (first, _stack) = ready_device(&sim);
        assert_eq!(first.identity_mismatch(), None);
        drop(first);

        // Same bus, different silicon answering
        sim.set_version(0x00);
        let (second, stack) = ready_device(&sim);
        assert_eq!(second.link_state(), LinkState::Ready);
        assert_eq!(
            second.identity_mismatch(),
            Some(IdentityMismatch {
                found: 0x00,
                expected: common::CHIP_VERSION
            })
        );
        assert_eq!(stack.registered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_teardown_during_transmit() {
        let sim = SimW5500::new(SimConfig::new().with_latency(Duration::from_millis(2)));
        let (dev, stack) = opened_device(&sim);

        let results = std::thread::scope(|s| {
            let sender = s.spawn(|| {
                let mut results = Vec::new();
                for _ in 0..10_000 {
                    let result = dev.transmit(OutboundFrame::new(eth_frame(120, 0x66)));
                    let refused = matches!(result, TxResult::Refused(_));
                    results.push(result);
                    if refused {
                        break;
                    }
                }
                results
            });

            for _ in 0..2000 {
                if dev.stats().frames_transmitted > 0 {
                    break;
                }
                std::thread::sleep(Duration::from_millis(1));
            }
            dev.teardown();
            sender.join().unwrap()
        });

        let (sent, rest) = results.split_at(results.len() - 1);
        assert!(!sent.is_empty());
        assert!(sent.iter().all(|r| *r == TxResult::Sent));
        assert!(matches!(rest, [TxResult::Refused(_)]));

        assert_eq!(sim.overlaps(), 0);
        assert_eq!(sim.sent_frames().len(), sent.len());
        let stats = dev.stats();
        assert_eq!(stats.frames_transmitted, sent.len() as u64);
        assert_eq!(stats.transmit_errors, 0);
        assert_eq!(stack.unregistered.load(Ordering::SeqCst), 1);
        assert!(matches!(
            dev.transmit(OutboundFrame::new(eth_frame(60, 0))),
            TxResult::Refused(_)
        ));
    }
}
