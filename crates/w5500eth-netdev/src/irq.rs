//! Interrupt delivery
//!
//! The listener thread stands in for a hard interrupt handler: it waits for
//! INTn edges and, for each one, only flips atomics and does a non-blocking
//! send to the worker. The worker does the bus work. Delivery is disabled
//! from the moment an edge is handed over until the worker has finished
//! draining; edges that arrive in between are latched and replayed when
//! delivery is re-armed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use w5500eth_core::bus::SpiBus;
use w5500eth_core::gpio::InterruptSource;

use crate::device::Shared;
use crate::error::{NetdevError, Result};
use crate::rx;

/// Enable/disable state of interrupt delivery
#[derive(Debug, Default)]
pub(crate) struct IrqGate {
    /// Interface is open
    opened: AtomicBool,
    /// An edge may be handed to the worker right now
    armed: AtomicBool,
    /// An edge arrived while not armed
    missed: AtomicBool,
}

impl IrqGate {
    /// Called for every edge; returns true if the edge should go to the
    /// worker, which also disarms the gate
    pub(crate) fn on_edge(&self) -> bool {
        if self.armed.swap(false, Ordering::SeqCst) {
            true
        } else {
            self.missed.store(true, Ordering::SeqCst);
            false
        }
    }

    /// Re-enable delivery; returns true if a latched edge must be replayed
    ///
    /// A replay leaves the gate disarmed, exactly like a fresh delivery.
    pub(crate) fn rearm(&self) -> bool {
        if !self.opened.load(Ordering::SeqCst) {
            return false;
        }
        self.armed.store(true, Ordering::SeqCst);
        if !self.opened.load(Ordering::SeqCst) {
            self.armed.store(false, Ordering::SeqCst);
            return false;
        }
        self.missed.swap(false, Ordering::SeqCst) && self.armed.swap(false, Ordering::SeqCst)
    }

    /// Allow delivery; returns true if a latched edge must be replayed
    pub(crate) fn open(&self) -> bool {
        self.opened.store(true, Ordering::SeqCst);
        self.rearm()
    }

    /// Interface is open
    pub(crate) fn is_open(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    /// Stop delivery; later edges are latched
    pub(crate) fn close(&self) {
        self.opened.store(false, Ordering::SeqCst);
        self.armed.store(false, Ordering::SeqCst);
    }
}

/// Listener and worker threads of one device
pub(crate) struct IrqThreads {
    listener: JoinHandle<()>,
    worker: JoinHandle<()>,
    notify: flume::Sender<()>,
}

impl IrqThreads {
    /// Start the listener on `line` and the RX worker
    pub(crate) fn spawn<B>(
        shared: &Arc<Shared<B>>,
        line: Box<dyn InterruptSource + Send>,
    ) -> Result<Self>
    where
        B: SpiBus + Send + 'static,
    {
        // One slot: a queued notification already covers any later edge
        let (notify, pending) = flume::bounded(1);

        let worker = {
            let shared = Arc::clone(shared);
            let notify = notify.clone();
            thread::Builder::new()
                .name(format!("{}-rx", shared.config.name))
                .spawn(move || worker_loop(&shared, &pending, &notify))
                .map_err(|e| NetdevError::AllocationFailure {
                    what: "RX worker thread",
                    source: e.into(),
                })?
        };

        let listener = {
            let shared = Arc::clone(shared);
            let notify = notify.clone();
            thread::Builder::new()
                .name(format!("{}-irq", shared.config.name))
                .spawn(move || listener_loop(&shared, line, &notify))
        };
        let listener = match listener {
            Ok(handle) => handle,
            Err(e) => {
                // Let the worker see the shutdown flag and exit
                shared.shutdown.store(true, Ordering::SeqCst);
                let _ = notify.try_send(());
                let _ = worker.join();
                return Err(NetdevError::AllocationFailure {
                    what: "IRQ listener thread",
                    source: e.into(),
                });
            }
        };

        Ok(Self {
            listener,
            worker,
            notify,
        })
    }

    /// Queue a notification for the worker (used to replay latched edges)
    pub(crate) fn kick(&self) {
        let _ = self.notify.try_send(());
    }

    /// Stop both threads; the caller has already set the shutdown flag
    ///
    /// The listener exits within one poll interval and releases the line.
    /// The worker is woken, sees the flag and exits without touching any
    /// notification still queued.
    pub(crate) fn stop(self) {
        if self.listener.join().is_err() {
            log::error!("w5500: IRQ listener panicked");
        }
        let _ = self.notify.try_send(());
        if self.worker.join().is_err() {
            log::error!("w5500: RX worker panicked");
        }
    }
}

fn listener_loop<B>(
    shared: &Shared<B>,
    mut line: Box<dyn InterruptSource + Send>,
    notify: &flume::Sender<()>,
) {
    log::debug!("w5500: IRQ listener started");
    while !shared.shutdown.load(Ordering::SeqCst) {
        match line.wait_edge(shared.config.irq_poll_interval) {
            Ok(true) => {
                shared.stats.record_interrupt();
                if shared.gate.on_edge() {
                    // Full means a notification is already queued
                    let _ = notify.try_send(());
                }
            }
            Ok(false) => {}
            Err(e) => {
                log::error!("w5500: interrupt line: {}", e);
                thread::sleep(shared.config.irq_poll_interval);
            }
        }
    }
    log::debug!("w5500: IRQ listener stopped");
}

fn worker_loop<B: SpiBus>(
    shared: &Shared<B>,
    pending: &flume::Receiver<()>,
    notify: &flume::Sender<()>,
) {
    log::debug!("w5500: RX worker started");
    while pending.recv().is_ok() {
        if shared.shutdown.load(Ordering::SeqCst) {
            break;
        }
        rx::service(shared);
        if shared.gate.rearm() {
            log::trace!("w5500: replaying latched interrupt");
            let _ = notify.try_send(());
        }
    }
    log::debug!("w5500: RX worker stopped");
}
