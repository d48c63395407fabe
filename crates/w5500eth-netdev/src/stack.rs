//! Upstream network stack interface

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::config::MacAddress;
use crate::error::StackError;

/// What the driver tells the stack about the interface it registers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    /// Interface name
    pub name: String,
    /// Hardware address
    pub mac: MacAddress,
    /// Largest payload the interface transmits
    pub mtu: usize,
}

/// The host networking stack, as seen by the driver
///
/// `receive`, `stop_queue` and `wake_queue` are called from driver threads
/// and must not block for long.
pub trait NetStack: Send + Sync {
    /// Register a new interface
    fn register(&self, info: &InterfaceInfo) -> Result<(), StackError>;

    /// Remove a previously registered interface
    fn unregister(&self, name: &str);

    /// Hand a received frame to the stack
    fn receive(&self, frame: Vec<u8>);

    /// Ask the stack to stop submitting frames
    fn stop_queue(&self);

    /// Let the stack submit frames again
    fn wake_queue(&self);
}

/// Stack that forwards received frames over a channel
///
/// Used by the CLI to print traffic without a kernel interface.
pub struct ChannelStack {
    frames: flume::Sender<Vec<u8>>,
    interface: Mutex<Option<InterfaceInfo>>,
    queue_stopped: AtomicBool,
}

impl ChannelStack {
    /// Create a stack and the receiver its frames arrive on
    pub fn new() -> (Self, flume::Receiver<Vec<u8>>) {
        let (tx, rx) = flume::unbounded();
        let stack = Self {
            frames: tx,
            interface: Mutex::new(None),
            queue_stopped: AtomicBool::new(true),
        };
        (stack, rx)
    }

    /// The registered interface, if any
    pub fn interface(&self) -> Option<InterfaceInfo> {
        self.interface
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns true while the transmit queue is stopped
    pub fn queue_stopped(&self) -> bool {
        self.queue_stopped.load(Ordering::SeqCst)
    }
}

impl NetStack for ChannelStack {
    fn register(&self, info: &InterfaceInfo) -> Result<(), StackError> {
        let mut slot = self.interface.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = slot.as_ref() {
            return Err(format!("interface {} already registered", existing.name).into());
        }
        log::debug!("stack: registered {} ({}, mtu {})", info.name, info.mac, info.mtu);
        *slot = Some(info.clone());
        Ok(())
    }

    fn unregister(&self, name: &str) {
        let mut slot = self.interface.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().map(|i| i.name.as_str()) == Some(name) {
            log::debug!("stack: unregistered {}", name);
            *slot = None;
        }
    }

    fn receive(&self, frame: Vec<u8>) {
        if self.frames.send(frame).is_err() {
            log::debug!("stack: receiver gone, dropping frame");
        }
    }

    fn stop_queue(&self) {
        self.queue_stopped.store(true, Ordering::SeqCst);
    }

    fn wake_queue(&self) {
        self.queue_stopped.store(false, Ordering::SeqCst);
    }
}
