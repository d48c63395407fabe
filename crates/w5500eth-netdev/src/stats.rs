//! Interface statistics

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated from the TX path and the RX worker
#[derive(Debug, Default)]
pub(crate) struct Stats {
    frames_transmitted: AtomicU64,
    bytes_transmitted: AtomicU64,
    frames_dropped: AtomicU64,
    transmit_errors: AtomicU64,
    frames_received: AtomicU64,
    bytes_received: AtomicU64,
    receive_errors: AtomicU64,
    interrupts: AtomicU64,
}

impl Stats {
    pub(crate) fn record_tx(&self, len: usize) {
        self.frames_transmitted.fetch_add(1, Ordering::Relaxed);
        self.bytes_transmitted
            .fetch_add(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_drop(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_tx_error(&self) {
        self.transmit_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rx(&self, len: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_rx_error(&self) {
        self.receive_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_interrupt(&self) {
        self.interrupts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_transmitted: self.frames_transmitted.load(Ordering::Relaxed),
            bytes_transmitted: self.bytes_transmitted.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            transmit_errors: self.transmit_errors.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            interrupts: self.interrupts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the interface counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames handed to the chip
    pub frames_transmitted: u64,
    /// Bytes handed to the chip
    pub bytes_transmitted: u64,
    /// Frames discarded before transmission (oversize or empty)
    pub frames_dropped: u64,
    /// Frames lost to a failed transmission
    pub transmit_errors: u64,
    /// Frames delivered to the stack
    pub frames_received: u64,
    /// Bytes delivered to the stack
    pub bytes_received: u64,
    /// Malformed or unreadable receive attempts
    pub receive_errors: u64,
    /// Interrupt edges seen
    pub interrupts: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "TX: {} frames, {} bytes, {} dropped, {} errors",
            self.frames_transmitted, self.bytes_transmitted, self.frames_dropped, self.transmit_errors
        )?;
        writeln!(
            f,
            "RX: {} frames, {} bytes, {} errors",
            self.frames_received, self.bytes_received, self.receive_errors
        )?;
        write!(f, "Interrupts: {}", self.interrupts)
    }
}
