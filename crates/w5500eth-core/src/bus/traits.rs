//! SPI bus trait definitions

use crate::error::BusFault;

/// One segment of a bus exchange
#[derive(Debug)]
pub enum Segment<'a> {
    /// Clock out bytes, discard what comes back
    Write(&'a [u8]),
    /// Clock in bytes (the controller sends filler)
    Read(&'a mut [u8]),
    /// Full duplex: send `tx` while capturing into `rx` (same length)
    Transfer {
        /// Bytes to send
        tx: &'a [u8],
        /// Buffer for received bytes
        rx: &'a mut [u8],
    },
}

impl Segment<'_> {
    /// Number of bytes clocked by this segment
    pub fn len(&self) -> usize {
        match self {
            Self::Write(tx) => tx.len(),
            Self::Read(rx) => rx.len(),
            Self::Transfer { tx, rx } => tx.len().max(rx.len()),
        }
    }

    /// Returns true if the segment clocks no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// SPI bus trait
///
/// This trait represents an SPI controller with the W5500 on one chip
/// select. Implementations must:
///
/// 1. Assert chip select before the first segment and release it after the
///    last one; segments of one call are never split across chip select
///    cycles
/// 2. Not return until the whole exchange is done (or has failed)
/// 3. Report failures without retrying, so side effects are never repeated
///    behind the caller's back
///
/// ## Example: spidev-backed bus
///
/// ```ignore
/// impl SpiBus for LinuxSpiBus {
///     fn exchange(&mut self, segments: &mut [Segment<'_>]) -> Result<(), BusFault> {
///         self.transfer(segments).map_err(|e| e.fault())
///     }
/// }
/// ```
pub trait SpiBus {
    /// Run all segments as one chip-select framed exchange
    fn exchange(&mut self, segments: &mut [Segment<'_>]) -> Result<(), BusFault>;

    /// Maximum number of payload bytes (excluding the 3-byte header) that can
    /// be moved in a single exchange
    ///
    /// Bulk transfers longer than this are split by the register transport.
    fn max_transfer_len(&self) -> usize {
        usize::MAX
    }
}

impl<T: SpiBus + ?Sized> SpiBus for &mut T {
    fn exchange(&mut self, segments: &mut [Segment<'_>]) -> Result<(), BusFault> {
        (**self).exchange(segments)
    }

    fn max_transfer_len(&self) -> usize {
        (**self).max_transfer_len()
    }
}

// Blanket impl for boxed buses to allow trait objects
#[cfg(feature = "alloc")]
impl SpiBus for alloc::boxed::Box<dyn SpiBus + Send> {
    fn exchange(&mut self, segments: &mut [Segment<'_>]) -> Result<(), BusFault> {
        (**self).exchange(segments)
    }

    fn max_transfer_len(&self) -> usize {
        (**self).max_transfer_len()
    }
}
