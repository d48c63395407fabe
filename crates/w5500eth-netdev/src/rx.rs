//! RX worker body

use w5500eth_core::bus::SpiBus;
use w5500eth_core::regs::socket;
use w5500eth_core::transport::RegisterTransport;

use crate::device::{lock, Shared};
use crate::error::Result;
use crate::macraw::{self, RxEntry};

/// Frames taken per service run; anything left re-raises RECV on the chip
const DRAIN_BUDGET: usize = 64;

/// Drain socket 0 and hand the frames to the stack
///
/// Frames are delivered after the bus lock is released.
pub(crate) fn service<B: SpiBus>(shared: &Shared<B>) {
    let mut frames = Vec::new();
    {
        let mut guard = lock(&shared.bus);
        let Some(transport) = guard.as_mut() else {
            return;
        };
        if let Err(e) = drain(transport, shared, &mut frames) {
            log::error!("w5500: RX drain failed: {}", e);
            shared.stats.record_rx_error();
        }
    }

    for frame in frames {
        shared.stats.record_rx(frame.len());
        shared.stack.receive(frame);
    }
}

fn drain<B: SpiBus>(
    t: &mut RegisterTransport<B>,
    shared: &Shared<B>,
    frames: &mut Vec<Vec<u8>>,
) -> Result<()> {
    t.write8(
        socket::reg(0, socket::SN_IR),
        socket::Interrupt::RECV.bits(),
    )?;

    for _ in 0..DRAIN_BUDGET {
        let pending = macraw::rx_pending(t)?;
        if pending == 0 {
            return Ok(());
        }
        match macraw::recv(t, pending, &shared.config)? {
            RxEntry::Frame(frame) => {
                log::trace!("w5500: received {} byte frame", frame.len());
                frames.push(frame);
            }
            RxEntry::Malformed { length, discarded } => {
                log::warn!(
                    "w5500: bad RX length header {} with {} pending, discarded",
                    length,
                    discarded
                );
                shared.stats.record_rx_error();
            }
        }
    }
    log::debug!("w5500: RX budget of {} frames used up", DRAIN_BUDGET);
    Ok(())
}
