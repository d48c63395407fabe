//! CLI command implementations
//!
//! Every command except `regs` goes through [`open_device`], which resolves
//! the settings, opens the backend and board lines, and builds a
//! `DeviceContext` wired to a [`ChannelStack`]. `regs` talks to the bus
//! directly and never brings the device up.

mod list;
mod listen;
mod probe;
mod regs;
mod send;

use std::sync::Arc;

use w5500eth_netdev::{ChannelStack, DeviceContext, Resources};

use crate::backends::{self, BoxedBus};
use crate::config::Settings;

pub use list::list_backends;
pub use listen::run_listen;
pub use probe::run_probe;
pub use regs::run_regs;
pub use send::{run_send, SendOptions};

/// A device that has not been brought up yet, plus the stack it reports to
pub struct OpenedDevice {
    pub device: DeviceContext<BoxedBus>,
    pub stack: Arc<ChannelStack>,
    pub frames: flume::Receiver<Vec<u8>>,
}

/// Open the backend and lines named in `settings`
pub fn open_device(settings: &Settings) -> Result<OpenedDevice, Box<dyn std::error::Error>> {
    let backend = backends::open_backend(&settings.backend)?;
    let resources = attach_lines(backend.resources, settings)?;

    let (stack, frames) = ChannelStack::new();
    let stack = Arc::new(stack);
    let device = DeviceContext::new(
        backend.bus,
        settings.device.clone(),
        resources,
        stack.clone(),
    );

    Ok(OpenedDevice {
        device,
        stack,
        frames,
    })
}

#[cfg(feature = "linux-gpio")]
fn attach_lines(
    mut resources: Resources,
    settings: &Settings,
) -> Result<Resources, Box<dyn std::error::Error>> {
    use w5500eth_linux_gpio::{parse_line_spec, LinuxIrqLine, LinuxResetLine, ResetLineConfig};

    if let Some(reset) = &settings.reset {
        let config =
            ResetLineConfig::new(parse_line_spec(&reset.line)?).with_active_low(reset.active_low);
        resources = resources.with_reset_line(LinuxResetLine::open(&config)?);
    }
    if let Some(irq) = &settings.irq {
        resources = resources.with_irq_line(LinuxIrqLine::open(&parse_line_spec(irq)?)?);
    }
    Ok(resources)
}

#[cfg(not(feature = "linux-gpio"))]
fn attach_lines(
    resources: Resources,
    settings: &Settings,
) -> Result<Resources, Box<dyn std::error::Error>> {
    if settings.reset.is_some() || settings.irq.is_some() {
        return Err("GPIO lines need the linux-gpio feature".into());
    }
    Ok(resources)
}

/// Print frame bytes sixteen to a line
pub(crate) fn hexdump(data: &[u8]) {
    for (i, chunk) in data.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        println!("  {:04x}: {}", i * 16, hex.join(" "));
    }
}
