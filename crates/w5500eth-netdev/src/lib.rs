//! w5500eth-netdev - W5500 as a raw Ethernet network device
//!
//! Brings a W5500 up (optional hardware reset, identity check, socket 0 in
//! MACRAW mode), registers it with a [`NetStack`], transmits frames handed
//! down by the stack, and delivers received frames from an interrupt-driven
//! worker thread.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use w5500eth_netdev::{ChannelStack, DeviceConfig, DeviceContext, OutboundFrame, Resources};
//! use w5500eth_sim::SimW5500;
//!
//! let sim = SimW5500::new_default();
//! let (stack, frames) = ChannelStack::new();
//! let resources = Resources::new().with_irq_line(sim.interrupt_line());
//! let mut dev = DeviceContext::new(sim, DeviceConfig::default(), resources, Arc::new(stack));
//! dev.bring_up()?;
//! dev.open()?;
//! dev.transmit(OutboundFrame::new(vec![0xFF; 60]));
//! # drop(frames);
//! # Ok::<(), w5500eth_netdev::NetdevError>(())
//! ```

mod config;
mod device;
mod error;
mod frame;
mod irq;
mod macraw;
mod rx;
mod stack;
mod state;
mod stats;

pub use config::{DeviceConfig, MacAddress, MacParseError, DEFAULT_MAC, DEFAULT_NAME};
pub use device::{DeviceContext, Resources};
pub use error::{IdentityMismatch, NetdevError, Result, StackError};
pub use frame::{OutboundFrame, TxResult, ETH_HEADER_LEN, ETH_MTU, IFACE_MTU, MAX_RX_FRAME};
pub use stack::{ChannelStack, InterfaceInfo, NetStack};
pub use state::{LinkState, Transition};
pub use stats::StatsSnapshot;
pub use w5500eth_core::regs::common::PhyStatus;
