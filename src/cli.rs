//! CLI argument parsing

use crate::backends;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use w5500eth_netdev::MacAddress;

/// Parse a string as a hex or decimal u16
fn parse_hex_u16(s: &str) -> Result<u16, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u16>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the backend argument
fn backend_help() -> String {
    format!(
        "Bus backend to use [available: {}]",
        backends::backend_names_short()
    )
}

#[derive(Parser)]
#[command(name = "w5500eth")]
#[command(author, version, about = "W5500 SPI Ethernet controller tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// How to reach and configure the chip, shared across commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DeviceArgs {
    /// Device description file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = backend_help())]
    pub backend: Option<String>,

    /// Interface name
    #[arg(long)]
    pub name: Option<String>,

    /// MAC address programmed into the chip
    #[arg(long)]
    pub mac: Option<MacAddress>,

    /// Receive every frame, not just those addressed to us
    #[arg(long)]
    pub promiscuous: bool,

    /// Reset line (chip:offset, e.g. gpiochip0:25)
    #[arg(long)]
    pub reset: Option<String>,

    /// Reset line polarity [default: true]
    #[arg(long, value_name = "BOOL")]
    pub reset_active_low: Option<bool>,

    /// Interrupt line (chip:offset, e.g. gpiochip0:24)
    #[arg(long)]
    pub irq: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bring the chip up and report what was found
    Probe {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Dump the common registers and socket 0
    Regs {
        #[command(flatten)]
        device: DeviceArgs,

        /// Also print the raw common block
        #[arg(long)]
        raw: bool,
    },

    /// Transmit Ethernet frames
    Send {
        #[command(flatten)]
        device: DeviceArgs,

        /// Destination MAC address
        #[arg(long, default_value = "ff:ff:ff:ff:ff:ff")]
        dst: MacAddress,

        /// EtherType (hex or decimal)
        #[arg(long, default_value = "0x88B5", value_parser = parse_hex_u16)]
        ethertype: u16,

        /// Payload as hex bytes (e.g. "de ad be ef")
        #[arg(long, conflicts_with = "file")]
        payload: Option<String>,

        /// Read the payload from a file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Number of frames to send
        #[arg(long, default_value = "1")]
        count: u32,

        /// Pause between frames in milliseconds
        #[arg(long, default_value = "0")]
        interval: u64,
    },

    /// Print received frames
    Listen {
        #[command(flatten)]
        device: DeviceArgs,

        /// Stop after this many frames
        #[arg(long)]
        count: Option<u64>,

        /// Stop after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Hex dump each frame
        #[arg(long)]
        dump: bool,
    },

    /// List compiled-in bus backends
    ListBackends,
}
