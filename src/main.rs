//! w5500eth - W5500 SPI Ethernet controller tool
//!
//! Brings up a W5500 behind a bus backend (Linux spidev or the in-memory
//! model), and probes it, dumps its registers, sends raw Ethernet frames
//! through socket 0 in MACRAW mode, or prints the frames it receives.

mod backends;
mod cli;
mod commands;
mod config;

use std::time::Duration;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Probe { device } => {
            let settings = config::resolve(&device)?;
            commands::run_probe(&settings)
        }
        Commands::Regs { device, raw } => {
            let settings = config::resolve(&device)?;
            commands::run_regs(&settings, raw)
        }
        Commands::Send {
            device,
            dst,
            ethertype,
            payload,
            file,
            count,
            interval,
        } => {
            let settings = config::resolve(&device)?;
            let options = commands::SendOptions {
                dst,
                ethertype,
                payload: payload.as_deref(),
                file: file.as_deref(),
                count,
                interval: Duration::from_millis(interval),
            };
            commands::run_send(&settings, &options)
        }
        Commands::Listen {
            device,
            count,
            timeout,
            dump,
        } => {
            let settings = config::resolve(&device)?;
            commands::run_listen(&settings, count, timeout.map(Duration::from_secs), dump)
        }
        Commands::ListBackends => {
            commands::list_backends();
            Ok(())
        }
    }
}
