//! Listen command implementation

use std::time::{Duration, Instant};

use w5500eth_netdev::{MacAddress, ETH_HEADER_LEN};

use crate::commands::{hexdump, open_device};
use crate::config::Settings;

/// One-line summary of an Ethernet II frame
pub(crate) fn describe_frame(frame: &[u8]) -> String {
    if frame.len() < ETH_HEADER_LEN {
        return format!("runt frame, {} bytes", frame.len());
    }
    let mut dst = [0u8; 6];
    let mut src = [0u8; 6];
    dst.copy_from_slice(&frame[0..6]);
    src.copy_from_slice(&frame[6..12]);
    let ethertype = u16::from_be_bytes([frame[12], frame[13]]);
    format!(
        "{} > {}, type 0x{:04X}, {} bytes",
        MacAddress::new(src),
        MacAddress::new(dst),
        ethertype,
        frame.len()
    )
}

/// Bring the device up and print frames until `count` or `timeout` is reached
pub fn run_listen(
    settings: &Settings,
    count: Option<u64>,
    timeout: Option<Duration>,
    dump: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if settings.irq.is_none() && !settings.backend.starts_with("sim") {
        log::warn!("No interrupt line configured, nothing will be received");
    }

    let mut opened = open_device(settings)?;
    opened.device.bring_up()?;
    opened.device.open()?;

    println!("Listening on {} ({})", settings.device.name, settings.device.mac);

    let deadline = timeout.map(|t| Instant::now() + t);
    let mut received = 0u64;
    while count.map_or(true, |c| received < c) {
        let wait = match deadline {
            Some(d) => match d.checked_duration_since(Instant::now()) {
                Some(left) if !left.is_zero() => left,
                _ => break,
            },
            None => Duration::from_secs(1),
        };

        match opened.frames.recv_timeout(wait) {
            Ok(frame) => {
                received += 1;
                println!("{:6} {}", received, describe_frame(&frame));
                if dump {
                    hexdump(&frame);
                }
            }
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }

    opened.device.close();
    println!("{}", opened.device.stats());
    opened.device.teardown();
    Ok(())
}
