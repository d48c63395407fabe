//! Send command implementation

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use w5500eth_netdev::{MacAddress, OutboundFrame, TxResult, ETH_HEADER_LEN, ETH_MTU, IFACE_MTU};

use crate::commands::open_device;
use crate::config::Settings;

/// Shortest frame on the wire, without FCS
const MIN_FRAME_LEN: usize = 60;

/// What to send
pub struct SendOptions<'a> {
    pub dst: MacAddress,
    pub ethertype: u16,
    pub payload: Option<&'a str>,
    pub file: Option<&'a Path>,
    pub count: u32,
    pub interval: Duration,
}

/// Parse hex bytes, ignoring whitespace and ':' separators
pub(crate) fn parse_hex_payload(s: &str) -> Result<Vec<u8>, String> {
    let digits: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(format!("Odd number of hex digits in payload: {}", s));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("Invalid hex byte '{}' in payload", &digits[i..i + 2]))
        })
        .collect()
}

/// Build an Ethernet II frame, padded to the minimum length
pub(crate) fn build_frame(
    dst: MacAddress,
    src: MacAddress,
    ethertype: u16,
    payload: &[u8],
) -> Result<Vec<u8>, String> {
    let len = ETH_HEADER_LEN + payload.len();
    if len > ETH_MTU {
        return Err(format!(
            "Frame would be {} bytes, the limit is {} (payload up to {} bytes)",
            len,
            ETH_MTU,
            IFACE_MTU
        ));
    }

    let mut frame = Vec::with_capacity(len.max(MIN_FRAME_LEN));
    frame.extend_from_slice(&dst.octets());
    frame.extend_from_slice(&src.octets());
    frame.extend_from_slice(&ethertype.to_be_bytes());
    frame.extend_from_slice(payload);
    if frame.len() < MIN_FRAME_LEN {
        frame.resize(MIN_FRAME_LEN, 0);
    }
    Ok(frame)
}

fn load_payload(options: &SendOptions<'_>) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if let Some(hex) = options.payload {
        return Ok(parse_hex_payload(hex)?);
    }
    if let Some(path) = options.file {
        return fs::read(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e).into());
    }
    Ok(b"w5500eth test frame".to_vec())
}

/// Bring the device up and transmit `count` frames
pub fn run_send(
    settings: &Settings,
    options: &SendOptions<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload = load_payload(options)?;
    let frame = build_frame(
        options.dst,
        settings.device.mac,
        options.ethertype,
        &payload,
    )?;

    let mut opened = open_device(settings)?;
    let device = &mut opened.device;
    device.bring_up()?;
    device.open()?;

    println!(
        "Sending {} frame(s) of {} bytes to {} (EtherType 0x{:04X})",
        options.count,
        frame.len(),
        options.dst,
        options.ethertype
    );

    for i in 0..options.count {
        match device.transmit(OutboundFrame::new(frame.clone())) {
            TxResult::Sent => log::debug!("frame {} sent", i),
            TxResult::Dropped => log::warn!("frame {} dropped", i),
            TxResult::Errored => log::warn!("frame {} failed", i),
            TxResult::Refused(_) => {
                return Err(format!("Device refused frame {} ({})", i, device.link_state()).into())
            }
        }
        if !options.interval.is_zero() && i + 1 < options.count {
            thread::sleep(options.interval);
        }
    }

    device.close();
    println!("{}", device.stats());
    device.teardown();
    Ok(())
}
