//! Probe command implementation

use crate::commands::open_device;
use crate::config::Settings;

/// Bring the device up, print what was found, tear it down
pub fn run_probe(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let mut opened = open_device(settings)?;
    let device = &mut opened.device;

    let result = device.bring_up();

    println!("W5500 on {}", settings.backend);
    println!("  Interface: {}", device.config().name);
    println!("  MAC:       {}", device.config().mac);
    println!("  State:     {}", device.link_state());
    for transition in device.transitions() {
        println!("    {}", transition);
    }

    if let Err(e) = result {
        eprintln!("Probe failed: {}", e);
        return Err(Box::new(e));
    }

    match device.identity_mismatch() {
        Some(mismatch) => println!("  Identity:  {}", mismatch),
        None => println!("  Identity:  W5500 (VERSIONR 0x04)"),
    }

    if let Some(info) = opened.stack.interface() {
        println!("  Registered: {} (MTU {})", info.name, info.mtu);
    }

    let phy = device.phy_status()?;
    if phy.link_up() {
        let speed = if phy.contains(w5500eth_netdev::PhyStatus::SPD) {
            "100"
        } else {
            "10"
        };
        let duplex = if phy.contains(w5500eth_netdev::PhyStatus::DPX) {
            "full"
        } else {
            "half"
        };
        println!("  Link:      up, {} Mbps, {} duplex", speed, duplex);
    } else {
        println!("  Link:      down");
    }

    device.teardown();
    Ok(())
}
