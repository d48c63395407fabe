//! Device configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default interface name
pub const DEFAULT_NAME: &str = "w5500-0";

/// WIZnet OUI with the locally administered bit set
pub const DEFAULT_MAC: MacAddress = MacAddress::new([0x02, 0x08, 0xDC, 0x00, 0x00, 0x01]);

/// 48-bit Ethernet hardware address
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

/// Error parsing a MAC address
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid MAC address '{0}', expected six hex octets like 02:08:dc:00:00:01")]
pub struct MacParseError(String);

impl MacAddress {
    /// Broadcast address
    pub const BROADCAST: Self = Self([0xFF; 6]);

    /// Create from octets
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// The six octets
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MacParseError(s.to_string());
        let mut octets = [0u8; 6];
        let mut parts = s.split(|c| c == ':' || c == '-');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(err)?;
            if part.len() != 2 {
                return Err(err());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| err())?;
        }
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({})", self)
    }
}

/// Configuration of one W5500 network device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Interface name registered with the stack
    pub name: String,
    /// Hardware address programmed into SHAR
    pub mac: MacAddress,
    /// Only receive frames addressed to `mac` (plus broadcast/multicast)
    pub mac_filter: bool,
    /// How many times TX polls Sn_TX_FSR for room before giving up
    pub tx_free_polls: u32,
    /// Pause between Sn_TX_FSR polls
    pub tx_poll_interval: Duration,
    /// How many times Sn_CR is polled for command completion
    pub command_polls: u32,
    /// Interrupt wait timeout; bounds how long teardown waits for the listener
    pub irq_poll_interval: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            mac: DEFAULT_MAC,
            mac_filter: true,
            tx_free_polls: 100,
            tx_poll_interval: Duration::from_micros(20),
            command_polls: 100,
            irq_poll_interval: Duration::from_millis(50),
        }
    }
}

impl DeviceConfig {
    /// Create a configuration with the given interface name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the hardware address
    pub fn with_mac(mut self, mac: MacAddress) -> Self {
        self.mac = mac;
        self
    }

    /// Enable or disable MACRAW MAC filtering
    pub fn with_mac_filter(mut self, enabled: bool) -> Self {
        self.mac_filter = enabled;
        self
    }

    /// Set the TX free-space poll budget
    pub fn with_tx_free_polls(mut self, polls: u32) -> Self {
        self.tx_free_polls = polls;
        self
    }

    /// Set the interrupt wait timeout
    pub fn with_irq_poll_interval(mut self, interval: Duration) -> Self {
        self.irq_poll_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mac() {
        let mac: MacAddress = "02:08:DC:00:00:01".parse().unwrap();
        assert_eq!(mac, DEFAULT_MAC);
        let mac: MacAddress = "aa-bb-cc-dd-ee-ff".parse().unwrap();
        assert_eq!(mac.octets(), [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn test_parse_mac_rejects_garbage() {
        for bad in ["", "02:08:dc:00:00", "02:08:dc:00:00:01:02", "2:8:dc:0:0:1", "zz:08:dc:00:00:01"] {
            assert!(bad.parse::<MacAddress>().is_err(), "{}", bad);
        }
    }
}
