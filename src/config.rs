//! Device description file (TOML)
//!
//! ```toml
//! [device]
//! name = "w5500-0"
//! mac = "02:08:dc:00:00:01"
//! mac_filter = true
//!
//! [bus]
//! backend = "linux_spi:dev=/dev/spidev0.0,spispeed=20000"
//!
//! [reset]
//! line = "gpiochip0:25"
//! active_low = true
//!
//! [irq]
//! line = "gpiochip0:24"
//! ```
//!
//! Every section is optional. Command line flags override the file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use w5500eth_netdev::{DeviceConfig, MacAddress};

use crate::cli::DeviceArgs;

/// Errors from loading the device file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML or has unexpected keys
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// No backend in the file or on the command line
    #[error("no bus backend given (use -b/--backend or [bus] backend in the config file)")]
    NoBackend,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeviceFile {
    #[serde(default)]
    device: DeviceSection,
    #[serde(default)]
    bus: BusSection,
    reset: Option<ResetSection>,
    irq: Option<IrqSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeviceSection {
    name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_mac")]
    mac: Option<MacAddress>,
    mac_filter: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BusSection {
    backend: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResetSection {
    line: String,
    #[serde(default = "default_active_low")]
    active_low: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IrqSection {
    line: String,
}

fn default_active_low() -> bool {
    true
}

fn deserialize_mac<'de, D>(deserializer: D) -> Result<Option<MacAddress>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    s.map(|s| s.parse().map_err(serde::de::Error::custom))
        .transpose()
}

/// Reset line settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetSettings {
    /// Line spec, `chip:offset`
    pub line: String,
    /// Line is electrically active low
    pub active_low: bool,
}

/// Everything needed to open and bring up one device
#[derive(Debug, Clone)]
pub struct Settings {
    /// Backend string
    pub backend: String,
    /// Network device configuration
    pub device: DeviceConfig,
    /// Reset line, if any
    pub reset: Option<ResetSettings>,
    /// Interrupt line spec, if any
    pub irq: Option<String>,
}

fn parse_file(path: &str, content: &str) -> Result<DeviceFile, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })
}

fn load_file(path: &Path) -> Result<DeviceFile, ConfigError> {
    let display = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    parse_file(&display, &content)
}

/// Combine the optional device file with command line flags
pub fn resolve(args: &DeviceArgs) -> Result<Settings, ConfigError> {
    let file = match &args.config {
        Some(path) => {
            log::debug!("Loading device file {}", path.display());
            load_file(path)?
        }
        None => DeviceFile::default(),
    };
    merge(file, args)
}

fn merge(file: DeviceFile, args: &DeviceArgs) -> Result<Settings, ConfigError> {
    let backend = args
        .backend
        .clone()
        .or(file.bus.backend)
        .ok_or(ConfigError::NoBackend)?;

    let name = args
        .name
        .clone()
        .or(file.device.name)
        .unwrap_or_else(|| w5500eth_netdev::DEFAULT_NAME.to_string());
    let mut device = DeviceConfig::new(name);
    if let Some(mac) = args.mac.or(file.device.mac) {
        device = device.with_mac(mac);
    }
    if let Some(filter) = file.device.mac_filter {
        device = device.with_mac_filter(filter);
    }
    if args.promiscuous {
        device = device.with_mac_filter(false);
    }

    let reset = match (&args.reset, file.reset) {
        (Some(line), file_reset) => Some(ResetSettings {
            line: line.clone(),
            active_low: args
                .reset_active_low
                .or(file_reset.map(|r| r.active_low))
                .unwrap_or(true),
        }),
        (None, Some(r)) => Some(ResetSettings {
            line: r.line,
            active_low: args.reset_active_low.unwrap_or(r.active_low),
        }),
        (None, None) => None,
    };

    let irq = args.irq.clone().or(file.irq.map(|i| i.line));

    Ok(Settings {
        backend,
        device,
        reset,
        irq,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DeviceArgs {
        DeviceArgs::default()
    }

    const FULL: &str = r#"
[device]
name = "eth1"
mac = "02:00:00:aa:bb:cc"
mac_filter = false

[bus]
backend = "linux_spi:dev=/dev/spidev1.0"

[reset]
line = "gpiochip0:25"

[irq]
line = "gpiochip0:24"
"#;

    #[test]
    fn test_full_file() {
        let file = parse_file("test.toml", FULL).unwrap();
        let settings = merge(file, &args()).unwrap();
        assert_eq!(settings.backend, "linux_spi:dev=/dev/spidev1.0");
        assert_eq!(settings.device.name, "eth1");
        assert_eq!(
            settings.device.mac,
            MacAddress::new([0x02, 0x00, 0x00, 0xAA, 0xBB, 0xCC])
        );
        assert!(!settings.device.mac_filter);
        assert_eq!(
            settings.reset,
            Some(ResetSettings {
                line: "gpiochip0:25".to_string(),
                active_low: true,
            })
        );
        assert_eq!(settings.irq.as_deref(), Some("gpiochip0:24"));
    }

    #[test]
    fn test_flags_override_file() {
        let file = parse_file("test.toml", FULL).unwrap();
        let mut args = args();
        args.backend = Some("sim".to_string());
        args.name = Some("w5500-9".to_string());
        args.reset_active_low = Some(false);
        args.irq = Some("gpiochip1:3".to_string());

        let settings = merge(file, &args).unwrap();
        assert_eq!(settings.backend, "sim");
        assert_eq!(settings.device.name, "w5500-9");
        assert_eq!(settings.reset.map(|r| r.active_low), Some(false));
        assert_eq!(settings.irq.as_deref(), Some("gpiochip1:3"));
    }

    #[test]
    fn test_defaults_without_file() {
        let mut args = args();
        args.backend = Some("sim".to_string());
        let settings = merge(DeviceFile::default(), &args).unwrap();
        assert_eq!(settings.device.name, w5500eth_netdev::DEFAULT_NAME);
        assert_eq!(settings.device.mac, w5500eth_netdev::DEFAULT_MAC);
        assert!(settings.device.mac_filter);
        assert!(settings.reset.is_none());
        assert!(settings.irq.is_none());
    }

    #[test]
    fn test_missing_backend() {
        assert!(matches!(
            merge(DeviceFile::default(), &args()),
            Err(ConfigError::NoBackend)
        ));
    }

    #[test]
    fn test_bad_mac_rejected() {
        let err = parse_file("bad.toml", "[device]\nmac = \"02:00\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(parse_file("bad.toml", "[device]\nspeed = 1\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_file(Path::new("/nonexistent/w5500.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
