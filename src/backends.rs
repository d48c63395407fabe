//! Bus backend registration and dispatch
//!
//! Backends are selected with a string of the form `name` or
//! `name:key=value,key=value`, e.g. `linux_spi:dev=/dev/spidev0.0,spispeed=20000`.

use std::collections::HashMap;

use w5500eth_core::bus::SpiBus;
use w5500eth_netdev::Resources;

/// A bus behind a trait object, so every backend yields the same device type
pub type BoxedBus = Box<dyn SpiBus + Send>;

/// Information about a backend
pub struct BackendInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Backends enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "sim")]
    backends.push(BackendInfo {
        name: "sim",
        aliases: &["dummy"],
        description: "In-memory W5500 model (version=<n>,latency=<us>,maxlen=<bytes>)",
    });

    #[cfg(feature = "linux-spi")]
    backends.push(BackendInfo {
        name: "linux_spi",
        aliases: &["linux-spi", "spidev"],
        description: "Linux spidev interface (dev=/dev/spidevX.Y,spispeed=<kHz>,mode=<0|3>)",
    });

    backends
}

/// Short list of backend names for CLI help
pub fn backend_names_short() -> String {
    let names: Vec<&str> = available_backends().iter().map(|b| b.name).collect();
    names.join(", ")
}

/// Parsed backend string
#[derive(Debug, PartialEq, Eq)]
pub struct BackendParams {
    /// Backend name as given
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

impl BackendParams {
    fn options(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a backend string into name and parameters
pub fn parse_backend_params(s: &str) -> Result<BackendParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));
    if name.is_empty() {
        return Err("Empty backend name".into());
    }

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(BackendParams {
        name: name.to_string(),
        params,
    })
}

/// An opened bus plus whatever board resources the backend brings along
pub struct OpenedBackend {
    /// The SPI bus
    pub bus: BoxedBus,
    /// Reset and interrupt lines provided by the backend itself
    pub resources: Resources,
}

/// Open the backend named by `spec`
pub fn open_backend(spec: &str) -> Result<OpenedBackend, Box<dyn std::error::Error>> {
    let params = parse_backend_params(spec)?;

    match params.name.as_str() {
        #[cfg(feature = "sim")]
        "sim" | "dummy" => open_sim(&params),

        #[cfg(feature = "linux-spi")]
        "linux_spi" | "linux-spi" | "spidev" => open_linux_spi(&params),

        _ => Err(format!(
            "Unknown backend: {} (available: {})",
            params.name,
            backend_names_short()
        )
        .into()),
    }
}

#[cfg(feature = "sim")]
fn parse_number(key: &str, value: &str) -> Result<u64, String> {
    let parsed = if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        value.parse()
    };
    parsed.map_err(|_| format!("Invalid {} value: {}", key, value))
}

#[cfg(feature = "sim")]
fn sim_config(params: &BackendParams) -> Result<w5500eth_sim::SimConfig, String> {
    use std::time::Duration;

    let mut config = w5500eth_sim::SimConfig::new();
    for (key, value) in params.options() {
        match key {
            "version" => {
                let version = parse_number(key, value)?;
                let version =
                    u8::try_from(version).map_err(|_| format!("Invalid version: {}", value))?;
                config = config.with_version(version);
            }
            "latency" => {
                config = config.with_latency(Duration::from_micros(parse_number(key, value)?));
            }
            "maxlen" => {
                let len = parse_number(key, value)? as usize;
                if len == 0 {
                    return Err("maxlen must be at least 1".to_string());
                }
                config = config.with_max_transfer_len(len);
            }
            _ => return Err(format!("Unknown sim parameter: {}", key)),
        }
    }
    Ok(config)
}

#[cfg(feature = "sim")]
fn open_sim(params: &BackendParams) -> Result<OpenedBackend, Box<dyn std::error::Error>> {
    use w5500eth_sim::SimW5500;

    let config = sim_config(params).map_err(|e| format!("Invalid sim parameters: {}", e))?;
    log::info!("Opening simulated W5500 (VERSIONR 0x{:02X})", config.version);

    let sim = SimW5500::new(config);
    let resources = Resources::new()
        .with_reset_line(sim.reset_line())
        .with_irq_line(sim.interrupt_line());

    Ok(OpenedBackend {
        bus: Box::new(sim),
        resources,
    })
}

#[cfg(feature = "linux-spi")]
fn open_linux_spi(params: &BackendParams) -> Result<OpenedBackend, Box<dyn std::error::Error>> {
    use w5500eth_linux_spi::{parse_options, LinuxSpiBus};

    log::info!("Opening Linux SPI backend...");

    let config = parse_options(&params.options())
        .map_err(|e| format!("Invalid linux_spi parameters: {}", e))?;

    let bus = LinuxSpiBus::open(&config).map_err(|e| {
        format!(
            "Failed to open Linux SPI device: {}\n\
             Make sure the device exists and you have read/write permissions.\n\
             You may need to: sudo usermod -aG spi $USER",
            e
        )
    })?;
    log::debug!("linux_spi: {} at {} kHz", config.device, bus.speed_hz() / 1000);

    Ok(OpenedBackend {
        bus: Box::new(bus),
        resources: Resources::new(),
    })
}
