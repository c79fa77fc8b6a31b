/*!
Layered scanner configuration: built-in defaults → optional TOML file → CLI
overrides. Durations are stored as microsecond/millisecond counts so the
struct round-trips cleanly through TOML and `clap`.
*/

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// First line's TCP listen port base; line `i` listens on `port_base + i`.
pub const DEFAULT_PORT_BASE: u16 = 37500 + 20;
pub const DEFAULT_MAX_LINES: usize = 4;
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub max_lines: usize,
    pub buffer_size: usize,
    pub port_base: u16,
    pub bind_addr: String,
    pub scan_interval_us: u64,
    pub lineio_interval_us: u64,
    pub accept_poll_interval_ms: u64,
    pub scanner_core: usize,
    pub lineio_core: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig {
            max_lines: DEFAULT_MAX_LINES,
            buffer_size: DEFAULT_BUFFER_SIZE,
            port_base: DEFAULT_PORT_BASE,
            bind_addr: "0.0.0.0".to_string(),
            scan_interval_us: 100,
            lineio_interval_us: 100,
            accept_poll_interval_ms: 25,
            scanner_core: 2,
            lineio_core: 3,
        }
    }
}

impl ScannerConfig {
    /// Load defaults, then overlay a TOML file if `path` is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = ScannerConfig::default();
        if let Some(path) = path {
            let text = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
            cfg = toml::from_str(&text)
                .map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))?;
        }
        Ok(cfg)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_micros(self.scan_interval_us)
    }

    pub fn lineio_interval(&self) -> Duration {
        Duration::from_micros(self.lineio_interval_us)
    }

    pub fn accept_poll_interval(&self) -> Duration {
        Duration::from_millis(self.accept_poll_interval_ms)
    }

    pub fn port_for_line(&self, line: usize) -> u16 {
        self.port_base + line as u16
    }
}
