use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::Deserialize;
use anyhow::{Context, Result};
use shared::protocol::{DEFAULT_SERVICE_TYPES, MDNS_PORT};
use crate::interface::AddressFamily;
use crate::scan::scheduler::DEFAULT_CONCURRENCY;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scan: ScanConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    pub interface: String,
    #[serde(default)]
    pub family: AddressFamily,
    /// Defaults to the /24 around the interface's IPv4 address
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default = "default_services")]
    pub services: Vec<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json_path: Option<PathBuf>,
    #[serde(default = "default_print")]
    pub print: bool,
}

fn default_services() -> Vec<String> {
    DEFAULT_SERVICE_TYPES.iter().map(|s| s.to_string()).collect()
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_port() -> u16 {
    MDNS_PORT
}

fn default_print() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_path: None,
            print: default_print(),
        }
    }
}

impl ScanConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}
