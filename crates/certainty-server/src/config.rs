use anyhow::Context;
use certainty_notify::channels::email::EmailConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Directory holding `certainty.db`.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Public URL used for links inside notification emails.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// Without SMTP settings notifications are only logged.
    #[serde(default)]
    pub smtp: Option<EmailConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_sweep_enabled")]
    pub enabled: bool,
    #[serde(default = "default_sweep_tick_secs")]
    pub tick_secs: u64,
    #[serde(default = "default_sweep_min_recheck_secs")]
    pub min_recheck_secs: u64,
    #[serde(default = "default_sweep_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_sweep_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: default_sweep_enabled(),
            tick_secs: default_sweep_tick_secs(),
            min_recheck_secs: default_sweep_min_recheck_secs(),
            connect_timeout_secs: default_sweep_connect_timeout_secs(),
            max_concurrent: default_sweep_max_concurrent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Manual refreshes inside this window return the stored record.
    #[serde(default = "default_manual_floor_secs")]
    pub manual_floor_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            manual_floor_secs: default_manual_floor_secs(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_sweep_enabled() -> bool {
    true
}

fn default_sweep_tick_secs() -> u64 {
    10
}

fn default_sweep_min_recheck_secs() -> u64 {
    10
}

fn default_sweep_connect_timeout_secs() -> u64 {
    10
}

fn default_sweep_max_concurrent() -> usize {
    32
}

fn default_manual_floor_secs() -> u64 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            data_dir: default_data_dir(),
            base_url: default_base_url(),
            sweep: SweepConfig::default(),
            refresh: RefreshConfig::default(),
            smtp: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("Invalid config file {path}"))?;
        Ok(config)
    }
}
