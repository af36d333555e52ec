use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60 * 60; // hourly
pub const DEFAULT_SWEEP_STARTUP_DELAY_SECS: u64 = 5;

/// Top-level config (homestock.toml + HOMESTOCK_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HomestockConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Decay sweep cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// When false the background engine is not spawned; the on-demand
    /// endpoint and CLI subcommand still work.
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
    /// Delay before the first pass after process start.
    #[serde(default = "default_sweep_startup_delay")]
    pub startup_delay_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            startup_delay_secs: DEFAULT_SWEEP_STARTUP_DELAY_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Insert the stock categories when the categories table is empty.
    #[serde(default = "bool_true")]
    pub default_categories: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            default_categories: true,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_sweep_interval() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}
fn default_sweep_startup_delay() -> u64 {
    DEFAULT_SWEEP_STARTUP_DELAY_SECS
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.homestock/homestock.db", home)
}

impl HomestockConfig {
    /// Load config from a TOML file with HOMESTOCK_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `HOMESTOCK_SWEEP__INTERVAL_SECS=600`. A missing file is not an error;
    /// every field has a default.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        tracing::debug!(%path, "loading config");

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::HomestockError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(HomestockConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("HOMESTOCK_").split("__"))
    }

    /// `bind:port` string suitable for `SocketAddr` parsing.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.homestock/homestock.toml", home)
}
