//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::types::Zone;
use crate::services::event_log::{DEFAULT_MAX_RETAINED, DEFAULT_QUERY_LIMIT};
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SiteConfig {
    /// Site identifier used as the Prometheus `site` label
    #[serde(default = "default_site_id")]
    pub id: String,
}

fn default_site_id() -> String {
    "geofence".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), port: default_server_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Ring buffer capacity for the event log (0 = unbounded)
    #[serde(default = "default_max_retained")]
    pub max_retained: usize,
    /// Events returned by /events when no limit is given
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

fn default_max_retained() -> usize {
    DEFAULT_MAX_RETAINED
}

fn default_limit() -> usize {
    DEFAULT_QUERY_LIMIT
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { max_retained: default_max_retained(), default_limit: default_limit() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Interval for the periodic metrics log line
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    10
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Zone catalog in definition order. Validated when the catalog is built.
    #[serde(default = "default_zones")]
    pub zones: Vec<Zone>,
}

/// Built-in zones used when no catalog is configured
fn default_zones() -> Vec<Zone> {
    vec![
        Zone::new("airport", 12.9611, 77.6387, 3000.0),
        Zone::new("downtown", 12.9716, 77.5946, 5000.0),
        Zone::new("suburb", 12.9956, 77.7000, 4000.0),
    ]
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    bind_address: String,
    port: u16,
    events_max_retained: usize,
    events_default_limit: usize,
    metrics_interval_secs: u64,
    zones: Vec<Zone>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            bind_address: default_bind_address(),
            port: default_server_port(),
            events_max_retained: DEFAULT_MAX_RETAINED,
            events_default_limit: DEFAULT_QUERY_LIMIT,
            metrics_interval_secs: default_metrics_interval(),
            zones: default_zones(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path from the CLI argument or environment
    pub fn resolve_config_path(cli_path: Option<&str>) -> String {
        if let Some(path) = cli_path {
            return path.to_string();
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            site_id: toml_config.site.id,
            bind_address: toml_config.server.bind_address,
            port: toml_config.server.port,
            events_max_retained: toml_config.events.max_retained,
            events_default_limit: toml_config.events.default_limit,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            zones: toml_config.zones,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration from a specific path.
    ///
    /// Only a missing file falls back to defaults. A file that exists but does
    /// not parse (including a malformed `[[zones]]` entry) is an error, so the
    /// operator's catalog is never silently replaced.
    pub fn load_from_path(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            tracing::warn!(path = %path, "config_file_missing_using_defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Load configuration - tries TOML file first, falls back to defaults if absent
    pub fn load(cli_path: Option<&str>) -> anyhow::Result<Self> {
        Self::load_from_path(&Self::resolve_config_path(cli_path))
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn events_max_retained(&self) -> usize {
        self.events_max_retained
    }

    pub fn events_default_limit(&self) -> usize {
        self.events_default_limit
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to replace the zone catalog
    pub fn with_zones(mut self, zones: Vec<Zone>) -> Self {
        self.zones = zones;
        self
    }

    /// Builder method for tests to set event log retention
    pub fn with_events(mut self, max_retained: usize, default_limit: usize) -> Self {
        self.events_max_retained = max_retained;
        self.events_default_limit = default_limit;
        self
    }
}
