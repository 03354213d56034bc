//! Configuration loading from TOML files
//!
//! Config file is selected via [`ConfigArgs`], shared by both binaries:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! Every section is optional; missing keys take the defaults below.

use crate::domain::types::StoreId;
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

/// Command line options that select and override the config file
#[derive(clap::Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to TOML configuration file
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config/dev.toml")]
    pub config: String,

    /// Dataset JSON file (overrides [data] dataset_file)
    #[arg(short, long)]
    pub dataset: Option<String>,
}

impl ConfigArgs {
    /// Load the selected file (defaults on failure) and apply overrides
    pub fn load(&self) -> Config {
        let config = Config::load_from_path(&self.config);
        match &self.dataset {
            Some(dataset) => config.with_dataset_file(dataset.clone()),
            None => config,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store analysed when a caller does not name one
    #[serde(default = "default_store_id")]
    pub default_store_id: i64,
    #[serde(default = "default_app_name")]
    pub name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { default_store_id: default_store_id(), name: default_app_name() }
    }
}

fn default_store_id() -> i64 {
    1
}

fn default_app_name() -> String {
    "ShelfIQ".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// HTTP port (0 disables the server)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path prefix for analytics routes
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Value of Access-Control-Allow-Origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            api_prefix: default_api_prefix(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_cors_origin() -> String {
    "*".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// JSON dataset of stores, products, sales, shelf space and zones
    #[serde(default = "default_dataset_file")]
    pub dataset_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { dataset_file: default_dataset_file() }
    }
}

fn default_dataset_file() -> String {
    "data/dataset.json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultsConfig {
    /// Append every computed report to the result log
    #[serde(default)]
    pub enabled: bool,
    /// Result log path (JSONL format)
    #[serde(default = "default_results_file")]
    pub file: String,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self { enabled: false, file: default_results_file() }
    }
}

fn default_results_file() -> String {
    "analytics_results.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable text
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub results: ResultsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    app_name: String,
    default_store_id: StoreId,
    bind_address: String,
    port: u16,
    api_prefix: String,
    cors_origin: String,
    dataset_file: String,
    results_enabled: bool,
    results_file: String,
    metrics_interval_secs: u64,
    log_json: bool,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        Self {
            app_name: toml_config.store.name,
            default_store_id: StoreId(toml_config.store.default_store_id),
            bind_address: toml_config.server.bind_address,
            port: toml_config.server.port,
            api_prefix: normalize_prefix(&toml_config.server.api_prefix),
            cors_origin: toml_config.server.cors_origin,
            dataset_file: toml_config.data.dataset_file,
            results_enabled: toml_config.results.enabled,
            results_file: toml_config.results.file,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            log_json: toml_config.logging.json,
            config_file: config_file.to_string(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load configuration from an explicit path, falling back to defaults
    ///
    /// Runs before the tracing subscriber exists, so the warning goes to stderr.
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Listen address for the HTTP API, `None` when port 0 disables it
    pub fn http_addr(&self) -> anyhow::Result<Option<SocketAddr>> {
        if self.port == 0 {
            return Ok(None);
        }
        let addr = format!("{}:{}", self.bind_address, self.port);
        addr.parse()
            .map(Some)
            .with_context(|| format!("invalid server address {addr}"))
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn default_store_id(&self) -> StoreId {
        self.default_store_id
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    pub fn cors_origin(&self) -> &str {
        &self.cors_origin
    }

    pub fn dataset_file(&self) -> &str {
        &self.dataset_file
    }

    pub fn results_enabled(&self) -> bool {
        self.results_enabled
    }

    pub fn results_file(&self) -> &str {
        &self.results_file
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn log_json(&self) -> bool {
        self.log_json
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method to override the dataset path (CLI flag)
    pub fn with_dataset_file(mut self, path: impl Into<String>) -> Self {
        self.dataset_file = path.into();
        self
    }

    /// Builder method for tests to enable the result log
    #[cfg(test)]
    pub fn with_results_file(mut self, path: impl Into<String>) -> Self {
        self.results_enabled = true;
        self.results_file = path.into();
        self
    }
}

/// Leading slash, no trailing slash; "/" and "" mean no prefix
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.app_name(), "ShelfIQ");
        assert_eq!(config.default_store_id(), StoreId(1));
        assert_eq!(config.port(), 8000);
        assert_eq!(config.api_prefix(), "/api");
        assert_eq!(config.cors_origin(), "*");
        assert_eq!(config.dataset_file(), "data/dataset.json");
        assert!(!config.results_enabled());
        assert_eq!(config.results_file(), "analytics_results.jsonl");
        assert_eq!(config.metrics_interval_secs(), 60);
        assert!(!config.log_json());
        assert_eq!(config.config_file(), "default");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml_config: TomlConfig = toml::from_str("[server]\nport = 9090\n").unwrap();
        let config = Config::from_toml(toml_config, "inline");
        assert_eq!(config.port(), 9090);
        assert_eq!(config.bind_address(), "0.0.0.0");
        assert_eq!(config.api_prefix(), "/api");
        assert_eq!(config.dataset_file(), "data/dataset.json");
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/api"), "/api");
        assert_eq!(normalize_prefix("api/"), "/api");
        assert_eq!(normalize_prefix("/v1/api/"), "/v1/api");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix(""), "");
    }

    #[derive(clap::Parser, Debug)]
    struct Cli {
        #[command(flatten)]
        config: ConfigArgs,
    }

    fn parse(args: &[&str]) -> ConfigArgs {
        <Cli as clap::Parser>::try_parse_from(args).unwrap().config
    }

    // The only test touching CONFIG_FILE, so it cannot race another reader
    #[test]
    fn test_config_file_env_selects_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[server]\nport = 9999\n").unwrap();
        let env_path = file.path().to_str().unwrap().to_string();

        std::env::set_var("CONFIG_FILE", &env_path);
        let from_env = parse(&["shelfiq"]);
        let flag_wins = parse(&["shelfiq", "--config", "/nonexistent/flag.toml"]);
        std::env::remove_var("CONFIG_FILE");
        let fallback = parse(&["shelfiq"]);

        assert_eq!(from_env.config, env_path);
        assert_eq!(from_env.load().port(), 9999);
        assert_eq!(flag_wins.config, "/nonexistent/flag.toml");
        assert_eq!(flag_wins.load().port(), 8000);
        assert_eq!(fallback.config, "config/dev.toml");
    }

    #[test]
    fn test_config_args_dataset_override() {
        let args = parse(&["shelfiq", "-c", "/nonexistent/x.toml", "--dataset", "snap.json"]);
        let config = args.load();
        assert_eq!(config.dataset_file(), "snap.json");
        assert_eq!(config.config_file(), "default");
    }

    #[test]
    fn test_http_addr() {
        let config = Config::default();
        assert_eq!(config.http_addr().unwrap(), Some("0.0.0.0:8000".parse().unwrap()));

        let toml_config: TomlConfig = toml::from_str("[server]\nport = 0\n").unwrap();
        assert_eq!(Config::from_toml(toml_config, "inline").http_addr().unwrap(), None);

        let toml_config: TomlConfig =
            toml::from_str("[server]\nbind_address = \"not an ip\"\n").unwrap();
        assert!(Config::from_toml(toml_config, "inline").http_addr().is_err());
    }

    #[test]
    fn test_with_dataset_file() {
        let config = Config::default().with_dataset_file("/tmp/other.json");
        assert_eq!(config.dataset_file(), "/tmp/other.json");
    }
}
