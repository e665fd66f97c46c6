//! Configuration module
//!
//! Static external configuration: which node to read from, which contract
//! to talk to, and purchase policy knobs. Loaded from a TOML file with
//! environment variable overrides.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Fullnode RPC configuration
    #[serde(default)]
    pub node: NodeConfig,

    /// Bonding-curve contract coordinates
    #[serde(default)]
    pub contract: ContractConfig,

    /// Purchase policy
    #[serde(default)]
    pub purchase: PurchaseConfig,

    /// Explorer link settings
    #[serde(default)]
    pub explorer: ExplorerConfig,

    /// Monitoring and metrics
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Base URL of the node REST API; `/view` is appended
    #[serde(default = "default_node_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_node_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Account address the bonding-curve module is published under
    #[serde(default)]
    pub address: String,

    #[serde(default = "default_module")]
    pub module: String,

    #[serde(default = "default_token_symbol")]
    pub token_symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseConfig {
    /// Per-unit payment used when no quote is available.
    ///
    /// Not derived from contract state: it can over- or underpay relative
    /// to the true on-chain price. Confirm with the contract owners.
    #[serde(default = "default_fallback_unit_payment")]
    pub fallback_unit_payment: f64,

    /// Interval between quote refresh rounds in `watch` mode
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default = "default_explorer_host")]
    pub host: String,

    #[serde(default = "default_network")]
    pub network: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Serve Prometheus metrics while watching
    #[serde(default)]
    pub enable_metrics: bool,

    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

// Default value functions
fn default_node_url() -> String { "https://fullnode.testnet.aptoslabs.com/v1".to_string() }
fn default_node_timeout() -> u64 { 30 }
fn default_module() -> String { "BondingCurve".to_string() }
fn default_token_symbol() -> String { "PROMPT".to_string() }
fn default_fallback_unit_payment() -> f64 { 10.0 }
fn default_refresh_interval() -> u64 { 10 }
fn default_explorer_host() -> String { "aptoslabs.com".to_string() }
fn default_network() -> String { "testnet".to_string() }
fn default_metrics_port() -> u16 { 9090 }

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: default_node_url(),
            timeout_secs: default_node_timeout(),
        }
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            module: default_module(),
            token_symbol: default_token_symbol(),
        }
    }
}

impl Default for PurchaseConfig {
    fn default() -> Self {
        Self {
            fallback_unit_payment: default_fallback_unit_payment(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            host: default_explorer_host(),
            network: default_network(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: false,
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            contract: ContractConfig::default(),
            purchase: PurchaseConfig::default(),
            explorer: ExplorerConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl ContractConfig {
    /// `<address>::<module>::<name>`
    pub fn function_id(&self, name: &str) -> String {
        format!("{}::{}::{}", self.address, self.module, name)
    }

    pub fn price_function(&self) -> String {
        self.function_id("get_token_price")
    }

    pub fn supply_function(&self) -> String {
        self.function_id("get_token_supply")
    }

    pub fn buy_function(&self) -> String {
        self.function_id("buy_token")
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;
        Ok(config)
    }

    /// Load configuration with `.env` and environment variable overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// `CONTRACT_ADDRESS` and `NODE_URL` take precedence over the file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(address) = std::env::var("CONTRACT_ADDRESS") {
            if !address.trim().is_empty() {
                self.contract.address = address.trim().to_string();
            }
        }
        if let Ok(url) = std::env::var("NODE_URL") {
            if !url.trim().is_empty() {
                self.node.url = url.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.contract.address.trim().is_empty() {
            bail!("contract.address is not set (set it in the config file or CONTRACT_ADDRESS)");
        }
        if self.node.url.trim().is_empty() {
            bail!("node.url must not be empty");
        }
        if self.contract.token_symbol.trim().is_empty() {
            bail!("contract.token_symbol must not be empty");
        }
        let fallback = self.purchase.fallback_unit_payment;
        if !fallback.is_finite() || fallback < 0.0 {
            bail!(
                "purchase.fallback_unit_payment must be a finite non-negative number, got {}",
                fallback
            );
        }
        if self.node.timeout_secs == 0 {
            bail!("node.timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.node.url, "https://fullnode.testnet.aptoslabs.com/v1");
        assert_eq!(config.contract.module, "BondingCurve");
        assert_eq!(config.contract.token_symbol, "PROMPT");
        assert_eq!(config.purchase.fallback_unit_payment, 10.0);
        assert_eq!(config.explorer.network, "testnet");
        // No address by default
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_function_ids() {
        let contract = ContractConfig {
            address: "0xabc".to_string(),
            ..ContractConfig::default()
        };
        assert_eq!(contract.price_function(), "0xabc::BondingCurve::get_token_price");
        assert_eq!(contract.supply_function(), "0xabc::BondingCurve::get_token_supply");
        assert_eq!(contract.buy_function(), "0xabc::BondingCurve::buy_token");
    }

    #[test]
    fn test_from_file_minimal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[contract]\naddress = \"0x42\"").unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.contract.address, "0x42");
        assert_eq!(config.contract.token_symbol, "PROMPT");
        assert_eq!(config.node.timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_full() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[node]
url = "http://localhost:8080/v1"
timeout_secs = 5

[contract]
address = "0x7"
module = "Curve"
token_symbol = "ABC"

[purchase]
fallback_unit_payment = 25.0
refresh_interval_secs = 3

[explorer]
host = "example.org"
network = "devnet"

[monitoring]
enable_metrics = true
metrics_port = 9100
"#
        )
        .unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.node.url, "http://localhost:8080/v1");
        assert_eq!(config.contract.buy_function(), "0x7::Curve::buy_token");
        assert_eq!(config.purchase.fallback_unit_payment, 25.0);
        assert_eq!(config.explorer.host, "example.org");
        assert!(config.monitoring.enable_metrics);
        assert_eq!(config.monitoring.metrics_port, 9100);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(Config::from_file("/nonexistent/curve-buyer.toml").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_fallback() {
        let mut config = Config::default();
        config.contract.address = "0x1".to_string();
        config.purchase.fallback_unit_payment = -1.0;
        assert!(config.validate().is_err());

        config.purchase.fallback_unit_payment = f64::NAN;
        assert!(config.validate().is_err());

        config.purchase.fallback_unit_payment = 0.0;
        assert!(config.validate().is_ok());
    }
}
