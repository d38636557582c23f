//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.
//! Defaults target the Sepolia deployment of the age verification contract.

use serde::{Deserialize, Serialize};

/// Sepolia chain ID.
pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;

/// Address of the deployed age verification contract on Sepolia.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x3732Bcf0bf4E92356fc0DC19B6b373846f04c44b";

/// Environment variable consulted for a local signing key.
pub const DEFAULT_PRIVATE_KEY_ENV: &str = "AGE_GATE_PRIVATE_KEY";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Target network and RPC endpoints.
    pub network: NetworkConfig,

    /// Contract binding and event polling.
    pub contract: ContractConfig,

    /// Confirmation wait policy.
    pub confirmation: ConfirmationConfig,

    /// Signing key source.
    pub wallet: WalletConfig,

    /// Presentation settings consumed by the front end.
    pub ui: UiConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Target network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Chain ID the client must be connected to before sending anything.
    pub chain_id: u64,

    /// Human readable network name shown after connecting.
    pub chain_name: String,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs (read-only calls).
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            chain_name: "Sepolia".to_string(),
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            rpc_timeout_secs: 10,
        }
    }
}

/// Contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Address of the age verification contract.
    pub address: String,

    /// Event polling interval in milliseconds.
    pub event_poll_interval_ms: u64,

    /// Consecutive log polling failures before the provider is considered gone.
    pub max_poll_failures: u32,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            event_poll_interval_ms: 4000,
            max_poll_failures: 5,
        }
    }
}

/// Confirmation wait configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Number of block confirmations to wait for.
    pub blocks: u64,

    /// Upper bound on the confirmation wait in seconds.
    pub timeout_secs: u64,

    /// Query the receipt once more when a confirmation wait fails.
    pub reconcile_on_failure: bool,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            blocks: 1,
            timeout_secs: 180,
            reconcile_on_failure: false,
        }
    }
}

/// Wallet configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Name of the environment variable holding a hex private key.
    /// When unset the RPC endpoint is treated as an injected wallet.
    pub private_key_env: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: DEFAULT_PRIVATE_KEY_ENV.to_string(),
        }
    }
}

/// Presentation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UiConfig {
    /// Rotation period of the filler messages shown during long waits.
    pub filler_interval_ms: u64,

    /// Minimum age classified as adult.
    pub adult_threshold: i64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            filler_interval_ms: 1200,
            adult_threshold: 18,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive (overridden by `RUST_LOG`).
    pub log_filter: String,

    /// Prometheus listener address, metrics are not exported when absent.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "age_gate=info".to_string(),
            metrics_address: None,
        }
    }
}
