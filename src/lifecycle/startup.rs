//! Startup sequence.
//!
//! Config first, then logging and metrics, then the ledger client and the
//! orchestrator. Any startup error is fatal.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::blockchain::{BlockchainClient, BlockchainError};
use crate::config::{load_or_default, AppConfig, ConfigError};
use crate::observability::{logging, metrics};
use crate::orchestrator::{OrchestratorSettings, TransactionOrchestrator};
use crate::status::StatusSink;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("metrics exporter: {0}")]
    Metrics(String),

    #[error("blockchain client: {0}")]
    Client(#[from] BlockchainError),
}

/// Load configuration and install logging and metrics.
pub fn bootstrap(config_path: Option<&Path>) -> Result<AppConfig, StartupError> {
    let config = load_or_default(config_path)?;

    // A subscriber may already be installed (tests, embedding).
    let _ = logging::init_logging(&config.observability.log_filter);

    if let Some(addr) = &config.observability.metrics_address {
        let addr = addr
            .parse()
            .map_err(|e| StartupError::Metrics(format!("invalid address '{}': {}", addr, e)))?;
        metrics::init_metrics(addr).map_err(|e| StartupError::Metrics(e.to_string()))?;
    }

    tracing::info!(
        chain_id = config.network.chain_id,
        rpc_url = %config.network.rpc_url,
        contract = %config.contract.address,
        "Configuration loaded"
    );
    Ok(config)
}

/// Build the alloy client and the orchestrator on top of it.
pub fn build_orchestrator(
    config: &AppConfig,
    sink: Arc<dyn StatusSink>,
) -> Result<TransactionOrchestrator, StartupError> {
    let client = BlockchainClient::new(config)?;
    Ok(TransactionOrchestrator::new(
        Arc::new(client),
        sink,
        OrchestratorSettings::from(config),
    ))
}
