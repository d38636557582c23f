//! Client for the age verification contract.
//!
//! Connects to a wallet-like ledger provider on the target network, submits
//! pseudo-encrypted values, requests checks, and reports the classified
//! results of the events the contract emits.

pub mod blockchain;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod orchestrator;
pub mod resilience;
pub mod status;

pub use config::AppConfig;
pub use orchestrator::{OrchestratorError, TransactionOrchestrator};
