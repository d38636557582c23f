//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment variable (optional private key)
//!     → wallet.rs (key loading)
//!     → client.rs (RPC connection with timeouts, wallet requests, call dispatch)
//!     → contract.rs (ABI encoding of calls, decoding of events)
//!     → subscription.rs (log polling → ProviderNotice stream)
//! ```
//!
//! The orchestrator only sees the [`LedgerProvider`] trait.
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All read RPC calls have configurable timeouts

pub mod client;
pub mod contract;
pub mod provider;
pub mod subscription;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use provider::{EventStream, LedgerProvider};
pub use types::{
    BlockchainError, BlockchainResult, ChainId, LedgerCall, ObservedEvent, ProviderNotice,
    ReceiptSummary,
};
pub use wallet::Wallet;
