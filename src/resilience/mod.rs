//! Resilience helpers for calls against the remote ledger.
//!
//! # Data Flow
//! ```text
//! blockchain/client.rs
//!     → timeouts.rs (every RPC bounded by network.rpc_timeout_secs)
//! blockchain/subscription.rs
//!     → backoff.rs (log poll retries after RPC errors)
//! orchestrator
//!     → timeouts.rs (confirmation wait bounded by confirmation.timeout_secs)
//! ```

pub mod backoff;
pub mod timeouts;

pub use backoff::calculate_backoff;
pub use timeouts::{bounded, Elapsed};
