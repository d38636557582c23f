//! Chain-specific types and error definitions.

use alloy::primitives::{Address, Bytes, TxHash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Hex form used by wallet RPC methods (`0xaa36a7`).
    pub fn to_hex(self) -> String {
        format!("{:#x}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors reported by a ledger provider.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// No provider is reachable.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// The wallet or node declined the request.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Invalid private key format or derivation error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// A log could not be decoded against the contract ABI.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// A state-changing call against the age verification contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    /// `setEncryptedAge(bytes)`.
    SubmitValue(Bytes),
    /// `requestCheck(address)`.
    RequestCheck(Address),
}

/// Summary of a mined transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptSummary {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// `false` when the transaction reverted.
    pub success: bool,
}

/// An `AgeCheckRequested` log as delivered by the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedEvent {
    /// Subject of the check.
    pub subject: Address,
    /// Opaque ciphertext bytes.
    pub payload: Bytes,
    /// Transaction that emitted the event.
    pub tx_hash: Option<TxHash>,
}

/// Notifications pushed by a provider's event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderNotice {
    /// A decoded contract event.
    Event(ObservedEvent),
    /// A log matched the event filter but failed ABI decoding.
    Malformed {
        tx_hash: Option<TxHash>,
        reason: String,
    },
    /// The provider reports a different active chain.
    ChainChanged(ChainId),
    /// The provider went away.
    Disconnected,
}
