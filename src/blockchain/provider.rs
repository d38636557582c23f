//! The seam between the orchestrator and whatever talks to the ledger.
//!
//! The alloy-backed [`BlockchainClient`](crate::blockchain::BlockchainClient)
//! is the production implementation; tests plug in an in-memory ledger.

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::blockchain::types::{BlockchainResult, ChainId, LedgerCall, ProviderNotice, ReceiptSummary};

/// Wallet-like access to a remote ledger.
#[async_trait]
pub trait LedgerProvider: Send + Sync {
    /// Currently active network.
    async fn chain_id(&self) -> BlockchainResult<ChainId>;

    /// Ask the provider to switch its active network.
    async fn switch_chain(&self, target: ChainId) -> BlockchainResult<()>;

    /// Request account authorization; the first entry is the active account.
    async fn request_accounts(&self) -> BlockchainResult<Vec<Address>>;

    /// Dispatch a state-changing call. Returns once the ledger accepted it.
    async fn send_call(&self, from: Address, call: &LedgerCall) -> BlockchainResult<TxHash>;

    /// Wait until `tx_hash` has `confirmations` confirmations.
    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> BlockchainResult<ReceiptSummary>;

    /// One-shot receipt lookup.
    async fn receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<ReceiptSummary>>;

    /// Open a stream of contract events and provider notices.
    async fn subscribe_events(&self) -> BlockchainResult<EventStream>;
}

/// A live event subscription.
///
/// Dropping the stream stops the background task feeding it, if any.
#[derive(Debug)]
pub struct EventStream {
    notices: mpsc::Receiver<ProviderNotice>,
    task: Option<JoinHandle<()>>,
}

impl EventStream {
    /// Stream backed by a background task that owns the sending half.
    pub fn with_task(notices: mpsc::Receiver<ProviderNotice>, task: JoinHandle<()>) -> Self {
        Self {
            notices,
            task: Some(task),
        }
    }

    /// Stream fed by an external sender.
    pub fn from_receiver(notices: mpsc::Receiver<ProviderNotice>) -> Self {
        Self { notices, task: None }
    }

    /// Next notice, `None` once the sender side is gone.
    pub async fn recv(&mut self) -> Option<ProviderNotice> {
        self.notices.recv().await
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
