//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to the JSON-RPC endpoint (primary + read-only failovers)
//! - Query chain state (chain id, block number, receipts, logs)
//! - Relay wallet requests (network switch, account authorization)
//! - Dispatch contract calls and poll for their confirmation

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log, TransactionReceipt, TransactionRequest};
use alloy::transports::{TransportError, TransportResult};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, sleep};

use crate::blockchain::contract::encode_call;
use crate::blockchain::provider::{EventStream, LedgerProvider};
use crate::blockchain::subscription::LogPoller;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ChainId, LedgerCall, ReceiptSummary,
};
use crate::blockchain::wallet::Wallet;
use crate::config::{AppConfig, ContractConfig};
use crate::resilience::{bounded, calculate_backoff};

/// Receipt polling period while waiting for confirmations.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Upper bound on the delay between receipt polls after read failures.
const MAX_RECEIPT_BACKOFF: Duration = Duration::from_secs(30);

/// EIP-1193 "user rejected request" error code.
const USER_REJECTED_CODE: i64 = 4001;

/// Alloy-backed ledger provider with failover for read calls.
#[derive(Clone)]
pub struct BlockchainClient {
    /// Primary provider first, then failovers.
    providers: Vec<DynProvider>,
    /// Local signer, `None` when the endpoint is an injected wallet.
    wallet: Option<Wallet>,
    /// Age verification contract.
    contract: Address,
    /// Event polling settings.
    contract_config: ContractConfig,
    /// RPC endpoint for diagnostics.
    rpc_url: String,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new client from validated configuration.
    ///
    /// No network traffic happens here; reachability is discovered on the
    /// first call.
    pub fn new(config: &AppConfig) -> BlockchainResult<Self> {
        let wallet = Wallet::from_env(&config.wallet.private_key_env)?;
        let contract: Address = config.contract.address.parse().map_err(|e| {
            BlockchainError::Rpc(format!(
                "Invalid contract address '{}': {}",
                config.contract.address, e
            ))
        })?;

        let primary_url: url::Url = config.network.rpc_url.parse().map_err(|e| {
            BlockchainError::Unavailable(format!(
                "Invalid RPC URL '{}': {}",
                config.network.rpc_url, e
            ))
        })?;

        let primary = match &wallet {
            Some(wallet) => ProviderBuilder::new()
                .wallet(wallet.network_wallet())
                .connect_http(primary_url)
                .erased(),
            None => ProviderBuilder::new().connect_http(primary_url).erased(),
        };

        let mut providers = vec![primary];
        for url_str in &config.network.failover_urls {
            match url_str.parse::<url::Url>() {
                Ok(url) => providers.push(ProviderBuilder::new().connect_http(url).erased()),
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        tracing::info!(
            rpc_url = %config.network.rpc_url,
            failovers = providers.len() - 1,
            local_signer = wallet.is_some(),
            contract = %contract,
            "Blockchain client initialized"
        );

        Ok(Self {
            providers,
            wallet,
            contract,
            contract_config: config.contract.clone(),
            rpc_url: config.network.rpc_url.clone(),
            timeout_duration: Duration::from_secs(config.network.rpc_timeout_secs),
        })
    }

    /// Contract the client talks to.
    pub fn contract_address(&self) -> Address {
        self.contract
    }

    fn primary(&self) -> &DynProvider {
        &self.providers[0]
    }

    /// Run a read-only call against each provider in turn until one answers.
    async fn read<T, F, Fut>(&self, what: &'static str, call: F) -> BlockchainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        for (i, provider) in self.providers.iter().enumerate() {
            match bounded(self.timeout_duration, call(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, call = what, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, call = what, "RPC timeout, trying next provider");
                }
            }
        }
        Err(BlockchainError::Unavailable(format!(
            "All RPC providers failed to {}",
            what
        )))
    }

    /// Latest block number.
    pub(crate) async fn block_number(&self) -> BlockchainResult<u64> {
        self.read("get block number", |p| async move { p.get_block_number().await })
            .await
    }

    /// Logs matching `filter`.
    pub(crate) async fn logs(&self, filter: &Filter) -> BlockchainResult<Vec<Log>> {
        self.read("get logs", |p| {
            let filter = filter.clone();
            async move { p.get_logs(&filter).await }
        })
        .await
    }

    async fn raw_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<TransactionReceipt>> {
        self.read("get receipt", |p| async move {
            p.get_transaction_receipt(tx_hash).await
        })
        .await
    }

    /// Wallet-style request on the primary provider, bounded by the RPC timeout.
    async fn wallet_request<R>(
        &self,
        method: &'static str,
        params: serde_json::Value,
    ) -> BlockchainResult<R>
    where
        R: serde::de::DeserializeOwned + std::fmt::Debug + Send + Sync + Unpin + 'static,
    {
        let request = self.primary().raw_request::<_, R>(method.into(), params);
        match bounded(self.timeout_duration, request).await {
            Ok(result) => result.map_err(classify_rpc_error),
            Err(_) => Err(BlockchainError::Timeout(self.timeout_duration.as_secs())),
        }
    }

    /// Back off before the next receipt poll.
    async fn pause_after_failure(&self, tx_hash: TxHash, failures: u32, error: &BlockchainError) {
        let delay = calculate_backoff(failures, RECEIPT_POLL_INTERVAL, MAX_RECEIPT_BACKOFF);
        tracing::warn!(
            tx_hash = %tx_hash,
            failures,
            error = %error,
            retry_in_ms = delay.as_millis() as u64,
            "Receipt poll failed, retrying"
        );
        sleep(delay).await;
    }
}

/// Map a transport error to a provider error.
///
/// JSON-RPC error responses mean the endpoint answered and declined; anything
/// else means it could not be reached.
fn classify_rpc_error(e: TransportError) -> BlockchainError {
    match e.as_error_resp() {
        Some(payload) if payload.code == USER_REJECTED_CODE => {
            BlockchainError::Rejected(format!("user rejected: {}", payload.message))
        }
        Some(payload) => BlockchainError::Rejected(payload.message.to_string()),
        None => BlockchainError::Rpc(e.to_string()),
    }
}

fn summarize(receipt: &TransactionReceipt) -> ReceiptSummary {
    ReceiptSummary {
        tx_hash: receipt.transaction_hash,
        block_number: receipt.block_number,
        gas_used: receipt.gas_used,
        success: receipt.status(),
    }
}

#[async_trait]
impl LedgerProvider for BlockchainClient {
    async fn chain_id(&self) -> BlockchainResult<ChainId> {
        self.read("get chain id", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    async fn switch_chain(&self, target: ChainId) -> BlockchainResult<()> {
        let params = serde_json::json!([{ "chainId": target.to_hex() }]);
        let _: serde_json::Value = self
            .wallet_request("wallet_switchEthereumChain", params)
            .await?;
        tracing::info!(chain_id = %target, "Provider switched network");
        Ok(())
    }

    async fn request_accounts(&self) -> BlockchainResult<Vec<Address>> {
        if let Some(wallet) = &self.wallet {
            return Ok(vec![wallet.address()]);
        }
        self.wallet_request("eth_requestAccounts", serde_json::json!([]))
            .await
    }

    async fn send_call(&self, from: Address, call: &LedgerCall) -> BlockchainResult<TxHash> {
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(self.contract)
            .with_input(encode_call(call));

        // Not bounded: an injected wallet may wait on the user.
        let pending = self
            .primary()
            .send_transaction(tx)
            .await
            .map_err(classify_rpc_error)?;

        Ok(*pending.tx_hash())
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> BlockchainResult<ReceiptSummary> {
        let mut ticker = interval(RECEIPT_POLL_INTERVAL);
        let mut failures = 0u32;

        loop {
            ticker.tick().await;

            // Read failures are transient here; the caller bounds the whole wait.
            let receipt = match self.raw_receipt(tx_hash).await {
                Ok(Some(r)) => r,
                Ok(None) => {
                    failures = 0;
                    tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                    continue;
                }
                Err(e) => {
                    failures += 1;
                    self.pause_after_failure(tx_hash, failures, &e).await;
                    continue;
                }
            };

            if !receipt.status() {
                return Ok(summarize(&receipt));
            }

            let current_block = match self.block_number().await {
                Ok(block) => block,
                Err(e) => {
                    failures += 1;
                    self.pause_after_failure(tx_hash, failures, &e).await;
                    continue;
                }
            };
            failures = 0;

            let tx_block = receipt.block_number.unwrap_or(current_block);
            // The inclusion block counts as the first confirmation.
            let confirmed = current_block.saturating_sub(tx_block) + 1;

            if confirmed >= confirmations {
                return Ok(summarize(&receipt));
            }

            tracing::debug!(
                tx_hash = %tx_hash,
                confirmations = confirmed,
                required = confirmations,
                "Waiting for confirmations"
            );
        }
    }

    async fn receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<ReceiptSummary>> {
        Ok(self.raw_receipt(tx_hash).await?.as_ref().map(summarize))
    }

    async fn subscribe_events(&self) -> BlockchainResult<EventStream> {
        let expected = LedgerProvider::chain_id(self).await?;
        Ok(LogPoller::new(self.clone(), &self.contract_config, expected).spawn())
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.rpc_url)
            .field("providers", &self.providers.len())
            .field("contract", &self.contract)
            .field("local_signer", &self.wallet.is_some())
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}
