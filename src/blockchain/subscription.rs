//! Event log polling.
//!
//! Polls `eth_getLogs` for `AgeCheckRequested` on the configured contract and
//! turns what it sees into [`ProviderNotice`]s. Starts at the current head:
//! only events emitted after subscribing are delivered.

use alloy::primitives::Address;
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::contract::{decode_event, AgeVerifier};
use crate::blockchain::provider::{EventStream, LedgerProvider};
use crate::blockchain::types::{BlockchainResult, ChainId, ProviderNotice};
use crate::config::ContractConfig;
use crate::resilience::calculate_backoff;

/// Notice buffer between the poller and the orchestrator.
const NOTICE_BUFFER: usize = 64;

/// Background task feeding an [`EventStream`].
pub struct LogPoller {
    client: BlockchainClient,
    contract: Address,
    interval: Duration,
    max_failures: u32,
    last_block: Option<u64>,
    last_chain: ChainId,
}

impl LogPoller {
    /// Create a poller that expects the provider to stay on `chain`.
    pub fn new(client: BlockchainClient, config: &ContractConfig, chain: ChainId) -> Self {
        Self {
            contract: client.contract_address(),
            client,
            interval: Duration::from_millis(config.event_poll_interval_ms),
            max_failures: config.max_poll_failures,
            last_block: None,
            last_chain: chain,
        }
    }

    /// Start polling on the runtime. Dropping the returned stream stops it.
    pub fn spawn(self) -> EventStream {
        let (tx, rx) = mpsc::channel(NOTICE_BUFFER);
        let task = tokio::spawn(self.run(tx));
        EventStream::with_task(rx, task)
    }

    async fn run(mut self, tx: mpsc::Sender<ProviderNotice>) {
        tracing::info!(contract = %self.contract, "Starting event poller");
        let mut failures = 0u32;

        loop {
            match self.poll_once(&tx).await {
                Ok(true) => {
                    failures = 0;
                    sleep(self.interval).await;
                }
                Ok(false) => {
                    tracing::debug!("Event stream closed, stopping poller");
                    return;
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(error = %e, failures, "Event poll failed");
                    if failures >= self.max_failures {
                        tracing::error!(failures, "Provider unreachable, reporting disconnect");
                        let _ = tx.send(ProviderNotice::Disconnected).await;
                        return;
                    }
                    sleep(calculate_backoff(failures, self.interval, self.interval * 8)).await;
                }
            }
        }
    }

    /// One poll round. `Ok(false)` once the receiving side has gone away.
    async fn poll_once(&mut self, tx: &mpsc::Sender<ProviderNotice>) -> BlockchainResult<bool> {
        let chain = self.client.chain_id().await?;
        if let Some(notice) = self.observe_chain(chain) {
            if tx.send(notice).await.is_err() {
                return Ok(false);
            }
        }

        let current_block = self.client.block_number().await?;
        let from_block = match self.last_block {
            Some(last) if current_block <= last => return Ok(!tx.is_closed()),
            Some(last) => last + 1,
            None => {
                tracing::debug!(block = current_block, "Event poller anchored at head");
                self.last_block = Some(current_block);
                return Ok(!tx.is_closed());
            }
        };

        let filter = Filter::new()
            .address(self.contract)
            .from_block(from_block)
            .to_block(current_block)
            .event(AgeVerifier::AgeCheckRequested::SIGNATURE);

        let logs = self.client.logs(&filter).await?;

        for log in logs {
            if tx.send(notice_for_log(&log)).await.is_err() {
                return Ok(false);
            }
        }

        self.last_block = Some(current_block);
        Ok(true)
    }

    /// `ChainChanged` when the provider left the network it was last seen on.
    fn observe_chain(&mut self, chain: ChainId) -> Option<ProviderNotice> {
        if chain == self.last_chain {
            return None;
        }
        tracing::warn!(from = %self.last_chain, to = %chain, "Provider changed network");
        self.last_chain = chain;
        Some(ProviderNotice::ChainChanged(chain))
    }
}

/// Decoded event, or `Malformed` when the log does not decode.
fn notice_for_log(log: &Log) -> ProviderNotice {
    match decode_event(log) {
        Ok(event) => {
            tracing::debug!(subject = %event.subject, tx_hash = ?event.tx_hash, "AgeCheckRequested seen");
            ProviderNotice::Event(event)
        }
        Err(e) => ProviderNotice::Malformed {
            tx_hash: log.transaction_hash,
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use alloy::primitives::{Bytes, TxHash};

    fn offline_config() -> AppConfig {
        let mut config = AppConfig::default();
        // Nothing listens here
        config.network.rpc_url = "http://127.0.0.1:9".to_string();
        config.network.rpc_timeout_secs = 1;
        config.wallet.private_key_env = "AGE_GATE_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        config.contract.event_poll_interval_ms = 10;
        config.contract.max_poll_failures = 3;
        config
    }

    fn offline_poller() -> LogPoller {
        let config = offline_config();
        let client = BlockchainClient::new(&config).unwrap();
        LogPoller::new(client, &config.contract, ChainId(config.network.chain_id))
    }

    #[tokio::test]
    async fn test_unreachable_provider_reports_disconnect() {
        let mut stream = offline_poller().spawn();

        let first = tokio::time::timeout(Duration::from_secs(10), stream.recv())
            .await
            .unwrap();
        assert_eq!(first, Some(ProviderNotice::Disconnected));

        let after = tokio::time::timeout(Duration::from_secs(1), stream.recv())
            .await
            .unwrap();
        assert_eq!(after, None, "poller should stop after reporting");
    }

    #[test]
    fn test_chain_change_reported_once() {
        let mut poller = offline_poller();
        let sepolia = poller.last_chain;

        assert_eq!(poller.observe_chain(sepolia), None);
        assert_eq!(
            poller.observe_chain(ChainId(1)),
            Some(ProviderNotice::ChainChanged(ChainId(1)))
        );
        assert_eq!(poller.observe_chain(ChainId(1)), None);
        assert_eq!(
            poller.observe_chain(sepolia),
            Some(ProviderNotice::ChainChanged(sepolia))
        );
    }

    #[test]
    fn test_undecodable_log_is_malformed() {
        let log = Log {
            transaction_hash: Some(TxHash::repeat_byte(3)),
            ..Default::default()
        };

        match notice_for_log(&log) {
            ProviderNotice::Malformed { tx_hash, reason } => {
                assert_eq!(tx_hash, Some(TxHash::repeat_byte(3)));
                assert!(!reason.is_empty());
            }
            other => panic!("unexpected notice {:?}", other),
        }
    }

    #[test]
    fn test_decodable_log_is_event() {
        let user = Address::repeat_byte(0x11);
        let event = AgeVerifier::AgeCheckRequested {
            user,
            ciphertext: Bytes::from_static(b"encrypted:19"),
        };
        let log = Log {
            inner: alloy::primitives::Log {
                address: Address::ZERO,
                data: event.encode_log_data(),
            },
            transaction_hash: Some(TxHash::repeat_byte(4)),
            ..Default::default()
        };

        match notice_for_log(&log) {
            ProviderNotice::Event(observed) => {
                assert_eq!(observed.subject, user);
                assert_eq!(observed.payload.as_ref(), b"encrypted:19");
                assert_eq!(observed.tx_hash, Some(TxHash::repeat_byte(4)));
            }
            other => panic!("unexpected notice {:?}", other),
        }
    }
}
