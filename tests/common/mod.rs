//! Shared fixtures: a scriptable in-memory ledger and a recording sink.

#![allow(dead_code)]

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

use age_gate::blockchain::{
    BlockchainError, BlockchainResult, ChainId, EventStream, LedgerCall, LedgerProvider,
    ProviderNotice, ReceiptSummary,
};
use age_gate::orchestrator::{
    ConnectionStatus, EventReport, OrchestratorSettings, TransactionOrchestrator,
};
use age_gate::status::{SinkMessage, StatusSink, StatusUpdate};

pub const SEPOLIA: ChainId = ChainId(11_155_111);
pub const MAINNET: ChainId = ChainId(1);

pub fn account() -> Address {
    Address::repeat_byte(0xaa)
}

pub fn tx_hash(n: u8) -> TxHash {
    TxHash::repeat_byte(n)
}

pub fn settings() -> OrchestratorSettings {
    OrchestratorSettings {
        target_chain: SEPOLIA,
        chain_name: "Sepolia".to_string(),
        confirmations: 1,
        confirmation_timeout: Duration::from_secs(5),
        reconcile_on_failure: false,
        adult_threshold: 18,
    }
}

pub fn receipt(tx_hash: TxHash, success: bool) -> ReceiptSummary {
    ReceiptSummary {
        tx_hash,
        block_number: Some(7),
        gas_used: 45_000,
        success,
    }
}

/// How the mock answers `send_call`.
#[derive(Debug, Clone)]
pub enum SendBehavior {
    Accept(TxHash),
    Reject(String),
}

/// How the mock answers `wait_for_confirmation`.
#[derive(Debug, Clone)]
pub enum ConfirmBehavior {
    Confirm,
    Revert,
    Fail(String),
    Hang,
    /// Wait until `MockLedger::release` or `release_tx` lets the hash through, then confirm.
    Gated,
}

#[derive(Default)]
struct Released {
    all: bool,
    hashes: Vec<TxHash>,
}

pub struct MockLedger {
    available: AtomicBool,
    chain: Mutex<ChainId>,
    switch_accepts: AtomicBool,
    accounts: Mutex<BlockchainResult<Vec<Address>>>,
    send: Mutex<SendBehavior>,
    confirm: Mutex<ConfirmBehavior>,
    late_receipt: Mutex<Option<ReceiptSummary>>,
    queued_hashes: Mutex<VecDeque<TxHash>>,
    released: Mutex<Released>,
    gate: Notify,
    pub subscribe_calls: AtomicUsize,
    pub switch_calls: AtomicUsize,
    pub sent: Mutex<Vec<(Address, LedgerCall)>>,
    pub waited: Mutex<Vec<TxHash>>,
    streams: Mutex<Vec<mpsc::Sender<ProviderNotice>>>,
}

impl MockLedger {
    pub fn new(chain: ChainId) -> Arc<Self> {
        Arc::new(Self {
            available: AtomicBool::new(true),
            chain: Mutex::new(chain),
            switch_accepts: AtomicBool::new(true),
            accounts: Mutex::new(Ok(vec![account()])),
            send: Mutex::new(SendBehavior::Accept(tx_hash(0x11))),
            confirm: Mutex::new(ConfirmBehavior::Confirm),
            late_receipt: Mutex::new(None),
            queued_hashes: Mutex::new(VecDeque::new()),
            released: Mutex::new(Released::default()),
            gate: Notify::new(),
            subscribe_calls: AtomicUsize::new(0),
            switch_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            waited: Mutex::new(Vec::new()),
            streams: Mutex::new(Vec::new()),
        })
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_switch_accepts(&self, accepts: bool) {
        self.switch_accepts.store(accepts, Ordering::SeqCst);
    }

    pub fn set_accounts(&self, accounts: BlockchainResult<Vec<Address>>) {
        *self.accounts.lock().unwrap() = accounts;
    }

    pub fn set_send(&self, behavior: SendBehavior) {
        *self.send.lock().unwrap() = behavior;
    }

    pub fn set_confirm(&self, behavior: ConfirmBehavior) {
        *self.confirm.lock().unwrap() = behavior;
    }

    pub fn set_late_receipt(&self, receipt: Option<ReceiptSummary>) {
        *self.late_receipt.lock().unwrap() = receipt;
    }

    /// Hashes handed out by the next accepted sends, in order.
    pub fn queue_tx_hashes(&self, hashes: &[TxHash]) {
        self.queued_hashes.lock().unwrap().extend(hashes.iter().copied());
    }

    /// Let every gated confirmation through.
    pub fn release(&self) {
        self.released.lock().unwrap().all = true;
        self.gate.notify_waiters();
    }

    /// Let the gated confirmation of `tx_hash` through.
    pub fn release_tx(&self, tx_hash: TxHash) {
        self.released.lock().unwrap().hashes.push(tx_hash);
        self.gate.notify_waiters();
    }

    /// Drop the sending side of every subscription.
    pub fn close_streams(&self) {
        self.streams.lock().unwrap().clear();
    }

    fn is_released(&self, tx_hash: TxHash) -> bool {
        let released = self.released.lock().unwrap();
        released.all || released.hashes.contains(&tx_hash)
    }

    pub fn open_streams(&self) -> usize {
        self.streams
            .lock()
            .unwrap()
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }

    /// Push a notice into the most recent subscription.
    pub async fn emit(&self, notice: ProviderNotice) {
        let tx = self.streams.lock().unwrap().last().cloned();
        tx.expect("no subscription registered")
            .send(notice)
            .await
            .expect("subscription closed");
    }

    fn check_available(&self) -> BlockchainResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BlockchainError::Unavailable("no wallet injected".into()))
        }
    }
}

#[async_trait]
impl LedgerProvider for MockLedger {
    async fn chain_id(&self) -> BlockchainResult<ChainId> {
        self.check_available()?;
        Ok(*self.chain.lock().unwrap())
    }

    async fn switch_chain(&self, target: ChainId) -> BlockchainResult<()> {
        self.check_available()?;
        self.switch_calls.fetch_add(1, Ordering::SeqCst);
        if self.switch_accepts.load(Ordering::SeqCst) {
            *self.chain.lock().unwrap() = target;
            Ok(())
        } else {
            Err(BlockchainError::Rejected("user rejected the request".into()))
        }
    }

    async fn request_accounts(&self) -> BlockchainResult<Vec<Address>> {
        self.check_available()?;
        match &*self.accounts.lock().unwrap() {
            Ok(accounts) => Ok(accounts.clone()),
            Err(e) => Err(BlockchainError::Rejected(e.to_string())),
        }
    }

    async fn send_call(&self, from: Address, call: &LedgerCall) -> BlockchainResult<TxHash> {
        self.check_available()?;
        let behavior = self.send.lock().unwrap().clone();
        match behavior {
            SendBehavior::Accept(hash) => {
                self.sent.lock().unwrap().push((from, call.clone()));
                let queued = self.queued_hashes.lock().unwrap().pop_front();
                Ok(queued.unwrap_or(hash))
            }
            SendBehavior::Reject(reason) => Err(BlockchainError::Rejected(reason)),
        }
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        _confirmations: u64,
    ) -> BlockchainResult<ReceiptSummary> {
        self.waited.lock().unwrap().push(tx_hash);
        let behavior = self.confirm.lock().unwrap().clone();
        match behavior {
            ConfirmBehavior::Confirm => Ok(receipt(tx_hash, true)),
            ConfirmBehavior::Revert => Ok(receipt(tx_hash, false)),
            ConfirmBehavior::Fail(reason) => Err(BlockchainError::Rpc(reason)),
            ConfirmBehavior::Hang => std::future::pending().await,
            ConfirmBehavior::Gated => loop {
                let notified = self.gate.notified();
                if self.is_released(tx_hash) {
                    return Ok(receipt(tx_hash, true));
                }
                notified.await;
            },
        }
    }

    async fn receipt(&self, _tx_hash: TxHash) -> BlockchainResult<Option<ReceiptSummary>> {
        Ok(self.late_receipt.lock().unwrap().clone())
    }

    async fn subscribe_events(&self) -> BlockchainResult<EventStream> {
        self.check_available()?;
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(16);
        self.streams.lock().unwrap().push(tx);
        Ok(EventStream::from_receiver(rx))
    }
}

/// Sink that keeps everything it is told.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<SinkMessage>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<SinkMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                SinkMessage::Connection(state) => Some(state.status),
                _ => None,
            })
            .collect()
    }

    pub fn results(&self) -> Vec<EventReport> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                SinkMessage::Result(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    pub fn status_lines(&self) -> Vec<StatusUpdate> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                SinkMessage::Status(update) => Some(update),
                _ => None,
            })
            .collect()
    }

    fn push(&self, message: SinkMessage) {
        self.messages.lock().unwrap().push(message);
    }
}

impl StatusSink for RecordingSink {
    fn status(&self, update: StatusUpdate) {
        self.push(SinkMessage::Status(update));
    }

    fn connection_changed(&self, state: &age_gate::orchestrator::ConnectionState) {
        self.push(SinkMessage::Connection(state.clone()));
    }

    fn operation_started(&self, kind: age_gate::orchestrator::OperationKind) {
        self.push(SinkMessage::Started(kind));
    }

    fn operation_ended(&self, kind: age_gate::orchestrator::OperationKind) {
        self.push(SinkMessage::Ended(kind));
    }

    fn result(&self, report: &EventReport) {
        self.push(SinkMessage::Result(report.clone()));
    }
}

pub fn orchestrator(
    ledger: &Arc<MockLedger>,
    sink: &Arc<RecordingSink>,
    settings: OrchestratorSettings,
) -> TransactionOrchestrator {
    TransactionOrchestrator::new(ledger.clone(), sink.clone(), settings)
}

/// Poll `condition` until it holds or a second passes.
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Run `fut` in the background and hand back its handle.
pub fn background<F>(fut: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(fut)
}
