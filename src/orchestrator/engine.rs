//! The transaction orchestrator.
//!
//! # Responsibilities
//! - Connect to the provider on the target network and authorize an account
//! - Keep exactly one event subscription per live connection
//! - Dispatch contract calls and wait for their confirmation
//! - Classify observed events and hand results to the status sink
//!
//! # State Machine
//! ```text
//! Disconnected --connect, network matches--> Connecting --authorized--> Connected
//! Disconnected --connect, network differs--> WrongNetwork
//! WrongNetwork --switch accepted, authorized--> Connected
//! Connected    --provider disconnect-------> Disconnected
//! Connected    --provider changed network--> WrongNetwork
//! ```
//! Every state is resumable with `connect()`.

use alloy::primitives::{Address, TxHash};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::blockchain::{
    BlockchainError, ChainId, EventStream, LedgerCall, LedgerProvider, ObservedEvent,
    ProviderNotice, ReceiptSummary,
};
use crate::config::AppConfig;
use crate::observability::metrics;
use crate::orchestrator::error::{ConfirmationFailure, OrchestratorError, OrchestratorResult};
use crate::orchestrator::event::{interpret, EventReport};
use crate::orchestrator::operation::{
    OperationKind, OperationStatus, PendingOperation, SubmitOutcome,
};
use crate::orchestrator::state::{ConnectionState, ConnectionStatus};
use crate::resilience::bounded;
use crate::status::{Severity, StatusSink, StatusUpdate};

/// Settings the orchestrator needs from the configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub target_chain: ChainId,
    pub chain_name: String,
    pub confirmations: u64,
    pub confirmation_timeout: Duration,
    pub reconcile_on_failure: bool,
    pub adult_threshold: i64,
}

impl From<&AppConfig> for OrchestratorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            target_chain: ChainId(config.network.chain_id),
            chain_name: config.network.chain_name.clone(),
            confirmations: config.confirmation.blocks,
            confirmation_timeout: Duration::from_secs(config.confirmation.timeout_secs),
            reconcile_on_failure: config.confirmation.reconcile_on_failure,
            adult_threshold: config.ui.adult_threshold,
        }
    }
}

/// The live event subscription and the task pumping it.
struct Subscription {
    generation: u64,
    pump: JoinHandle<()>,
}

struct Inner {
    provider: Arc<dyn LedgerProvider>,
    sink: Arc<dyn StatusSink>,
    settings: OrchestratorSettings,
    state: ArcSwap<ConnectionState>,
    /// Serializes `connect()` calls.
    connect_lock: tokio::sync::Mutex<()>,
    subscription: Mutex<Option<Subscription>>,
    subscription_active: AtomicBool,
    generation: AtomicU64,
    in_flight: DashMap<OperationKind, PendingOperation>,
}

impl Inner {
    fn subscription(&self) -> MutexGuard<'_, Option<Subscription>> {
        self.subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription().take() {
            subscription.pump.abort();
        }
    }
}

/// Handle to the orchestrator. Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct TransactionOrchestrator {
    inner: Arc<Inner>,
}

impl TransactionOrchestrator {
    /// Create an orchestrator in the `Disconnected` state.
    pub fn new(
        provider: Arc<dyn LedgerProvider>,
        sink: Arc<dyn StatusSink>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                sink,
                settings,
                state: ArcSwap::from_pointee(ConnectionState::disconnected()),
                connect_lock: tokio::sync::Mutex::new(()),
                subscription: Mutex::new(None),
                subscription_active: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                in_flight: DashMap::new(),
            }),
        }
    }

    /// Current connection snapshot.
    pub fn state(&self) -> ConnectionState {
        self.inner.state.load_full().as_ref().clone()
    }

    /// Authorized account while connected.
    pub fn account(&self) -> Option<Address> {
        self.inner.state.load().connected_account()
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.inner.settings
    }

    /// An event subscription is registered.
    pub fn is_subscribed(&self) -> bool {
        self.inner.subscription_active.load(Ordering::SeqCst)
    }

    /// The in-flight operation of `kind`, if any.
    pub fn pending(&self, kind: OperationKind) -> Option<PendingOperation> {
        self.inner.in_flight.get(&kind).map(|op| op.clone())
    }

    /// Connect to the provider on the target network.
    ///
    /// Safe to call repeatedly: an existing event subscription is reused.
    pub async fn connect(&self) -> OrchestratorResult<ConnectionState> {
        let _guard = self.inner.connect_lock.lock().await;

        let result = self.connect_locked().await;
        match &result {
            Ok(_) => metrics::record_connect("success"),
            Err(e) => metrics::record_connect(e.label()),
        }
        result
    }

    async fn connect_locked(&self) -> OrchestratorResult<ConnectionState> {
        let inner = &self.inner;
        let target = inner.settings.target_chain;
        let previous = self.state();

        let current = match inner.provider.chain_id().await {
            Ok(chain) => chain,
            Err(e) => {
                tracing::warn!(error = %e, "No wallet provider reachable");
                self.report(
                    Severity::Error,
                    "Wallet provider not detected. Install or start a wallet and retry.",
                );
                return Err(OrchestratorError::ProviderUnavailable(e.to_string()));
            }
        };
        tracing::debug!(chain_id = %current, target = %target, "Provider network queried");

        if current != target {
            tracing::warn!(expected = %target, actual = %current, "Provider on wrong network, requesting switch");
            self.transition(ConnectionState {
                status: ConnectionStatus::WrongNetwork,
                account: previous.account,
                chain_id: Some(current),
            });

            if let Err(e) = inner.provider.switch_chain(target).await {
                tracing::warn!(error = %e, "Network switch failed");
                self.report(
                    Severity::Error,
                    format!(
                        "Please switch your wallet network to {} ({}). Auto-switch failed.",
                        inner.settings.chain_name,
                        target.to_hex()
                    ),
                );
                return Err(OrchestratorError::NetworkMismatch {
                    expected: target,
                    actual: current,
                });
            }
        } else if previous.status == ConnectionStatus::Disconnected {
            self.transition(ConnectionState {
                status: ConnectionStatus::Connecting,
                account: None,
                chain_id: Some(target),
            });
        }

        let account = match inner.provider.request_accounts().await {
            Ok(accounts) => match accounts.first() {
                Some(account) => *account,
                None => {
                    let denied = OrchestratorError::AuthorizationDenied(
                        "provider returned no accounts".into(),
                    );
                    return Err(self.abort_connect(denied));
                }
            },
            Err(BlockchainError::Rejected(reason)) => {
                return Err(self.abort_connect(OrchestratorError::AuthorizationDenied(reason)));
            }
            Err(e) => {
                let unavailable = OrchestratorError::ProviderUnavailable(e.to_string());
                return Err(self.abort_connect(unavailable));
            }
        };

        let connected = ConnectionState {
            status: ConnectionStatus::Connected,
            account: Some(account),
            chain_id: Some(target),
        };
        self.transition(connected.clone());
        tracing::info!(account = %account, chain_id = %target, "Connected");

        self.ensure_subscription().await;
        self.report(
            Severity::Info,
            format!("Connected to {} and ready.", inner.settings.chain_name),
        );
        Ok(connected)
    }

    /// Fail a connect attempt after the network check.
    fn abort_connect(&self, error: OrchestratorError) -> OrchestratorError {
        match &error {
            OrchestratorError::AuthorizationDenied(_) => {
                tracing::warn!(error = %error, "Account authorization denied")
            }
            _ => tracing::warn!(error = %error, "Account request failed"),
        }
        self.transition(ConnectionState::disconnected());
        self.report(Severity::Error, format!("Could not connect: {}", error));
        error
    }

    /// Dispatch a call and wait for its confirmation.
    ///
    /// Connects first when not connected.
    pub async fn submit(&self, call: LedgerCall) -> OrchestratorResult<SubmitOutcome> {
        let kind = OperationKind::from(&call);

        let account = match self.account() {
            Some(account) => account,
            None => {
                let state = self
                    .connect()
                    .await
                    .map_err(|e| OrchestratorError::NotConnected(Box::new(e)))?;
                state.account.ok_or_else(|| {
                    OrchestratorError::NotConnected(Box::new(OrchestratorError::AuthorizationDenied(
                        "no account after connect".into(),
                    )))
                })?
            }
        };

        self.inner.sink.operation_started(kind);
        let result = self.dispatch(kind, account, &call).await;
        self.inner.sink.operation_ended(kind);

        match &result {
            Ok(_) => metrics::record_operation(kind, "confirmed"),
            Err(e) => metrics::record_operation(kind, e.label()),
        }
        result
    }

    async fn dispatch(
        &self,
        kind: OperationKind,
        account: Address,
        call: &LedgerCall,
    ) -> OrchestratorResult<SubmitOutcome> {
        let inner = &self.inner;
        self.report(Severity::Progress, kind.sending_text());

        let tx_hash = match inner.provider.send_call(account, call).await {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Call rejected before sending");
                self.report(Severity::Error, "Transaction rejected or failed to send.");
                return Err(OrchestratorError::SubmissionRejected {
                    kind,
                    reason: e.to_string(),
                });
            }
        };

        let mut operation = PendingOperation::sent(kind, tx_hash);
        inner.in_flight.insert(kind, operation.clone());
        tracing::info!(
            kind = %kind,
            tx_hash = %tx_hash,
            op_id = %operation.id,
            "Call accepted, waiting for confirmation"
        );
        self.report(
            Severity::Progress,
            format!("Transaction sent. Waiting for confirmation... (tx: {})", tx_hash),
        );

        let outcome = match self.await_confirmation(tx_hash).await {
            Err(cause) if cause.is_ambiguous() && inner.settings.reconcile_on_failure => {
                match self.reconcile(tx_hash).await {
                    Some(receipt) => Ok((receipt, true)),
                    None => Err(cause),
                }
            }
            other => other.map(|receipt| (receipt, false)),
        };

        // Another dispatch of the same kind may have replaced this record.
        inner.in_flight.remove_if(&kind, |_, pending| pending.id == operation.id);

        match outcome {
            Ok((receipt, reconciled)) => {
                operation.status = OperationStatus::Confirmed;
                tracing::info!(
                    kind = %kind,
                    tx_hash = %tx_hash,
                    block = ?receipt.block_number,
                    reconciled,
                    "Call confirmed"
                );
                self.report(Severity::Info, kind.confirmed_text(&tx_hash));
                Ok(SubmitOutcome {
                    operation,
                    receipt,
                    reconciled,
                })
            }
            Err(cause) => {
                operation.status = OperationStatus::Failed;
                tracing::warn!(
                    kind = %kind,
                    tx_hash = %tx_hash,
                    op_id = %operation.id,
                    cause = %cause,
                    "Call not confirmed"
                );
                let hint = if cause.is_ambiguous() {
                    "It may still be mined; check a block explorer before resubmitting."
                } else {
                    "The ledger rejected it."
                };
                self.report(
                    Severity::Error,
                    format!("Could not confirm transaction (tx: {}). {}", tx_hash, hint),
                );
                Err(OrchestratorError::ConfirmationFailed { operation, cause })
            }
        }
    }

    async fn await_confirmation(
        &self,
        tx_hash: TxHash,
    ) -> Result<ReceiptSummary, ConfirmationFailure> {
        let settings = &self.inner.settings;
        let wait = self
            .inner
            .provider
            .wait_for_confirmation(tx_hash, settings.confirmations);

        match bounded(settings.confirmation_timeout, wait).await {
            Ok(Ok(receipt)) if receipt.success => Ok(receipt),
            Ok(Ok(_)) => Err(ConfirmationFailure::Reverted),
            Ok(Err(e)) => Err(ConfirmationFailure::Provider(e.to_string())),
            Err(_) => Err(ConfirmationFailure::Timeout(
                settings.confirmation_timeout.as_secs(),
            )),
        }
    }

    /// One receipt lookup after an ambiguous confirmation failure.
    async fn reconcile(&self, tx_hash: TxHash) -> Option<ReceiptSummary> {
        match self.inner.provider.receipt(tx_hash).await {
            Ok(Some(receipt)) if receipt.success => {
                tracing::info!(tx_hash = %tx_hash, "Receipt found on reconciliation");
                Some(receipt)
            }
            Ok(Some(_)) => {
                tracing::warn!(tx_hash = %tx_hash, "Reconciliation found a reverted receipt");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(tx_hash = %tx_hash, error = %e, "Reconciliation query failed");
                None
            }
        }
    }

    /// Consume one observed event. Never fails.
    pub fn on_event(&self, event: &ObservedEvent) -> EventReport {
        let own_account = self.inner.state.load().account == Some(event.subject);
        let report = interpret(event, self.inner.settings.adult_threshold, own_account);
        tracing::info!(
            subject = %event.subject,
            tx_hash = ?event.tx_hash,
            classification = %report.classification(),
            "Age check event"
        );
        self.publish(&report);
        report
    }

    fn on_malformed(&self, tx_hash: Option<TxHash>, reason: String) -> EventReport {
        tracing::warn!(tx_hash = ?tx_hash, reason = %reason, "Unparseable age check event");
        let report = EventReport::Unparseable { tx_hash, reason };
        self.publish(&report);
        report
    }

    fn publish(&self, report: &EventReport) {
        metrics::record_event(report.classification());
        let severity = match report {
            EventReport::Result(_) => Severity::Info,
            EventReport::Unparseable { .. } => Severity::Error,
        };
        self.report(severity, report.message());
        self.inner.sink.result(report);
    }

    /// The provider reported it went away.
    pub fn handle_disconnect(&self) {
        if self.inner.state.load().status == ConnectionStatus::Disconnected {
            self.drop_subscription();
            return;
        }
        tracing::warn!("Provider disconnected");
        self.transition(ConnectionState::disconnected());
        self.report(Severity::Error, "Wallet provider disconnected. Reconnect to continue.");
    }

    /// The provider reported a network change.
    pub fn handle_chain_changed(&self, chain: ChainId) {
        let state = self.state();
        if chain == self.inner.settings.target_chain || state.status != ConnectionStatus::Connected {
            return;
        }
        self.transition(ConnectionState {
            status: ConnectionStatus::WrongNetwork,
            account: state.account,
            chain_id: Some(chain),
        });
        self.report(
            Severity::Error,
            format!(
                "Wallet switched away from {}. Reconnect to continue.",
                self.inner.settings.chain_name
            ),
        );
    }

    fn transition(&self, next: ConnectionState) {
        let leaves_connection = matches!(
            next.status,
            ConnectionStatus::Disconnected | ConnectionStatus::WrongNetwork
        );
        let previous = self.inner.state.swap(Arc::new(next.clone()));

        if previous.status != next.status {
            tracing::info!(from = %previous.status, to = %next.status, "Connection state changed");
        }
        if *previous != next {
            self.inner.sink.connection_changed(&next);
        }
        if leaves_connection {
            self.drop_subscription();
        }
    }

    async fn ensure_subscription(&self) {
        if self.inner.subscription_active.load(Ordering::SeqCst) {
            tracing::debug!("Event subscription already active");
            return;
        }

        let stream = match self.inner.provider.subscribe_events().await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "Event subscription failed");
                self.report(
                    Severity::Error,
                    "Connected, but results cannot be observed right now.",
                );
                return;
            }
        };

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let pump = tokio::spawn(pump_notices(Arc::downgrade(&self.inner), generation, stream));

        let mut slot = self.inner.subscription();
        if let Some(stale) = slot.replace(Subscription { generation, pump }) {
            stale.pump.abort();
        }
        self.inner.subscription_active.store(true, Ordering::SeqCst);
        tracing::debug!(generation, "Event subscription registered");
    }

    fn drop_subscription(&self) {
        if let Some(subscription) = self.inner.subscription().take() {
            tracing::debug!(generation = subscription.generation, "Event subscription dropped");
            subscription.pump.abort();
        }
        self.inner.subscription_active.store(false, Ordering::SeqCst);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner
            .subscription()
            .as_ref()
            .is_some_and(|s| s.generation == generation)
    }

    fn report(&self, severity: Severity, text: impl Into<String>) {
        self.inner.sink.status(StatusUpdate::new(severity, text));
    }
}

impl std::fmt::Debug for TransactionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionOrchestrator")
            .field("state", &self.state())
            .field("subscribed", &self.is_subscribed())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

/// Feed provider notices into the orchestrator until the stream or the
/// orchestrator goes away, or the subscription is replaced.
async fn pump_notices(inner: Weak<Inner>, generation: u64, mut stream: EventStream) {
    while let Some(notice) = stream.recv().await {
        let Some(strong) = inner.upgrade() else {
            return;
        };
        let orchestrator = TransactionOrchestrator { inner: strong };
        if !orchestrator.is_current(generation) {
            return;
        }

        match notice {
            ProviderNotice::Event(event) => {
                orchestrator.on_event(&event);
            }
            ProviderNotice::Malformed { tx_hash, reason } => {
                orchestrator.on_malformed(tx_hash, reason);
            }
            ProviderNotice::ChainChanged(chain) => orchestrator.handle_chain_changed(chain),
            ProviderNotice::Disconnected => {
                orchestrator.handle_disconnect();
                return;
            }
        }
    }

    // Sender side gone: the provider stopped delivering.
    if let Some(strong) = inner.upgrade() {
        let orchestrator = TransactionOrchestrator { inner: strong };
        if orchestrator.is_current(generation) {
            orchestrator.handle_disconnect();
        }
    }
}
