//! Outstanding ledger calls.

use alloy::primitives::TxHash;
use serde::Serialize;
use uuid::Uuid;

use crate::blockchain::{LedgerCall, ReceiptSummary};

/// Which contract call an operation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperationKind {
    SubmitValue,
    RequestCheck,
}

impl OperationKind {
    /// Metric / log label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SubmitValue => "submit_value",
            Self::RequestCheck => "request_check",
        }
    }

    pub(crate) fn sending_text(self) -> &'static str {
        match self {
            Self::SubmitValue => "Sending encrypted age... (confirm in your wallet)",
            Self::RequestCheck => "Requesting check... (confirm in your wallet)",
        }
    }

    pub(crate) fn confirmed_text(self, tx_hash: &TxHash) -> String {
        match self {
            Self::SubmitValue => format!("Encrypted age submitted and confirmed! (tx: {})", tx_hash),
            Self::RequestCheck => format!(
                "Request confirmed on-chain (tx: {}). Waiting for the result event.",
                tx_hash
            ),
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&LedgerCall> for OperationKind {
    fn from(call: &LedgerCall) -> Self {
        match call {
            LedgerCall::SubmitValue(_) => Self::SubmitValue,
            LedgerCall::RequestCheck(_) => Self::RequestCheck,
        }
    }
}

/// Progress of a dispatched call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationStatus {
    Sent,
    Confirmed,
    Failed,
}

/// A call the ledger has accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingOperation {
    /// Local correlation id for logs.
    pub id: Uuid,
    pub kind: OperationKind,
    pub tx_hash: TxHash,
    pub status: OperationStatus,
}

impl PendingOperation {
    pub fn sent(kind: OperationKind, tx_hash: TxHash) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            tx_hash,
            status: OperationStatus::Sent,
        }
    }
}

/// Result of a confirmed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Operation in its terminal `Confirmed` state.
    pub operation: PendingOperation,
    pub receipt: ReceiptSummary,
    /// Confirmed by a follow-up receipt query after the wait itself failed.
    pub reconciled: bool,
}

impl SubmitOutcome {
    pub fn tx_hash(&self) -> TxHash {
        self.operation.tx_hash
    }
}
