//! Errors surfaced at the orchestrator boundary.
//!
//! Provider errors never escape raw; each is mapped to one of these kinds.
//! Undecodable event payloads are not errors at all, they degrade to an
//! `unknown` classification.

use alloy::primitives::TxHash;
use thiserror::Error;

use crate::blockchain::ChainId;
use crate::orchestrator::operation::{OperationKind, PendingOperation};

/// Why an accepted call did not reach `Confirmed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfirmationFailure {
    /// The wait hit its deadline.
    #[error("no confirmation within {0} seconds")]
    Timeout(u64),
    /// The provider failed while waiting.
    #[error("confirmation wait failed: {0}")]
    Provider(String),
    /// Mined, but reverted.
    #[error("transaction reverted")]
    Reverted,
}

impl ConfirmationFailure {
    /// The ledger may still have executed the call.
    pub fn is_ambiguous(&self) -> bool {
        !matches!(self, Self::Reverted)
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No wallet provider could be reached.
    #[error("Wallet provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider is on another network and would not switch.
    #[error("Wrong network: expected chain {expected}, provider is on {actual}")]
    NetworkMismatch { expected: ChainId, actual: ChainId },

    /// Account authorization was refused or returned no account.
    #[error("Account authorization denied: {0}")]
    AuthorizationDenied(String),

    /// A submission needed a connection and connecting failed.
    #[error("Not connected: {0}")]
    NotConnected(#[source] Box<OrchestratorError>),

    /// Declined before the ledger accepted the call.
    #[error("{kind} rejected before sending: {reason}")]
    SubmissionRejected { kind: OperationKind, reason: String },

    /// Accepted by the ledger, but not confirmed. `operation` is in `Failed` status.
    #[error(
        "{} sent as {} but not confirmed: {cause}",
        .operation.kind,
        .operation.tx_hash
    )]
    ConfirmationFailed {
        operation: PendingOperation,
        cause: ConfirmationFailure,
    },
}

impl OrchestratorError {
    /// The call may have executed; re-query the ledger before resubmitting.
    pub fn is_ambiguous(&self) -> bool {
        match self {
            Self::ConfirmationFailed { cause, .. } => cause.is_ambiguous(),
            _ => false,
        }
    }

    /// Transaction the ledger accepted, for failures after acceptance.
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            Self::ConfirmationFailed { operation, .. } => Some(operation.tx_hash),
            _ => None,
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::NetworkMismatch { .. } => "network_mismatch",
            Self::AuthorizationDenied(_) => "authorization_denied",
            Self::NotConnected(_) => "not_connected",
            Self::SubmissionRejected { .. } => "submission_rejected",
            Self::ConfirmationFailed { .. } => "confirmation_failed",
        }
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
