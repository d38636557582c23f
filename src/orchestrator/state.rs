//! Connection state owned by the orchestrator.

use alloy::primitives::Address;
use serde::Serialize;

use crate::blockchain::ChainId;

/// Lifecycle position of the provider connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    WrongNetwork,
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::WrongNetwork => "wrong network",
            Self::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Snapshot of the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    /// Authorized account, set once connected.
    pub account: Option<Address>,
    /// Last network reported by the provider.
    pub chain_id: Option<ChainId>,
}

impl ConnectionState {
    pub fn disconnected() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            account: None,
            chain_id: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// The account, but only while connected.
    pub fn connected_account(&self) -> Option<Address> {
        if self.is_connected() {
            self.account
        } else {
            None
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::disconnected()
    }
}
