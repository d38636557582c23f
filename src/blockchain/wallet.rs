//! Local signing key management.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Local key used to sign calls when no injected wallet is present.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    pub fn from_private_key(private_key_hex: &str) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;

        tracing::info!(address = %signer.address(), "Local signer loaded");

        Ok(Self { signer })
    }

    /// Load the wallet from the named environment variable.
    ///
    /// Returns `Ok(None)` when the variable is not set.
    pub fn from_env(var: &str) -> BlockchainResult<Option<Self>> {
        match std::env::var(var) {
            Ok(key) => Self::from_private_key(&key).map(Some),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(BlockchainError::Wallet(format!(
                "Environment variable {} unreadable: {}",
                var, e
            ))),
        }
    }

    /// Address of the signing key.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Network wallet for alloy's signing filler.
    pub fn network_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}
