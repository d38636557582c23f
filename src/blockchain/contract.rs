//! ABI bindings for the age verification contract.

use alloy::primitives::Bytes;
use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::blockchain::types::{BlockchainError, BlockchainResult, LedgerCall, ObservedEvent};

sol! {
    /// Age verification contract surface used by the client.
    interface AgeVerifier {
        function setEncryptedAge(bytes ct) external;
        function requestCheck(address user) external;

        /// Emitted when a check has been requested for `user`.
        #[derive(Debug)]
        event AgeCheckRequested(address indexed user, bytes ciphertext);
    }
}

/// ABI-encode the calldata for a ledger call.
pub fn encode_call(call: &LedgerCall) -> Bytes {
    match call {
        LedgerCall::SubmitValue(ct) => AgeVerifier::setEncryptedAgeCall { ct: ct.clone() }
            .abi_encode()
            .into(),
        LedgerCall::RequestCheck(user) => {
            AgeVerifier::requestCheckCall { user: *user }.abi_encode().into()
        }
    }
}

/// Decode an RPC log into an [`ObservedEvent`].
pub fn decode_event(log: &Log) -> BlockchainResult<ObservedEvent> {
    let decoded = log
        .log_decode::<AgeVerifier::AgeCheckRequested>()
        .map_err(|e| BlockchainError::Decode(e.to_string()))?;
    let event = decoded.inner.data;

    Ok(ObservedEvent {
        subject: event.user,
        payload: event.ciphertext,
        tx_hash: log.transaction_hash,
    })
}
