//! Interpretation of observed `AgeCheckRequested` events.

use alloy::primitives::{Address, TxHash};
use serde::Serialize;

use crate::blockchain::ObservedEvent;
use crate::orchestrator::codec::{classify, decode_payload, Classification, DecodedPayload};

/// Classified result of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultNotice {
    pub subject: Address,
    pub tx_hash: Option<TxHash>,
    pub decoded: DecodedPayload,
    pub classification: Classification,
    /// Subject is the connected account.
    pub own_account: bool,
}

/// What the orchestrator reports for each event it consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EventReport {
    Result(ResultNotice),
    /// The log could not be read at all.
    Unparseable {
        tx_hash: Option<TxHash>,
        reason: String,
    },
}

impl EventReport {
    pub fn classification(&self) -> Classification {
        match self {
            Self::Result(notice) => notice.classification,
            Self::Unparseable { .. } => Classification::Unknown,
        }
    }

    /// User-facing status line.
    pub fn message(&self) -> String {
        match self {
            Self::Result(notice) => {
                let verdict = match notice.classification {
                    Classification::Adult => "User is an adult ✅",
                    Classification::NotAdult => "User is NOT an adult ❌",
                    Classification::Unknown => "Result unknown",
                };
                format!("Event seen (tx {}). {}", display_tx(notice.tx_hash), verdict)
            }
            Self::Unparseable { .. } => "Received event but failed to parse result.".to_string(),
        }
    }
}

fn display_tx(tx_hash: Option<TxHash>) -> String {
    tx_hash.map(|h| h.to_string()).unwrap_or_else(|| "unknown".to_string())
}

/// Decode and classify an event. Never fails: bad payloads degrade to `unknown`.
pub fn interpret(event: &ObservedEvent, threshold: i64, own_account: bool) -> EventReport {
    let decoded = decode_payload(&event.payload);
    let classification = classify(&decoded, threshold);

    EventReport::Result(ResultNotice {
        subject: event.subject,
        tx_hash: event.tx_hash,
        decoded,
        classification,
        own_account,
    })
}
