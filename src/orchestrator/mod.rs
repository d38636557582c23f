//! Connection and transaction orchestration.
//!
//! # Data Flow
//! ```text
//! caller
//!     → engine.rs connect()  → provider: chain id, switch, accounts, subscribe
//!     → engine.rs submit()   → provider: send call, wait for confirmation
//!                             → operation.rs (PendingOperation Sent → Confirmed | Failed)
//! provider event stream
//!     → engine.rs on_event() → event.rs / codec.rs (decode, classify)
//!     → status sink (result notice)
//! ```

pub mod codec;
pub mod engine;
pub mod error;
pub mod event;
pub mod operation;
pub mod state;

pub use codec::{classify, decode_payload, encode_value, Classification, DecodedPayload};
pub use engine::{OrchestratorSettings, TransactionOrchestrator};
pub use error::{ConfirmationFailure, OrchestratorError, OrchestratorResult};
pub use event::{EventReport, ResultNotice};
pub use operation::{OperationKind, OperationStatus, PendingOperation, SubmitOutcome};
pub use state::{ConnectionState, ConnectionStatus};
