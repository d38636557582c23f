//! Status reporting toward the presentation layer.
//!
//! # Data Flow
//! ```text
//! orchestrator
//!     → sink.rs (StatusSink: status lines, connection changes,
//!                operation start/end, event results)
//!     → caller renders; on operation start the caller may run
//!       filler.rs (FillerRotation) until the operation ends
//! ```

pub mod filler;
pub mod sink;

pub use filler::{FillerRotation, PRIVACY_FILLERS};
pub use sink::{ChannelSink, Severity, SinkMessage, StatusSink, StatusUpdate, TracingSink};
