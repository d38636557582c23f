//! The rendering collaborator seam.
//!
//! The orchestrator reports progress through a [`StatusSink`]; what a sink
//! does with it (terminal output, a UI, a channel) is up to the caller.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::orchestrator::event::EventReport;
use crate::orchestrator::operation::OperationKind;
use crate::orchestrator::state::ConnectionState;

/// Severity of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Info,
    Error,
    /// Work in progress, render with an activity indicator.
    Progress,
}

/// A user-facing status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub severity: Severity,
    pub text: String,
}

impl StatusUpdate {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Receiver of orchestrator notifications. Callbacks must not block.
pub trait StatusSink: Send + Sync {
    fn status(&self, update: StatusUpdate);

    fn connection_changed(&self, _state: &ConnectionState) {}

    /// A call was handed to the wallet; long-running feedback may start.
    fn operation_started(&self, _kind: OperationKind) {}

    /// The call reached a terminal outcome.
    fn operation_ended(&self, _kind: OperationKind) {}

    fn result(&self, report: &EventReport);
}

/// Sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn status(&self, update: StatusUpdate) {
        match update.severity {
            Severity::Error => tracing::warn!(status = %update.text),
            Severity::Info | Severity::Progress => tracing::info!(status = %update.text),
        }
    }

    fn connection_changed(&self, state: &ConnectionState) {
        tracing::info!(
            status = %state.status,
            account = ?state.account,
            chain_id = ?state.chain_id,
            "Connection changed"
        );
    }

    fn result(&self, report: &EventReport) {
        tracing::info!(classification = %report.classification(), "{}", report.message());
    }
}

/// Everything a [`ChannelSink`] forwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkMessage {
    Status(StatusUpdate),
    Connection(ConnectionState),
    Started(OperationKind),
    Ended(OperationKind),
    Result(EventReport),
}

/// Sink forwarding notifications into a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkMessage>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, message: SinkMessage) {
        // Receiver gone means nobody is rendering any more.
        let _ = self.tx.send(message);
    }
}

impl StatusSink for ChannelSink {
    fn status(&self, update: StatusUpdate) {
        self.forward(SinkMessage::Status(update));
    }

    fn connection_changed(&self, state: &ConnectionState) {
        self.forward(SinkMessage::Connection(state.clone()));
    }

    fn operation_started(&self, kind: OperationKind) {
        self.forward(SinkMessage::Started(kind));
    }

    fn operation_ended(&self, kind: OperationKind) {
        self.forward(SinkMessage::Ended(kind));
    }

    fn result(&self, report: &EventReport) {
        self.forward(SinkMessage::Result(report.clone()));
    }
}
