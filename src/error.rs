//! Crate-wide error taxonomy: four categories, each with its own
//! propagation rule. Protocol errors disconnect the offending client;
//! configuration errors surface through the control protocol's `failure`
//! reply; resource exhaustion is logged and the specific allocation fails
//! without touching unrelated state; stale client state is logged and
//! ignored. The transaction engine never returns any of these — its
//! failures fold into "best-effort commit at deadline" instead.

use thiserror::Error;

use crate::layout::ProtocolError as LayoutProtocolError;

/// The wire-level protocol violation a client committed, tagged by which
/// protocol object observed it so logging can name the offending global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("layout demand: {0}")]
    Layout(LayoutProtocolError),
    #[error("namespace already bound")]
    NamespaceInUse,
}

impl From<LayoutProtocolError> for ProtocolError {
    fn from(err: LayoutProtocolError) -> Self {
        ProtocolError::Layout(err)
    }
}

/// The top-level error taxonomy. Every per-operation error a fallible
/// compositor operation can produce surfaces to its initiator as one of
/// these; nothing here is meant to unwind past the call site that produced
/// it.
#[derive(Debug, Error)]
pub enum CompositorError {
    /// The client violated a wire contract; `state.rs` disconnects it.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A user-facing configuration problem (bad command arguments, unknown
    /// layout namespace, ...). Reported via the control protocol's
    /// `failure(message)` event; compositor state is unchanged.
    #[error("{0}")]
    Configuration(String),

    /// An allocation or registration failed (e.g. the layout-namespace
    /// registry is out of room, or a seat is out of device slots). Logged
    /// once at `tracing::error!`; only the specific request fails, no
    /// other state is touched.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(&'static str),

    /// The client referenced state that no longer exists (an ack for a
    /// superseded serial, a command targeting an already-unmapped view).
    /// Logged at `tracing::warn!` and otherwise ignored.
    #[error("stale client state: {0}")]
    StaleClientState(&'static str),
}

impl CompositorError {
    pub fn configuration(message: impl Into<String>) -> Self {
        CompositorError::Configuration(message.into())
    }

    /// Turns this error into the message a control-protocol `failure` event
    /// should carry. Every variant gets a message: the taxonomy exists so
    /// callers route errors differently, not so some are silently dropped.
    pub fn as_control_message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_carry_their_message_through() {
        let err = CompositorError::configuration("unknown layout namespace 'grid'");
        assert_eq!(err.as_control_message(), "unknown layout namespace 'grid'");
    }

    #[test]
    fn protocol_error_wraps_layout_protocol_error() {
        let err: CompositorError = ProtocolError::from(LayoutProtocolError::CountMismatch).into();
        assert!(matches!(err, CompositorError::Protocol(_)));
    }
}
