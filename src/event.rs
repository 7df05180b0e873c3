//! The `event` callback's payload.

/// Informational events surfaced to the host outside of state changes.
///
/// Unlike [`crate::connection::State`] transitions, events are fired
/// for things that happen *within* a state rather than moving between
/// states, so they are a separate enum rather than additional state
/// variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A PONG message was received in reply to a keepalive.
    Pong,
    /// The very first application message was received on this
    /// connection (useful for host-side activity tracking).
    FirstMessageReceived,
    /// A TLS secure renegotiation handshake has started.
    SecureRenegotiationStarted,
    /// The server's prepared `pending_session_id` has been
    /// acknowledged by the peer and is now the connection's current
    /// session id. The acknowledgment flow itself is driven by the
    /// external dispatcher/outer framing layer (out of scope here);
    /// this crate only defines the event a caller may choose to fire
    /// once it has observed that acknowledgment.
    PendingSessionAcknowledged,
}
