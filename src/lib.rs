//! `helium-core`: the connection core of the Helium VPN transport.
//!
//! This crate owns the per-connection state machine that sits above a
//! (D)TLS session: handshake choreography, authentication, IP
//! configuration push, keepalives, session-id rotation, renegotiation,
//! data-plane framing, and teardown. It is I/O-less — nothing here
//! touches a socket. A host application feeds inbound bytes in and
//! reacts to callbacks fired synchronously on the calling thread; see
//! [`connection::Connection`] for the single-owner, `!Send` contract.
//!
//! The TLS/DTLS engine, the shared context object, plugin chains, and
//! outer packet dispatch are all external collaborators reached only
//! through the interfaces in [`tls`], [`context`], [`plugin`] and
//! [`callbacks`].

pub mod callbacks;
pub mod connection;
pub mod context;
pub mod error;
pub mod event;
pub mod handlers;
pub mod message;
pub mod padding;
pub mod plugin;
pub mod renegotiate;
pub mod rng;
pub mod session_id;
pub mod timer;
pub mod tls;

/// Maximum outside (link-layer) MTU this crate will ever negotiate or
/// pad up to.
pub const HE_MAX_MTU: usize = 1420;

/// Fixed per-packet overhead (UDP + IP + framing) budgeted out of the
/// host's outside MTU before handing the remainder to the TLS engine.
pub const HE_PACKET_OVERHEAD: usize = 92;

/// Worst-case header size the DTLS engine itself adds on top of its
/// own MTU, added back after [`HE_PACKET_OVERHEAD`] is subtracted.
pub const HE_WOLF_MAX_HEADER_SIZE: usize = 41;

/// Multiplier applied to the TLS engine's reported retransmit timeout
/// under normal operation.
pub const TIMEOUT_MULTIPLIER: u32 = 100;

/// Multiplier applied to the TLS engine's reported retransmit timeout
/// while a renegotiation is in progress.
pub const RENEGOTIATION_TIMEOUT_MULTIPLIER: u32 = 1000;

/// The two ways a connection carries its outer packets, mirroring the
/// context's `connection_type` and copied onto the connection verbatim
/// at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Datagram,
    Stream,
}
