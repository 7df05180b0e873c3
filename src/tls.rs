//! The abstract (D)TLS session interface.
//!
//! Everything about the record-layer, the handshake transport and the
//! actual cryptography lives outside this crate (spec §1 "OUT OF
//! SCOPE": "The TLS/DTLS engine"). What the connection state machine
//! needs from that engine is captured here as a trait, modeled after
//! the vtable `he_ssl_ctx_t`/`wolfSSL_*` surface the original library
//! calls through: `new`/`negotiate`/`write`/`read`/`shutdown`/
//! `set_mtu`/`set_nonblocking`/`get_current_timeout`/`got_timeout`/
//! `supports_renegotiation`/`rehandshake`/`update_keys`/
//! `check_domain_name`.
//!
//! `set_io_ctx` and `get_error` from the original vtable don't need
//! separate methods here: `set_io_ctx` is implicit (the connection
//! owns its `TlsSession` directly rather than registering itself as an
//! opaque I/O context), and `get_error` is folded into the `Result`
//! each fallible method already returns.

use std::time::Duration;

use bytes::Bytes;

/// Outcome of driving the TLS engine one step (negotiate, nudge on
/// timeout, or renegotiate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsProgress {
    /// The operation completed; the session is ready for the next step.
    Complete,
    /// The engine needs more inbound bytes before it can continue.
    WantRead,
    /// The engine has outbound bytes queued and needs to flush them
    /// before it can continue.
    WantWrite,
    /// Application data arrived while performing a control operation
    /// (renegotiation). Meaning is context dependent: see
    /// [`crate::renegotiate`] and [`crate::timer`] for the asymmetric
    /// handling of this condition.
    AppDataReady,
}

/// A fatal condition reported by the TLS engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TlsIoError {
    #[error("TLS engine reported a fatal error")]
    Fatal,
}

/// The abstract (D)TLS session a [`crate::connection::Connection`]
/// drives. Implementations may back this with any TLS library; this
/// crate implements no cryptographic primitives itself.
pub trait TlsSession {
    /// Drive (or continue) the handshake. Called once from `connect`
    /// and potentially again from [`crate::timer`] on timeout.
    fn negotiate(&mut self) -> Result<TlsProgress, TlsIoError>;

    /// Encrypt and queue `plaintext` for transmission. The caller owns
    /// `plaintext`; the engine copies whatever it needs internally.
    fn write(&mut self, plaintext: &[u8]) -> Result<(), TlsIoError>;

    /// Hand inbound ciphertext to the engine; returns decrypted
    /// application data if a full record was completed.
    fn read(&mut self, ciphertext: &[u8]) -> Result<Option<Bytes>, TlsIoError>;

    /// Notify the peer of a clean shutdown. Errors are intentionally
    /// ignored by callers — this is a courtesy call only.
    fn shutdown(&mut self);

    /// Set the path MTU used for DTLS record sizing. Only meaningful
    /// for datagram transport.
    fn set_mtu(&mut self, mtu: u16) -> Result<(), TlsIoError>;

    /// Put the engine into non-blocking mode. Stream transport is
    /// always non-blocking; datagram transport opts in explicitly.
    fn set_nonblocking(&mut self, nonblocking: bool);

    /// The engine's current retransmission deadline, if any.
    fn current_timeout(&self) -> Option<Duration>;

    /// Tell the engine a previously reported timeout has elapsed.
    fn on_timeout(&mut self) -> Result<TlsProgress, TlsIoError>;

    /// Whether the peer has negotiated secure renegotiation support.
    fn supports_secure_renegotiation(&self) -> bool;

    /// Start a full TLS renegotiation handshake.
    fn rehandshake(&mut self) -> Result<TlsProgress, TlsIoError>;

    /// Perform a TLS 1.3-style key update (stream transport fallback
    /// when the peer lacks renegotiation support).
    fn update_keys(&mut self) -> Result<TlsProgress, TlsIoError>;

    /// Verify the peer certificate's distinguished name, if the host
    /// configured one to check against.
    fn check_domain_name(&mut self, dn: &str) -> Result<(), TlsIoError>;
}

/// A deterministic, non-cryptographic stand-in for a real (D)TLS
/// engine, used by this crate's own tests and suitable as a reference
/// for integration tests in host applications. It performs no
/// encryption: `write`/`read` pass bytes through unchanged. It exists
/// purely to exercise the connection state machine's control flow.
#[derive(Debug, Default)]
pub struct FakeTlsSession {
    /// Number of times `negotiate`/`on_timeout` must be called before
    /// the handshake completes. `0` completes immediately.
    pub handshake_steps_remaining: u32,
    pub mtu: Option<u16>,
    pub nonblocking: bool,
    pub current_timeout: Option<Duration>,
    pub supports_renegotiation: bool,
    pub shutdown_called: bool,
    pub renegotiation_in_flight: bool,
    inbox: Vec<u8>,
}

impl FakeTlsSession {
    /// A fake session that completes its handshake on the first
    /// `negotiate` call.
    pub fn immediate() -> Self {
        Self {
            handshake_steps_remaining: 0,
            ..Default::default()
        }
    }

    /// A fake session that reports `WantRead` for `steps` calls before
    /// completing, mirroring a real handshake needing several flights.
    pub fn pending(steps: u32) -> Self {
        Self {
            handshake_steps_remaining: steps,
            ..Default::default()
        }
    }
}

impl TlsSession for FakeTlsSession {
    fn negotiate(&mut self) -> Result<TlsProgress, TlsIoError> {
        if self.handshake_steps_remaining > 0 {
            self.handshake_steps_remaining -= 1;
            Ok(TlsProgress::WantRead)
        } else {
            Ok(TlsProgress::Complete)
        }
    }

    fn write(&mut self, plaintext: &[u8]) -> Result<(), TlsIoError> {
        self.inbox.extend_from_slice(plaintext);
        Ok(())
    }

    fn read(&mut self, ciphertext: &[u8]) -> Result<Option<Bytes>, TlsIoError> {
        Ok(Some(Bytes::copy_from_slice(ciphertext)))
    }

    fn shutdown(&mut self) {
        self.shutdown_called = true;
    }

    fn set_mtu(&mut self, mtu: u16) -> Result<(), TlsIoError> {
        self.mtu = Some(mtu);
        Ok(())
    }

    fn set_nonblocking(&mut self, nonblocking: bool) {
        self.nonblocking = nonblocking;
    }

    fn current_timeout(&self) -> Option<Duration> {
        self.current_timeout
    }

    fn on_timeout(&mut self) -> Result<TlsProgress, TlsIoError> {
        self.negotiate()
    }

    fn supports_secure_renegotiation(&self) -> bool {
        self.supports_renegotiation
    }

    fn rehandshake(&mut self) -> Result<TlsProgress, TlsIoError> {
        self.renegotiation_in_flight = true;
        Ok(TlsProgress::WantRead)
    }

    fn update_keys(&mut self) -> Result<TlsProgress, TlsIoError> {
        Ok(TlsProgress::Complete)
    }

    fn check_domain_name(&mut self, _dn: &str) -> Result<(), TlsIoError> {
        Ok(())
    }
}
