//! The stable error taxonomy returned by every public/handler function.

use thiserror::Error;

/// Every fallible operation in this crate returns one of these variants.
///
/// Variant names and groupings follow the taxonomy of the wire protocol
/// this core implements; they are part of the stable public API and are
/// not reordered or renumbered across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeliumError {
    /// A required pointer/reference-shaped argument was absent.
    #[error("a required argument was null")]
    NullPointer,
    /// A string field was set to the empty string.
    #[error("string field must not be empty")]
    EmptyString,
    /// A string field exceeded its fixed-width bound.
    #[error("string field exceeds the maximum allowed length")]
    StringTooLong,

    /// `set_username` was never called (or produced no value).
    #[error("username has not been configured")]
    ConfUsernameNotSet,
    /// `set_password` was never called.
    #[error("password has not been configured")]
    ConfPasswordNotSet,
    /// `set_outside_mtu` was never called.
    #[error("outside MTU has not been configured")]
    ConfMtuNotSet,
    /// The outside MTU could not be applied to the TLS session.
    #[error("the configured MTU is not valid for this transport")]
    InvalidMtuSize,
    /// The configured protocol version is not acceptable for this role.
    #[error("the configured protocol version is not supported")]
    IncorrectProtocolVersion,

    /// The operation is not valid in the connection's current state.
    #[error("operation is not valid in the current connection state")]
    InvalidClientState,
    /// `disconnect` was called on a connection that never connected.
    #[error("connection was never connected")]
    NeverConnected,
    /// The auth callback rejected the credentials presented.
    #[error("access denied")]
    AccessDenied,
    /// The peer closed the underlying session.
    #[error("connection was closed")]
    ConnectionWasClosed,
    /// A scheduled retransmission deadline elapsed without recovery.
    #[error("connection timed out")]
    ConnectionTimedOut,

    /// The TLS session could not be constructed or configured.
    #[error("failed to initialize the TLS session")]
    InitFailed,
    /// The initial TLS negotiation failed outright.
    #[error("failed to connect")]
    ConnectFailed,
    /// A fatal, otherwise-unclassified TLS engine error.
    #[error("TLS engine error")]
    SslError,
    /// A TLS engine condition that is expected and not fatal.
    #[error("non-fatal TLS engine condition")]
    SslErrorNonfatal,

    /// A message's declared/observed length was smaller than its fixed layout.
    #[error("packet too small")]
    PacketTooSmall,
    /// A DATA message's payload failed basic IPv4 validation.
    #[error("malformed data-plane packet")]
    BadPacket,

    /// The RNG failed to produce randomness.
    #[error("RNG failure")]
    RngFailure,
    /// A host-supplied callback reported failure.
    #[error("callback failed")]
    CallbackFailed,
}

/// Classifies whether a given error should be treated as fatal to the
/// connection.
///
/// Only [`HeliumError::SslErrorNonfatal`] is non-fatal among error
/// variants; success (the `Ok` case, which never reaches this function)
/// is the only other non-fatal outcome. Every other variant — including
/// any added in the future — is fatal, so this matches on the single
/// known-safe exception rather than allowlisting fatal variants.
pub fn is_error_fatal(error: HeliumError) -> bool {
    !matches!(error, HeliumError::SslErrorNonfatal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_nonfatal_variant_is_nonfatal() {
        assert!(!is_error_fatal(HeliumError::SslErrorNonfatal));
        assert!(is_error_fatal(HeliumError::AccessDenied));
        assert!(is_error_fatal(HeliumError::PacketTooSmall));
        assert!(is_error_fatal(HeliumError::NullPointer));
    }
}
