//! The shared context object's interface, as seen from a connection.
//!
//! The context itself — its lifecycle, how many connections share it,
//! how its defaults get configured — is out of scope here (spec §1:
//! "The shared context object that stores defaults and callbacks
//! across many connections"). What a [`crate::connection::Connection`]
//! actually reads from it at `connect` time is captured as a trait so
//! the connection state machine compiles and is testable standalone.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::HeliumError;
use crate::message::ProtocolVersion;
use crate::padding::PaddingPolicy;
use crate::rng::ConnectionRng;
use crate::tls::TlsSession;
use crate::TransportMode;

/// Everything a connection reads from its owning context during
/// `client_connect`/`server_connect` (spec §4.1 step 2).
pub trait ConnectionContext {
    /// Whether roaming (session-id based peer migration) is disabled
    /// for connections created from this context.
    fn disable_roaming_connections(&self) -> bool;

    /// The data-plane padding policy new connections inherit.
    fn padding_type(&self) -> PaddingPolicy;

    /// Whether aggressive mode (context-specific tuning, opaque here)
    /// is enabled.
    fn use_aggressive_mode(&self) -> bool;

    /// The transport mode (`datagram`/`stream`) connections from this
    /// context use.
    fn connection_type(&self) -> TransportMode;

    /// The newest protocol version this context declares support for.
    /// A client with an unset protocol version is required to match
    /// this exactly (spec §4.1 `is_valid_client`).
    fn maximum_supported_version(&self) -> ProtocolVersion;

    /// Whether `version` is one this context can speak at all. A
    /// server with an explicitly set protocol version only needs to
    /// satisfy this, not match the maximum (spec §4.1 `is_valid_server`).
    fn supports_protocol_version(&self, version: ProtocolVersion) -> bool;

    /// The server distinguished name to verify the peer certificate
    /// against, if configured.
    fn server_dn(&self) -> Option<&str>;

    /// The RNG shared with every connection created from this context.
    fn rng(&self) -> Rc<RefCell<dyn ConnectionRng>>;

    /// Construct a fresh TLS session appropriate for `mode`. Failure
    /// maps to [`HeliumError::InitFailed`] at the call site.
    fn create_tls_session(
        &self,
        mode: TransportMode,
    ) -> Result<Box<dyn TlsSession>, HeliumError>;
}

/// A plain-data [`ConnectionContext`] with no further behavior, useful
/// for tests and for simple embedders that configure everything once
/// up front.
pub struct StaticContext {
    pub disable_roaming_connections: bool,
    pub padding_type: PaddingPolicy,
    pub use_aggressive_mode: bool,
    pub connection_type: TransportMode,
    pub maximum_supported_version: ProtocolVersion,
    pub supported_versions: Vec<ProtocolVersion>,
    pub server_dn: Option<String>,
    pub rng: Rc<RefCell<dyn ConnectionRng>>,
    /// Builds a fresh [`TlsSession`] for the given transport mode. Set
    /// this to return `Err` to simulate `INIT_FAILED` in tests.
    #[allow(clippy::type_complexity)]
    pub tls_factory: Box<dyn Fn(TransportMode) -> Result<Box<dyn TlsSession>, HeliumError>>,
}

impl ConnectionContext for StaticContext {
    fn disable_roaming_connections(&self) -> bool {
        self.disable_roaming_connections
    }

    fn padding_type(&self) -> PaddingPolicy {
        self.padding_type
    }

    fn use_aggressive_mode(&self) -> bool {
        self.use_aggressive_mode
    }

    fn connection_type(&self) -> TransportMode {
        self.connection_type
    }

    fn maximum_supported_version(&self) -> ProtocolVersion {
        self.maximum_supported_version
    }

    fn supports_protocol_version(&self, version: ProtocolVersion) -> bool {
        self.supported_versions.contains(&version)
    }

    fn server_dn(&self) -> Option<&str> {
        self.server_dn.as_deref()
    }

    fn rng(&self) -> Rc<RefCell<dyn ConnectionRng>> {
        self.rng.clone()
    }

    fn create_tls_session(
        &self,
        mode: TransportMode,
    ) -> Result<Box<dyn TlsSession>, HeliumError> {
        (self.tls_factory)(mode)
    }
}
