//! The connection state machine (spec §3, §4.1): the central entity of
//! this crate, sitting above a (D)TLS session and driving handshake,
//! auth, configuration push, and data-plane framing.
//!
//! A `Connection` is exclusively owned by its host and is `!Send`: no
//! internal synchronization is used or intended. All mutating
//! operations — including the ones callbacks trigger re-entrantly, such
//! as the auto-emitted `AUTH` on entering `link_up` — must be
//! serialized by the caller. See spec §5.

use std::cell::RefCell;
use std::rc::Rc;

use slog::{debug, o, trace, warn};
use zeroize::Zeroizing;

use crate::callbacks::ConnectionCallbacks;
use crate::context::ConnectionContext;
use crate::error::HeliumError;
use crate::message::{ProtocolVersion, FIELD_LENGTH};
use crate::padding::PaddingPolicy;
use crate::plugin::PluginChainHandle;
use crate::rng::ConnectionRng;
use crate::tls::TlsProgress;
use crate::{TransportMode, HE_PACKET_OVERHEAD, HE_WOLF_MAX_HEADER_SIZE};

/// The connection's position in the handshake/auth/data lifecycle
/// (spec §3, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Freshly created; not yet connected.
    None,
    /// `connect` was called; TLS handshake in progress.
    Connecting,
    /// TLS handshake complete; application-layer auth not yet done.
    LinkUp,
    /// Client only: AUTH sent, awaiting CONFIG_IPV4.
    Authenticating,
    /// Client only: CONFIG_IPV4 received, applying it via the host
    /// callback.
    Configuring,
    /// Data-plane traffic permitted.
    Online,
    /// Teardown in progress.
    Disconnecting,
    /// Fully torn down; terminal.
    Disconnected,
}

impl Default for State {
    fn default() -> Self {
        State::None
    }
}

/// The per-peer connection object. See the module doc comment for the
/// single-owner, `!Send` contract every method here assumes.
pub struct Connection {
    pub(crate) log: slog::Logger,

    pub(crate) is_server: bool,
    pub(crate) transport_mode: TransportMode,
    pub(crate) tls: Option<Box<dyn crate::tls::TlsSession>>,
    pub(crate) state: State,

    pub(crate) username: String,
    pub(crate) password: Zeroizing<String>,
    pub(crate) protocol_version: ProtocolVersion,
    pub(crate) outside_mtu: Option<u32>,
    pub(crate) padding_policy: PaddingPolicy,

    pub(crate) session_id: u64,
    pub(crate) pending_session_id: u64,

    pub(crate) wolf_timeout: u32,
    pub(crate) is_nudge_timer_running: bool,

    pub(crate) renegotiation_due: bool,
    pub(crate) renegotiation_in_progress: bool,

    pub(crate) plugins: Option<PluginChainHandle>,
    pub(crate) rng: Option<Rc<RefCell<dyn ConnectionRng>>>,

    pub(crate) disable_roaming_connections: bool,
    pub(crate) use_aggressive_mode: bool,

    pub(crate) first_message_seen: bool,
}

impl Default for Connection {
    fn default() -> Self {
        Self {
            log: slog::Logger::root(slog::Discard, o!()),
            is_server: false,
            transport_mode: TransportMode::Datagram,
            tls: None,
            state: State::None,
            username: String::new(),
            password: Zeroizing::new(String::new()),
            protocol_version: ProtocolVersion::UNSET,
            outside_mtu: None,
            padding_policy: PaddingPolicy::None,
            session_id: 0,
            pending_session_id: 0,
            wolf_timeout: 0,
            is_nudge_timer_running: false,
            renegotiation_due: false,
            renegotiation_in_progress: false,
            plugins: None,
            rng: None,
            disable_roaming_connections: false,
            use_aggressive_mode: false,
            first_message_seen: false,
        }
    }
}

impl Connection {
    /// A new connection with every field zero/default, `state == none`.
    pub fn create() -> Self {
        Self::default()
    }

    /// Attach a logger; connections default to a discarding logger when
    /// the host doesn't supply one.
    pub fn with_logger(mut self, log: slog::Logger) -> Self {
        self.log = log;
        self
    }

    /// Release the TLS session and return. Always succeeds; safe to
    /// call at any point in the lifecycle, including before `connect`.
    pub fn destroy(&mut self) {
        if let Some(mut tls) = self.tls.take() {
            tls.shutdown();
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_server(&self) -> bool {
        self.is_server
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn pending_session_id(&self) -> u64 {
        self.pending_session_id
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version
    }

    pub fn outside_mtu(&self) -> Option<u32> {
        self.outside_mtu
    }

    pub fn padding_policy(&self) -> PaddingPolicy {
        self.padding_policy
    }

    pub fn set_username(&mut self, username: &str) -> Result<(), HeliumError> {
        if username.is_empty() {
            return Err(HeliumError::EmptyString);
        }
        if username.len() > FIELD_LENGTH {
            return Err(HeliumError::StringTooLong);
        }
        self.username = username.to_string();
        Ok(())
    }

    pub fn set_password(&mut self, password: &str) -> Result<(), HeliumError> {
        if password.is_empty() {
            return Err(HeliumError::EmptyString);
        }
        if password.len() > FIELD_LENGTH {
            return Err(HeliumError::StringTooLong);
        }
        self.password = Zeroizing::new(password.to_string());
        Ok(())
    }

    pub fn set_outside_mtu(&mut self, mtu: u32) -> Result<(), HeliumError> {
        self.outside_mtu = Some(mtu);
        Ok(())
    }

    pub fn set_protocol_version(&mut self, major: u8, minor: u8) -> Result<(), HeliumError> {
        self.protocol_version = ProtocolVersion { major, minor };
        Ok(())
    }

    /// Assign a session id. Succeeds exactly once, in the null-to-value
    /// direction; a second call with the id already nonzero is rejected
    /// regardless of the new value (spec §8, §9 — on a server this is
    /// always an error in practice, since `server_connect` already
    /// assigns one).
    pub fn set_session_id(&mut self, id: u64) -> Result<(), HeliumError> {
        if self.session_id != 0 {
            return Err(HeliumError::InvalidClientState);
        }
        self.session_id = id;
        Ok(())
    }

    /// Checks presence of username, password, MTU, and a protocol
    /// version that is either unset or exactly the context's maximum
    /// supported version. Returns the first missing/invalid field, in
    /// that order.
    pub fn is_valid_client(&self, ctx: &dyn ConnectionContext) -> Result<(), HeliumError> {
        if self.username.is_empty() {
            return Err(HeliumError::ConfUsernameNotSet);
        }
        if self.password.is_empty() {
            return Err(HeliumError::ConfPasswordNotSet);
        }
        if self.outside_mtu.is_none() {
            return Err(HeliumError::ConfMtuNotSet);
        }
        if !self.protocol_version.is_unset()
            && self.protocol_version != ctx.maximum_supported_version()
        {
            return Err(HeliumError::IncorrectProtocolVersion);
        }
        Ok(())
    }

    /// Requires only MTU, and (if set) a protocol version the context
    /// can speak at all.
    pub fn is_valid_server(&self, ctx: &dyn ConnectionContext) -> Result<(), HeliumError> {
        if self.outside_mtu.is_none() {
            return Err(HeliumError::ConfMtuNotSet);
        }
        if !self.protocol_version.is_unset() && !ctx.supports_protocol_version(self.protocol_version)
        {
            return Err(HeliumError::IncorrectProtocolVersion);
        }
        Ok(())
    }

    pub fn client_connect(
        &mut self,
        ctx: &dyn ConnectionContext,
        plugins: PluginChainHandle,
        cb: &mut dyn ConnectionCallbacks,
    ) -> Result<(), HeliumError> {
        self.is_valid_client(ctx)?;
        let result = self.internal_connect(ctx, plugins, cb, false);
        self.is_server = false;
        result
    }

    pub fn server_connect(
        &mut self,
        ctx: &dyn ConnectionContext,
        plugins: PluginChainHandle,
        cb: &mut dyn ConnectionCallbacks,
    ) -> Result<(), HeliumError> {
        self.is_valid_server(ctx)?;
        let result = self.internal_connect(ctx, plugins, cb, true);
        self.is_server = true;
        result?;

        let rng = self.rng.clone().ok_or(HeliumError::RngFailure)?;
        let id = crate::session_id::generate_session_id(&mut *rng.borrow_mut())?;
        self.session_id = id;
        Ok(())
    }

    /// Steps 2-8 of `client_connect`/`server_connect`: shared between
    /// both roles. The caller re-assigns `self.is_server` once this
    /// returns (step 9), so it is the field of record; `is_server` is
    /// passed in here too, purely so the link_up auto-AUTH branch below
    /// can tell the roles apart immediately, rather than reading the
    /// stale default while a same-call TLS completion is still being
    /// handled (see DESIGN.md).
    fn internal_connect(
        &mut self,
        ctx: &dyn ConnectionContext,
        plugins: PluginChainHandle,
        cb: &mut dyn ConnectionCallbacks,
        is_server: bool,
    ) -> Result<(), HeliumError> {
        self.disable_roaming_connections = ctx.disable_roaming_connections();
        self.padding_policy = ctx.padding_type();
        self.use_aggressive_mode = ctx.use_aggressive_mode();
        self.transport_mode = ctx.connection_type();
        self.rng = Some(ctx.rng());
        if self.protocol_version.is_unset() {
            self.protocol_version = ctx.maximum_supported_version();
        }

        self.plugins = Some(plugins);

        let mut tls = ctx
            .create_tls_session(self.transport_mode)
            .map_err(|_| HeliumError::InitFailed)?;

        match self.transport_mode {
            TransportMode::Datagram => {
                let outside_mtu = self.outside_mtu.ok_or(HeliumError::ConfMtuNotSet)? as i64;
                let tls_mtu = outside_mtu - HE_PACKET_OVERHEAD as i64 + HE_WOLF_MAX_HEADER_SIZE as i64;
                if tls_mtu <= 0 || tls_mtu > u16::MAX as i64 {
                    return Err(HeliumError::InvalidMtuSize);
                }
                tls.set_nonblocking(true);
                tls.set_mtu(tls_mtu as u16)
                    .map_err(|_| HeliumError::InvalidMtuSize)?;
            }
            TransportMode::Stream => {
                tls.set_nonblocking(true);
            }
        }

        if let Some(dn) = ctx.server_dn() {
            tls.check_domain_name(dn).map_err(|_| HeliumError::InitFailed)?;
        }

        self.tls = Some(tls);

        self.change_state(State::Connecting, cb);
        debug!(self.log, "negotiating TLS session"; "transport" => ?self.transport_mode, "is_server" => is_server);

        let progress = self
            .tls
            .as_deref_mut()
            .expect("tls session was just installed")
            .negotiate();

        match progress {
            Ok(TlsProgress::WantRead) | Ok(TlsProgress::WantWrite) => {
                self.update_timeout(cb);
                Ok(())
            }
            Ok(TlsProgress::Complete) => {
                self.change_state_as(State::LinkUp, is_server, cb);
                self.update_timeout(cb);
                Ok(())
            }
            Ok(TlsProgress::AppDataReady) | Err(_) => {
                warn!(self.log, "initial TLS negotiation failed");
                Err(HeliumError::ConnectFailed)
            }
        }
    }

    /// Move to `new_state`. A no-op (no callback, no side effects) when
    /// `new_state == self.state` — the exact mechanism behind "re-
    /// entering the same state is a no-op" (spec §4.1).
    pub(crate) fn change_state(&mut self, new_state: State, cb: &mut dyn ConnectionCallbacks) {
        let is_server = self.is_server;
        self.change_state_as(new_state, is_server, cb);
    }

    /// Like [`Self::change_state`], but takes the role explicitly
    /// instead of reading `self.is_server`. Needed during
    /// `internal_connect`, which can reach `link_up` before
    /// `self.is_server` has been assigned its final value for this
    /// call (see DESIGN.md).
    fn change_state_as(&mut self, new_state: State, is_server: bool, cb: &mut dyn ConnectionCallbacks) {
        if new_state == self.state {
            return;
        }

        trace!(self.log, "state change"; "from" => ?self.state, "to" => ?new_state);
        self.state = new_state;
        cb.state_change(new_state);

        // Entering `link_up` on a client synchronously sends AUTH,
        // which itself transitions to `authenticating` — a direct
        // nested call, not a deferred queue (spec §9 "state-change
        // recursion").
        if new_state == State::LinkUp && !is_server {
            if let Err(e) = self.send_auth(cb) {
                warn!(self.log, "failed to auto-send AUTH on link_up"; "error" => %e);
            }
            self.change_state(State::Authenticating, cb);
        }
    }

    /// `disconnect`: tear down an `online` connection (spec §4.8).
    pub fn disconnect(&mut self, cb: &mut dyn ConnectionCallbacks) -> Result<(), HeliumError> {
        if self.tls.is_none() {
            return Err(HeliumError::NeverConnected);
        }
        if self.state != State::Online {
            return Err(HeliumError::InvalidClientState);
        }

        self.change_state(State::Disconnecting, cb);
        cb.outside_write(&[crate::message::MsgId::Goodbye as u8]);
        if let Some(tls) = self.tls.as_deref_mut() {
            tls.shutdown();
        }
        self.wolf_timeout = 0;
        self.change_state(State::Disconnected, cb);
        Ok(())
    }
}
