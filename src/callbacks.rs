//! The capability object the host implements to receive callbacks.
//!
//! spec §9 frames the original's fixed vtable of optional function
//! pointers as something to "re-architect as a capability object/trait
//! carrying this set; all calls are explicit with the opaque user
//! context." The user-context pointer the original threads through
//! every call is unnecessary here: the trait itself *is* the user's
//! object, so `&mut self` carries whatever context the host needs.
//!
//! Every method has a default no-op (or maximally conservative)
//! implementation so a host can implement only the callbacks its
//! feature set actually needs, matching the original's "all optional
//! except where a feature needs them."

use crate::event::Event;
use crate::message::NetworkConfigIpv4;
use crate::{error::HeliumError, connection::State};

/// Host-implemented callbacks a [`crate::connection::Connection`]
/// invokes synchronously as it processes inbound packets and internal
/// timers. All calls happen on the caller's thread; see
/// [`crate::connection::Connection`] for the single-owner contract.
pub trait ConnectionCallbacks {
    /// The connection moved to a new state. Fired exactly once per
    /// distinct transition, before any work associated with the new
    /// state (e.g. before the auto-emitted client AUTH on `LinkUp`).
    fn state_change(&mut self, _new_state: State) {}

    /// The host should nudge this connection again in `ms`
    /// milliseconds if nothing else happens first. Called at most once
    /// between consecutive `nudge` invocations (single-armed timer).
    fn nudge_time(&mut self, _ms: u32) {}

    /// A decrypted IPv4 packet arrived on the data plane and should be
    /// written to the host's tun/tap device or equivalent.
    fn inside_write(&mut self, _ipv4_packet: &[u8]) {}

    /// Ciphertext/wire bytes should be written to the network socket.
    fn outside_write(&mut self, _wire_bytes: &[u8]) {}

    /// An informational event fired.
    fn event(&mut self, _event: Event) {}

    /// Server only: whether `auth` and `populate_network_config_ipv4`
    /// are both genuinely installed, as opposed to left at their
    /// conservative defaults. A host implementing authentication must
    /// override this to `true` alongside those two methods; `handle_auth`
    /// uses it to tell "no handler installed" (`INVALID_CLIENT_STATE`,
    /// mirroring the original's nullable `auth_cb`/
    /// `populate_network_config_ipv4_cb` function pointers) apart from
    /// "handler installed and it rejected this attempt"
    /// (`ACCESS_DENIED`).
    fn has_auth_handler(&self) -> bool {
        false
    }

    /// Server only: validate a presented username/password. Returning
    /// `false` rejects the connection attempt. Only called when
    /// [`Self::has_auth_handler`] reports `true`.
    fn auth(&mut self, _username: &str, _password: &str) -> bool {
        false
    }

    /// Server only: produce the network configuration to push to a
    /// newly authenticated client. Only called when
    /// [`Self::has_auth_handler`] reports `true`.
    fn populate_network_config_ipv4(&mut self) -> Result<NetworkConfigIpv4, HeliumError> {
        Err(HeliumError::CallbackFailed)
    }

    /// Client only: apply a network configuration pushed by the
    /// server (e.g. configure a tun device with the given addresses).
    fn network_config_ipv4(&mut self, _config: &NetworkConfigIpv4) -> Result<(), HeliumError> {
        Err(HeliumError::CallbackFailed)
    }
}

/// A [`ConnectionCallbacks`] implementation that does nothing and
/// accepts nothing; useful as a placeholder before a host wires up its
/// real callback object, and in tests that don't exercise callbacks.
#[derive(Debug, Default)]
pub struct NullCallbacks;

impl ConnectionCallbacks for NullCallbacks {}
