//! Per-message handlers (spec §4.3), invoked by an external dispatcher
//! once per application message after TLS decryption.

use slog::{trace, warn};

use crate::callbacks::ConnectionCallbacks;
use crate::connection::{Connection, State};
use crate::error::HeliumError;
use crate::event::Event;
use crate::message::{
    AuthMessage, AuthType, ConfigIpv4Message, DataHeader, MsgId, NetworkConfigIpv4,
};
use crate::HE_MAX_MTU;

impl Connection {
    /// Dispatch a single decrypted application message: `buf[0]` is the
    /// `msgid`, the rest is the message body. `buf` is `&mut` so the
    /// `AUTH` handler can zero the password field in place once it has
    /// been consumed, per spec §7/§9.
    pub fn handle_message(
        &mut self,
        buf: &mut [u8],
        cb: &mut dyn ConnectionCallbacks,
    ) -> Result<(), HeliumError> {
        let (msgid_byte, body) = buf.split_first_mut().ok_or(HeliumError::PacketTooSmall)?;
        let msgid = MsgId::from_byte(*msgid_byte).ok_or(HeliumError::BadPacket)?;

        if !self.first_message_seen {
            self.first_message_seen = true;
            cb.event(Event::FirstMessageReceived);
        }

        trace!(self.log, "handling message"; "msgid" => ?msgid, "state" => ?self.state);

        let result = match msgid {
            MsgId::Noop => self.handle_noop(),
            MsgId::Ping => self.handle_ping(cb),
            MsgId::Pong => self.handle_pong(cb),
            MsgId::Auth => self.handle_auth(body, cb),
            MsgId::ConfigIpv4 => self.handle_config_ipv4(body, cb),
            MsgId::Data => self.handle_data(body, cb),
            MsgId::AuthResponse => self.handle_auth_response(),
            MsgId::AuthResponseWithConfig => self.handle_auth_response_with_config(),
            MsgId::Goodbye => self.handle_goodbye(cb),
        };

        if let Err(ref e) = result {
            trace!(self.log, "message handler returned error"; "msgid" => ?msgid, "error" => %e);
        }

        result
    }

    fn handle_noop(&mut self) -> Result<(), HeliumError> {
        Ok(())
    }

    fn handle_ping(&mut self, cb: &mut dyn ConnectionCallbacks) -> Result<(), HeliumError> {
        if self.state != State::Online {
            return Err(HeliumError::InvalidClientState);
        }
        cb.outside_write(&[MsgId::Pong as u8]);
        Ok(())
    }

    fn handle_pong(&mut self, cb: &mut dyn ConnectionCallbacks) -> Result<(), HeliumError> {
        cb.event(Event::Pong);
        Ok(())
    }

    fn handle_auth(
        &mut self,
        body: &mut [u8],
        cb: &mut dyn ConnectionCallbacks,
    ) -> Result<(), HeliumError> {
        if !self.is_server || !matches!(self.state, State::LinkUp | State::Online) {
            return Err(HeliumError::InvalidClientState);
        }
        if !cb.has_auth_handler() {
            return Err(HeliumError::InvalidClientState);
        }

        let auth = AuthMessage::decode(body)?;
        // Zero the password field unconditionally, before the callback
        // even runs: the credential has already been consumed into
        // `auth.password` and must not linger in the wire buffer on any
        // path, success or failure.
        AuthMessage::zero_password_in_place(body);

        if !cb.auth(&auth.username, &auth.password) {
            warn!(self.log, "auth rejected"; "username" => %auth.username);
            self.change_state(State::Disconnecting, cb);
            return Err(HeliumError::AccessDenied);
        }

        self.username = auth.username;

        let config = cb.populate_network_config_ipv4()?;
        let reply = ConfigIpv4Message {
            session: self.session_id,
            local_ip: config.local_ip,
            peer_ip: config.peer_ip,
            dns_ip: config.dns_ip,
            mtu_raw: HE_MAX_MTU.to_string(),
        };
        let encoded = reply.encode()?;
        cb.outside_write(&encoded);

        self.change_state(State::Online, cb);
        Ok(())
    }

    fn handle_config_ipv4(
        &mut self,
        body: &[u8],
        cb: &mut dyn ConnectionCallbacks,
    ) -> Result<(), HeliumError> {
        if self.is_server || self.state != State::Authenticating {
            return Err(HeliumError::InvalidClientState);
        }

        let decoded = ConfigIpv4Message::decode(body)?;
        let mtu = decoded.parsed_mtu();
        self.session_id = decoded.session;
        self.change_state(State::Configuring, cb);

        let config = NetworkConfigIpv4 {
            local_ip: decoded.local_ip,
            peer_ip: decoded.peer_ip,
            dns_ip: decoded.dns_ip,
            mtu,
        };
        cb.network_config_ipv4(&config)?;

        self.change_state(State::Online, cb);
        Ok(())
    }

    fn handle_data(
        &mut self,
        body: &[u8],
        cb: &mut dyn ConnectionCallbacks,
    ) -> Result<(), HeliumError> {
        if self.state != State::Online {
            return Err(HeliumError::InvalidClientState);
        }

        let length = DataHeader::decode_length(body, self.protocol_version)? as usize;
        if body.len() < 2 + length {
            return Err(HeliumError::PacketTooSmall);
        }
        let payload = &body[2..2 + length];
        if !crate::message::is_ipv4_packet(payload) {
            return Err(HeliumError::BadPacket);
        }

        cb.inside_write(payload);
        Ok(())
    }

    fn handle_auth_response(&mut self) -> Result<(), HeliumError> {
        Err(HeliumError::AccessDenied)
    }

    fn handle_auth_response_with_config(&mut self) -> Result<(), HeliumError> {
        Ok(())
    }

    fn handle_goodbye(&mut self, cb: &mut dyn ConnectionCallbacks) -> Result<(), HeliumError> {
        self.change_state(State::Disconnecting, cb);
        Ok(())
    }

    /// Build and send an `AUTH` message from the connection's
    /// configured credentials. Used both for the client's initial
    /// auto-emitted AUTH (entering `link_up`) and for re-sending AUTH
    /// on a nudge while `authenticating`.
    pub(crate) fn send_auth(&mut self, cb: &mut dyn ConnectionCallbacks) -> Result<(), HeliumError> {
        let auth = AuthMessage {
            auth_type: AuthType::UserPass,
            username: self.username.clone(),
            password: self.password.as_str().to_string(),
        };
        let encoded = auth.encode()?;
        cb.outside_write(&encoded);
        Ok(())
    }

    /// Send a `PING` keepalive. Supplemented from
    /// `he_conn_send_keepalive`: the distilled spec documents only the
    /// receive side of PING/PONG, not this send entry point.
    pub fn send_keepalive(&mut self, cb: &mut dyn ConnectionCallbacks) -> Result<(), HeliumError> {
        if self.state != State::Online {
            return Err(HeliumError::InvalidClientState);
        }
        cb.outside_write(&[MsgId::Ping as u8]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticContext;
    use crate::padding::PaddingPolicy;
    use crate::plugin::PluginChainHandle;
    use crate::tls::FakeTlsSession;
    use crate::TransportMode;
    use std::cell::RefCell;
    use std::rc::Rc;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct NoopCallbacks;
    impl ConnectionCallbacks for NoopCallbacks {}

    fn server_at_link_up() -> Connection {
        let ctx = StaticContext {
            disable_roaming_connections: false,
            padding_type: PaddingPolicy::None,
            use_aggressive_mode: false,
            connection_type: TransportMode::Datagram,
            maximum_supported_version: crate::message::ProtocolVersion { major: 1, minor: 1 },
            supported_versions: vec![crate::message::ProtocolVersion { major: 1, minor: 1 }],
            server_dn: None,
            rng: Rc::new(RefCell::new(StdRng::seed_from_u64(7))),
            tls_factory: Box::new(|_mode| {
                Ok(Box::new(FakeTlsSession::immediate()) as Box<dyn crate::tls::TlsSession>)
            }),
        };
        let mut conn = Connection::create();
        conn.set_outside_mtu(1500).unwrap();
        let mut cb = NoopCallbacks;
        conn.server_connect(&ctx, PluginChainHandle::new(()), &mut cb)
            .unwrap();
        assert_eq!(conn.state(), State::LinkUp);
        conn
    }

    #[test]
    fn auth_without_installed_handler_is_invalid_client_state() {
        let mut conn = server_at_link_up();
        let mut cb = NoopCallbacks;
        let auth = AuthMessage {
            auth_type: AuthType::UserPass,
            username: "u".to_string(),
            password: "p".to_string(),
        };
        let mut encoded = auth.encode().unwrap().to_vec();

        let result = conn.handle_message(&mut encoded, &mut cb);

        assert_eq!(result.unwrap_err(), HeliumError::InvalidClientState);
        assert_eq!(conn.state(), State::LinkUp);
    }
}
