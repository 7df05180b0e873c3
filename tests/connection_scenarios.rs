//! End-to-end connection scenarios (spec §8), driven against the
//! in-memory `FakeTlsSession` and a callback recorder.

use std::cell::RefCell;
use std::rc::Rc;

use helium_core::callbacks::ConnectionCallbacks;
use helium_core::connection::{Connection, State};
use helium_core::context::StaticContext;
use helium_core::error::HeliumError;
use helium_core::event::Event;
use helium_core::message::{ConfigIpv4Message, MsgId, NetworkConfigIpv4, ProtocolVersion};
use helium_core::padding::PaddingPolicy;
use helium_core::plugin::PluginChainHandle;
use helium_core::tls::FakeTlsSession;
use helium_core::{TransportMode, HE_MAX_MTU};

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Default)]
struct Recorder {
    state_changes: Vec<State>,
    nudge_times: Vec<u32>,
    outside_writes: Vec<Vec<u8>>,
    inside_writes: Vec<Vec<u8>>,
    events: Vec<Event>,
    auth_accept: bool,
    config_to_push: Option<NetworkConfigIpv4>,
    client_configs_seen: Vec<NetworkConfigIpv4>,
}

impl ConnectionCallbacks for Recorder {
    fn state_change(&mut self, new_state: State) {
        self.state_changes.push(new_state);
    }
    fn nudge_time(&mut self, ms: u32) {
        self.nudge_times.push(ms);
    }
    fn inside_write(&mut self, packet: &[u8]) {
        self.inside_writes.push(packet.to_vec());
    }
    fn outside_write(&mut self, bytes: &[u8]) {
        self.outside_writes.push(bytes.to_vec());
    }
    fn event(&mut self, event: Event) {
        self.events.push(event);
    }
    fn has_auth_handler(&self) -> bool {
        true
    }
    fn auth(&mut self, _username: &str, _password: &str) -> bool {
        self.auth_accept
    }
    fn populate_network_config_ipv4(&mut self) -> Result<NetworkConfigIpv4, HeliumError> {
        self.config_to_push
            .clone()
            .ok_or(HeliumError::CallbackFailed)
    }
    fn network_config_ipv4(&mut self, config: &NetworkConfigIpv4) -> Result<(), HeliumError> {
        self.client_configs_seen.push(config.clone());
        Ok(())
    }
}

fn context(handshake_steps: u32) -> StaticContext {
    StaticContext {
        disable_roaming_connections: false,
        padding_type: PaddingPolicy::None,
        use_aggressive_mode: false,
        connection_type: TransportMode::Datagram,
        maximum_supported_version: ProtocolVersion { major: 1, minor: 1 },
        supported_versions: vec![ProtocolVersion { major: 1, minor: 1 }],
        server_dn: None,
        rng: Rc::new(RefCell::new(StdRng::seed_from_u64(99))),
        tls_factory: Box::new(move |_mode| {
            Ok(Box::new(FakeTlsSession::pending(handshake_steps))
                as Box<dyn helium_core::tls::TlsSession>)
        }),
    }
}

#[test]
fn scenario_1_client_happy_path() {
    let ctx = context(1);
    let mut conn = Connection::create();
    conn.set_username("u").unwrap();
    conn.set_password("p").unwrap();
    conn.set_outside_mtu(1500).unwrap();
    let mut cb = Recorder::default();

    let result = conn.client_connect(&ctx, PluginChainHandle::new(()), &mut cb);

    assert!(result.is_ok());
    assert_eq!(conn.state(), State::Connecting);
    assert!(!conn.is_server());
    assert_eq!(cb.nudge_times.len(), 1);
    assert!(cb.nudge_times[0] > 0);
}

#[test]
fn scenario_2_server_auth_accepted() {
    let ctx = context(0);
    let mut conn = Connection::create();
    conn.set_outside_mtu(1500).unwrap();
    let mut cb = Recorder::default();
    cb.auth_accept = true;
    cb.config_to_push = Some(NetworkConfigIpv4 {
        local_ip: "10.0.0.1".to_string(),
        peer_ip: "10.0.0.2".to_string(),
        dns_ip: "10.0.0.3".to_string(),
        mtu: 0,
    });

    conn.server_connect(&ctx, PluginChainHandle::new(()), &mut cb)
        .unwrap();
    assert_eq!(conn.state(), State::LinkUp);
    let session_id = conn.session_id();
    assert_ne!(session_id, 0);

    let auth = helium_core::message::AuthMessage {
        auth_type: helium_core::message::AuthType::UserPass,
        username: "u".to_string(),
        password: "p".to_string(),
    };
    let mut encoded = auth.encode().unwrap().to_vec();

    conn.handle_message(&mut encoded, &mut cb).unwrap();

    assert_eq!(conn.state(), State::Online);
    let reply = cb
        .outside_writes
        .iter()
        .find(|w| w.first() == Some(&(MsgId::ConfigIpv4 as u8)))
        .expect("a CONFIG_IPV4 reply was sent");
    let decoded = ConfigIpv4Message::decode(&reply[1..]).unwrap();
    assert_eq!(decoded.session, session_id);
    assert_eq!(decoded.parsed_mtu(), HE_MAX_MTU as u32);
    assert_eq!(decoded.mtu_raw, HE_MAX_MTU.to_string());
}

#[test]
fn scenario_3_server_auth_rejected() {
    let ctx = context(0);
    let mut conn = Connection::create();
    conn.set_outside_mtu(1500).unwrap();
    let mut cb = Recorder::default();
    cb.auth_accept = false;

    conn.server_connect(&ctx, PluginChainHandle::new(()), &mut cb)
        .unwrap();

    let auth = helium_core::message::AuthMessage {
        auth_type: helium_core::message::AuthType::UserPass,
        username: "u".to_string(),
        password: "p".to_string(),
    };
    let mut encoded = auth.encode().unwrap().to_vec();

    let result = conn.handle_message(&mut encoded, &mut cb);
    assert_eq!(result.unwrap_err(), HeliumError::AccessDenied);
    assert_eq!(conn.state(), State::Disconnecting);
}

#[test]
fn scenario_4_client_config_receive_bad_mtu_falls_back() {
    let ctx = context(0);
    let mut conn = Connection::create();
    conn.set_username("u").unwrap();
    conn.set_password("p").unwrap();
    conn.set_outside_mtu(1500).unwrap();
    let mut cb = Recorder::default();

    conn.client_connect(&ctx, PluginChainHandle::new(()), &mut cb)
        .unwrap();
    assert_eq!(conn.state(), State::Authenticating);

    let config = ConfigIpv4Message {
        session: 0xabcd,
        local_ip: "10.0.0.1".to_string(),
        peer_ip: "10.0.0.2".to_string(),
        dns_ip: "10.0.0.3".to_string(),
        mtu_raw: "not-a-number".to_string(),
    };
    let mut encoded = config.encode().unwrap().to_vec();

    conn.handle_message(&mut encoded, &mut cb).unwrap();

    assert_eq!(conn.state(), State::Online);
    let seen = cb.client_configs_seen.last().unwrap();
    assert_eq!(seen.mtu, HE_MAX_MTU as u32);
}

#[test]
fn scenario_5_nudge_during_auth_resends_auth() {
    let ctx = context(0);
    let mut conn = Connection::create();
    conn.set_username("u").unwrap();
    conn.set_password("p").unwrap();
    conn.set_outside_mtu(1500).unwrap();
    let mut cb = Recorder::default();

    conn.client_connect(&ctx, PluginChainHandle::new(()), &mut cb)
        .unwrap();
    assert_eq!(conn.state(), State::Authenticating);
    let writes_before = cb.outside_writes.len();

    conn.nudge(&mut cb).unwrap();

    assert!(cb.outside_writes.len() > writes_before);
    let last = cb.outside_writes.last().unwrap();
    assert_eq!(last[0], MsgId::Auth as u8);
}

#[test]
fn scenario_6_disconnect_fires_state_change_twice() {
    let ctx = context(0);
    let mut conn = Connection::create();
    conn.set_outside_mtu(1500).unwrap();
    let mut cb = Recorder::default();
    cb.auth_accept = true;
    cb.config_to_push = Some(NetworkConfigIpv4 {
        local_ip: "10.0.0.1".to_string(),
        peer_ip: "10.0.0.2".to_string(),
        dns_ip: "10.0.0.3".to_string(),
        mtu: 0,
    });

    conn.server_connect(&ctx, PluginChainHandle::new(()), &mut cb)
        .unwrap();
    let auth = helium_core::message::AuthMessage {
        auth_type: helium_core::message::AuthType::UserPass,
        username: "u".to_string(),
        password: "p".to_string(),
    };
    let mut encoded = auth.encode().unwrap().to_vec();
    conn.handle_message(&mut encoded, &mut cb).unwrap();
    assert_eq!(conn.state(), State::Online);

    let changes_before = cb.state_changes.len();
    conn.disconnect(&mut cb).unwrap();

    assert_eq!(conn.state(), State::Disconnected);
    let new_changes = &cb.state_changes[changes_before..];
    assert_eq!(new_changes, &[State::Disconnecting, State::Disconnected]);
}
