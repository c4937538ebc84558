//! Integration test: peer loss, backoff reconnect, replay and re-listen.

use super::support::Station;
use maquette_control::transport::{ConnectionState, TransportErrorCode, TransportSettings};
use std::time::Duration;

fn settings(max_attempts: u32) -> TransportSettings {
    TransportSettings {
        max_reconnect_attempts: max_attempts,
        ..TransportSettings::default()
    }
}

#[test]
fn peer_loss_reconnects_on_backoff_schedule() {
    let mut st = Station::with_transport(settings(5), Duration::from_secs(30));
    let first = st.connect();
    assert_eq!(st.ask(&first, "PING"), "OK:PONG");

    first.close();
    st.cycle();
    let transport = st.control.transport();
    assert!(!transport.is_connected());
    assert_eq!(transport.state(), ConnectionState::Reconnecting);
    assert_eq!(transport.last_error(), TransportErrorCode::ReconnectFailed);
    assert_eq!(transport.stats().reconnect_attempts, 1);

    // The next attempt waits out the first backoff step.
    let second = st.connector.connect();
    st.cycles(100);
    assert!(!st.control.transport().is_connected());
    st.cycles(110);
    let transport = st.control.transport();
    assert!(transport.is_connected());
    assert_eq!(transport.stats().reconnect_attempts, 2);
    assert_eq!(transport.stats().reconnect_successes, 1);
    assert_eq!(transport.stats().connection_count, 2);
    assert_eq!(st.ask(&second, "PING"), "OK:PONG");
}

#[test]
fn replies_queued_while_down_are_replayed_in_order() {
    let mut st = Station::with_transport(settings(5), Duration::from_secs(30));
    let first = st.connect();
    first.close();
    st.cycle();

    st.rig.set_estop_tripped(true);
    st.cycle();
    st.rig.set_estop_tripped(false);
    assert_eq!(st.control.transport().pending_chunks(), 1);

    let second = st.connector.connect();
    st.cycles(250);
    assert!(st.control.transport().is_connected());
    assert_eq!(st.control.transport().pending_chunks(), 0);
    assert_eq!(second.take_lines(), vec!["INFO:ESTOP_ACTIVATED"]);
    assert_eq!(st.ask(&second, "RESET_ESTOP"), "OK:ESTOP_RESET");
}

#[test]
fn exhausted_reconnects_park_until_relisten() {
    let mut st = Station::with_transport(settings(2), Duration::from_secs(1));
    let first = st.connect();
    first.close();
    st.cycle();

    // Second and last attempt after one second.
    st.cycles(210);
    let transport = st.control.transport();
    assert!(transport.is_exhausted());
    assert_eq!(transport.state(), ConnectionState::Disconnected);
    assert_eq!(transport.stats().reconnect_attempts, 2);

    // Parked: a waiting peer is not picked up by the backoff path.
    let second = st.connector.connect();
    st.cycles(20);
    assert!(!st.control.transport().is_connected());

    // The loop re-listens once the interval has passed.
    st.cycles(200);
    assert!(st.control.transport().is_connected());
    assert!(!st.control.transport().is_exhausted());
    assert_eq!(st.ask(&second, "PING"), "OK:PONG");
}

#[test]
fn idle_peer_times_out() {
    let mut st = Station::with_transport(
        TransportSettings {
            connection_timeout: Duration::from_millis(500),
            heartbeat_interval: Duration::from_millis(100),
            auto_reconnect: false,
            ..TransportSettings::default()
        },
        Duration::from_secs(30),
    );
    let client = st.connect();
    // Heartbeats alone do not count as activity.
    st.cycles(110);
    assert!(client.is_closed());
    let transport = st.control.transport();
    assert_eq!(transport.state(), ConnectionState::Disconnected);
    assert_eq!(transport.last_error(), TransportErrorCode::Timeout);

    // Without auto-reconnect the listener accepts the next peer at once.
    let next = st.connect();
    assert_eq!(st.ask(&next, "PING"), "OK:PONG");
}

#[test]
fn diagnostics_line_reflects_session() {
    let mut st = Station::new();
    let client = st.connect();
    st.ask(&client, "PING");
    let line = st.control.transport().diagnostics(st.now);
    assert!(line.starts_with("state=Connected"), "{line}");
    assert!(line.contains("pending=0"), "{line}");
}

#[test]
fn manual_disconnect_frees_the_port_for_the_next_peer() {
    let mut st = Station::new();
    let first = st.connect();
    st.control.transport_mut().disconnect();
    assert!(first.is_closed());
    assert_eq!(st.control.transport().stats().reconnect_attempts, 0);

    let second = st.connect();
    assert_eq!(st.ask(&second, "PING"), "OK:PONG");
    assert_eq!(st.control.transport().stats().connection_count, 2);
}
