//! Integration test: e-stop interlock gating across the full loop.

use super::support::Station;
use maquette_common::hal::driver::AxisDriver;
use maquette_common::hal::types::Axis;

#[test]
fn hardware_trip_is_announced_and_gates_commands() {
    let mut st = Station::new();
    let client = st.connect();

    st.rig.set_estop_tripped(true);
    st.cycle();
    assert_eq!(client.take_lines(), vec!["INFO:ESTOP_ACTIVATED"]);

    // Announced once per trip.
    st.cycles(10);
    assert!(client.take_lines().is_empty());

    assert_eq!(st.ask(&client, "PING"), "ERROR:ESTOP_ACTIVE");
    assert_eq!(st.ask(&client, "ENABLE:ALL"), "ERROR:ESTOP_ACTIVE");
    assert_eq!(st.ask(&client, "TILT:100"), "ERROR:ESTOP_ACTIVE");
    assert!(st.ask(&client, "STATUS").contains("ESTOP=1"));
    assert_eq!(st.ask(&client, "RESET_ESTOP"), "ERROR:ESTOP_STILL_ACTIVE");

    st.rig.set_estop_tripped(false);
    assert_eq!(st.ask(&client, "RESET_ESTOP"), "OK:ESTOP_RESET");
    assert_eq!(st.ask(&client, "PING"), "OK:PONG");
    assert!(st.ask(&client, "STATUS").contains("ESTOP=0"));
}

#[test]
fn software_estop_latches_until_reset() {
    let mut st = Station::new();
    let client = st.connect();
    st.enable_all(&client);

    assert_eq!(st.ask(&client, "ESTOP"), "OK:ESTOP_ACTIVATED");
    for axis in Axis::DRIVEN {
        let sim = st.rig.axis(axis).unwrap();
        assert!(!sim.feedback().energized, "{axis:?} still energized");
    }
    assert_eq!(st.ask(&client, "MOVE:100,0,0"), "ERROR:ESTOP_ACTIVE");

    // The line is healthy, so the latch clears on request.
    assert_eq!(st.ask(&client, "RESET_ESTOP"), "OK:ESTOP_RESET");
    // Axes stay de-energized until explicitly enabled.
    assert!(!st.rig.axis(Axis::X).unwrap().feedback().energized);
    st.enable_all(&client);
    assert_eq!(st.ask(&client, "MOVE:100,0,0"), "OK:MOVE_STARTED");
    st.run_until(&client, "INFO:MOVE_COMPLETE");
}

#[test]
fn trip_during_move_aborts_it() {
    let mut st = Station::new();
    let client = st.connect();
    st.enable_all(&client);

    assert_eq!(st.ask(&client, "MOVE:20000,20000,0"), "OK:MOVE_STARTED");
    st.cycles(20);
    st.rig.set_estop_tripped(true);
    st.cycle();
    assert_eq!(
        client.take_lines(),
        vec!["INFO:ESTOP_ACTIVATED", "INFO:MOVE_FAILED"]
    );

    let stopped_at = st.rig.axis(Axis::X).unwrap().mechanical_position();
    st.cycles(50);
    assert_eq!(st.rig.axis(Axis::X).unwrap().mechanical_position(), stopped_at);

    // Error phase persists after release until RESET.
    st.rig.set_estop_tripped(false);
    assert_eq!(st.ask(&client, "RESET_ESTOP"), "OK:ESTOP_RESET");
    st.enable_all(&client);
    assert_eq!(st.ask(&client, "MOVE:0,0,0"), "ERROR:MOVE_FAILED");
    assert_eq!(st.ask(&client, "RESET"), "OK:RESETTING");
    assert_eq!(st.ask(&client, "MOVE:0,0,0"), "OK:MOVE_STARTED");
    st.run_until(&client, "INFO:MOVE_COMPLETE");
}

#[test]
fn notices_queue_while_no_peer_is_connected() {
    let mut st = Station::new();
    st.rig.set_estop_tripped(true);
    st.cycle();
    assert_eq!(st.control.transport().pending_chunks(), 1);

    let client = st.connect();
    assert_eq!(client.take_lines(), vec!["INFO:ESTOP_ACTIVATED"]);
}
