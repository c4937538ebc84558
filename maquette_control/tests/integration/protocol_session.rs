//! Integration test: one peer session over the loopback transport.

use super::support::{Station, with_crc};
use maquette_common::consts::HEARTBEAT_MARKER;
use maquette_control::transport::ConnectionState;

#[test]
fn ping_with_and_without_checksum() {
    let mut st = Station::new();
    let client = st.connect();
    assert_eq!(st.ask(&client, "PING"), "OK:PONG");
    assert_eq!(st.ask(&client, &with_crc("PING")), "OK:PONG");
    assert_eq!(st.ask(&client, "PING;0000"), "ERROR:CHECKSUM_MISMATCH");
    assert_eq!(st.ask(&client, "PING;"), "ERROR:CHECKSUM_MISMATCH");
}

#[test]
fn several_lines_in_one_read_answer_in_order() {
    let mut st = Station::new();
    let client = st.connect();
    client.send(b"PING\nSTATUS\r\nNOPE\n");
    st.cycle();
    let lines = client.take_lines();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "OK:PONG");
    assert!(lines[1].starts_with("OK:X=0.00,"));
    assert_eq!(lines[2], "ERROR:UNKNOWN_COMMAND");
}

#[test]
fn line_split_across_reads_is_reassembled() {
    let mut st = Station::new();
    let client = st.connect();
    client.send(b"PI");
    st.cycle();
    assert!(client.take_lines().is_empty());
    client.send(b"NX\x08G\n");
    st.cycle();
    assert_eq!(client.take_lines(), vec!["OK:PONG"]);
}

#[test]
fn overlong_line_is_cut_at_buffer_capacity() {
    let mut st = Station::new();
    let client = st.connect();
    let long = format!("PING{}", "A".repeat(100));
    assert_eq!(st.ask(&client, &long), "ERROR:UNKNOWN_COMMAND");
    assert_eq!(st.ask(&client, "PING"), "OK:PONG");
}

#[test]
fn status_reports_rest_position() {
    let mut st = Station::new();
    let client = st.connect();
    assert_eq!(
        st.ask(&client, "STATUS"),
        "OK:X=0.00,Y=0.00,Z=0.00,PAN=0.00,TILT=90.00,ESTOP=0,MOVING=0,HOMED=0"
    );
}

#[test]
fn measure_goes_through_device_mux() {
    let mut st = Station::new();
    let client = st.connect();
    assert_eq!(st.ask(&client, "MEASURE"), "OK:1000.000");

    st.rig.mux().set_distance_reply("DIST:-5");
    assert_eq!(st.ask(&client, "MEASURE"), "ERROR:OUT_OF_RANGE");

    st.rig.mux().set_distance_reply("garbage");
    assert_eq!(st.ask(&client, "MEASURE"), "ERROR:MEASUREMENT_FAILED");
}

#[test]
fn tilt_command_reaches_servo_controller() {
    let mut st = Station::new();
    let client = st.connect();
    assert_eq!(st.ask(&client, "TILT:120.5"), "OK:TILT_SET");
    assert_eq!(st.rig.mux().servo_angle(), Some(120.5));
    assert_eq!(st.ask(&client, "TILT:10"), "OK:TILT_SET");
    assert_eq!(st.rig.mux().servo_angle(), Some(45.0));
}

#[test]
fn store_round_trip_over_the_wire() {
    let mut st = Station::new();
    let client = st.connect();
    assert_eq!(st.ask(&client, "SET:operator,bench"), "OK:VALUE_SET");
    assert_eq!(st.ask(&client, "GET:operator"), "OK:bench");
    assert_eq!(st.ask(&client, "CONFIG:LIST"), "OK:operator");
    assert_eq!(st.ask(&client, "SAVE"), "OK:CONFIG_SAVED");
}

#[test]
fn heartbeat_markers_are_interleaved_with_replies() {
    let mut st = Station::new();
    let client = st.connect();
    // Keep the link busy so the 60 s timeout never fires.
    for _ in 0..3 {
        st.cycles(2_000);
        assert_eq!(st.ask(&client, "PING"), "OK:PONG");
    }
    client.send_line("PING");
    st.cycles(2_000);
    let raw = client.take_received();
    assert!(raw.windows(4).any(|w| w == HEARTBEAT_MARKER));
    assert_eq!(st.control.transport().state(), ConnectionState::Connected);
}

#[test]
fn debug_toggle_and_parameter_errors() {
    let mut st = Station::new();
    let client = st.connect();
    assert_eq!(st.ask(&client, "DEBUG:ON"), "OK:DEBUG_ENABLED");
    assert!(st.control.dispatcher().is_debug());
    assert_eq!(st.ask(&client, "DEBUG:MAYBE"), "ERROR:INVALID_PARAM");
    assert_eq!(st.ask(&client, "DEBUG"), "ERROR:MISSING_PARAM");
    assert_eq!(st.ask(&client, "MOVE:1,2"), "ERROR:MISSING_PARAMS");
    assert_eq!(st.ask(&client, "HOME:W"), "ERROR:INVALID_AXIS");
    assert_eq!(st.ask(&client, "SCAN:0,0,10,10"), "ERROR:MISSING_PARAMS");
    assert_eq!(st.ask(&client, "SCAN:0,0,10,10,1"), "OK:SCAN_STARTED");
}
