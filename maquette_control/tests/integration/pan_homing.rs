//! Integration test: HOME over the wire, pan flag search on the simulated
//! stage (flag window 9000..9400 counts of 36000).

use super::support::Station;
use maquette_common::hal::driver::AxisDriver;
use maquette_common::hal::types::Axis;

#[test]
fn home_all_requires_enabled_axes() {
    let mut st = Station::new();
    let client = st.connect();
    assert_eq!(st.ask(&client, "HOME"), "ERROR:MISSING_PARAM");
    assert_eq!(st.ask(&client, "HOME:ALL"), "ERROR:HOMING_FAILED");
    assert_eq!(st.ask(&client, "HOME:X"), "ERROR:HOMING_FAILED");
    assert_eq!(st.ask(&client, "HOME:PAN"), "ERROR:INVALID_AXIS");
}

#[test]
fn home_all_from_outside_flag() {
    let mut st = Station::new();
    let client = st.connect();
    st.enable_all(&client);

    assert_eq!(st.ask(&client, "MOVE:400,500,600"), "OK:MOVE_STARTED");
    st.run_until(&client, "INFO:MOVE_COMPLETE");

    assert_eq!(st.ask(&client, "HOME:ALL"), "OK:HOMING_STARTED");
    assert_eq!(st.ask(&client, "MOVE:1,1,1"), "ERROR:MOVE_FAILED");
    st.run_until(&client, "INFO:HOMING_COMPLETE");

    assert_eq!(
        st.ask(&client, "STATUS"),
        "OK:X=0.00,Y=0.00,Z=0.00,PAN=0.00,TILT=90.00,ESTOP=0,MOVING=0,HOMED=1"
    );
    let pan = st.rig.axis(Axis::Pan).unwrap();
    let edge = pan.mechanical_position();
    assert!((9_000.0..9_400.0).contains(&edge), "stopped at {edge}");
    assert_eq!(pan.feedback().position, 0);
    assert_eq!(pan.velocity_limit(), 10_000.0);

    let report = st.control.dispatcher().engine().last_pan_homing().unwrap();
    assert_eq!(report.segments, 1);
}

#[test]
fn home_all_from_inside_flag_runs_two_segments() {
    let mut st = Station::new();
    st.rig.axis(Axis::Pan).unwrap().place_at(9_100.0);
    let client = st.connect();
    st.enable_all(&client);

    assert_eq!(st.ask(&client, "HOME:ALL"), "OK:HOMING_STARTED");
    st.run_until(&client, "INFO:HOMING_COMPLETE");

    let report = st.control.dispatcher().engine().last_pan_homing().unwrap();
    assert_eq!(report.segments, 2);
    // A full revolution later, the flag edge is met again.
    let edge = st.rig.axis(Axis::Pan).unwrap().mechanical_position();
    assert!((45_000.0..45_400.0).contains(&edge), "stopped at {edge}");
}

#[test]
fn linear_home_is_software_zero() {
    let mut st = Station::new();
    let client = st.connect();
    st.enable_all(&client);
    assert_eq!(st.ask(&client, "MOVE:1234,0,0"), "OK:MOVE_STARTED");
    st.run_until(&client, "INFO:MOVE_COMPLETE");

    assert_eq!(st.ask(&client, "HOME:X"), "OK:HOMING_STARTED");
    let status = st.ask(&client, "STATUS");
    assert!(status.starts_with("OK:X=0.00,"), "{status}");
    assert!(status.ends_with("HOMED=0"), "{status}");
    assert_eq!(st.rig.axis(Axis::X).unwrap().mechanical_position(), 1234.0);
}

#[test]
fn trip_during_homing_restores_pan_velocity() {
    let mut st = Station::new();
    let client = st.connect();
    st.enable_all(&client);

    assert_eq!(st.ask(&client, "HOME:ALL"), "OK:HOMING_STARTED");
    st.cycles(100);
    st.rig.set_estop_tripped(true);
    st.cycle();
    assert_eq!(
        client.take_lines(),
        vec!["INFO:ESTOP_ACTIVATED", "INFO:HOMING_FAILED"]
    );
    assert_eq!(st.rig.axis(Axis::Pan).unwrap().velocity_limit(), 10_000.0);
    assert!(st.ask(&client, "STATUS").ends_with("HOMED=0"));
}
