//! Integration test: enable, move, stop and velocity over the wire.

use super::support::Station;
use maquette_common::hal::driver::AxisDriver;
use maquette_common::hal::types::Axis;

#[test]
fn linear_move_reaches_target() {
    let mut st = Station::new();
    let client = st.connect();
    st.enable_all(&client);

    assert_eq!(st.ask(&client, "MOVE:1000,2000,500"), "OK:MOVE_STARTED");
    st.cycles(3);
    assert!(st.ask(&client, "STATUS").contains("MOVING=1"));
    assert_eq!(st.ask(&client, "MOVE:1,1,1"), "ERROR:MOVE_FAILED");

    st.run_until(&client, "INFO:MOVE_COMPLETE");
    assert_eq!(
        st.ask(&client, "STATUS"),
        "OK:X=1000.00,Y=2000.00,Z=500.00,PAN=0.00,TILT=90.00,ESTOP=0,MOVING=0,HOMED=0"
    );
    assert_eq!(st.rig.axis(Axis::Y).unwrap().feedback().position, 2000);
}

#[test]
fn angular_targets_are_optional() {
    let mut st = Station::new();
    let client = st.connect();
    st.enable_all(&client);

    assert_eq!(st.ask(&client, "MOVE:0,0,0,45,120"), "OK:MOVE_STARTED");
    st.run_until(&client, "INFO:MOVE_COMPLETE");
    assert_eq!(st.rig.axis(Axis::Pan).unwrap().feedback().position, 4_500);
    assert_eq!(st.rig.mux().servo_angle(), Some(120.0));

    // Without pan/tilt the angular axes hold.
    assert_eq!(st.ask(&client, "MOVE:10,0,0"), "OK:MOVE_STARTED");
    st.run_until(&client, "INFO:MOVE_COMPLETE");
    let status = st.ask(&client, "STATUS");
    assert!(status.contains("PAN=45.00,TILT=120.00"), "{status}");
}

#[test]
fn negative_targets_leave_axis_alone() {
    let mut st = Station::new();
    let client = st.connect();
    st.enable_all(&client);
    assert_eq!(st.ask(&client, "MOVE:300,300,300"), "OK:MOVE_STARTED");
    st.run_until(&client, "INFO:MOVE_COMPLETE");

    assert_eq!(st.ask(&client, "MOVE:-1,700,-1"), "OK:MOVE_STARTED");
    st.run_until(&client, "INFO:MOVE_COMPLETE");
    assert!(st.ask(&client, "STATUS").starts_with("OK:X=300.00,Y=700.00,Z=300.00"));
}

#[test]
fn move_on_disabled_axis_fails_after_ack() {
    let mut st = Station::new();
    let client = st.connect();
    assert_eq!(st.ask(&client, "MOVE:100,0,0"), "OK:MOVE_STARTED");
    st.run_until(&client, "INFO:MOVE_FAILED");
    assert_eq!(st.rig.axis(Axis::X).unwrap().mechanical_position(), 0.0);
}

#[test]
fn stop_halts_and_returns_to_idle() {
    let mut st = Station::new();
    let client = st.connect();
    st.enable_all(&client);

    assert_eq!(st.ask(&client, "MOVE:50000,0,0"), "OK:MOVE_STARTED");
    st.cycles(40);
    assert_eq!(st.ask(&client, "STOP"), "OK:MOTION_STOPPED");
    let halted = st.rig.axis(Axis::X).unwrap().mechanical_position();
    assert!(halted > 0.0 && halted < 50_000.0);
    st.cycles(40);
    assert_eq!(st.rig.axis(Axis::X).unwrap().mechanical_position(), halted);
    assert!(st.ask(&client, "STATUS").contains("MOVING=0"));

    assert_eq!(st.ask(&client, "MOVE:0,0,0"), "OK:MOVE_STARTED");
    st.run_until(&client, "INFO:MOVE_COMPLETE");
}

#[test]
fn velocity_and_pan_commands() {
    let mut st = Station::new();
    let client = st.connect();
    st.enable_all(&client);

    assert_eq!(st.ask(&client, "VELOCITY:2000,3000"), "ERROR:MISSING_PARAMS");
    assert_eq!(st.ask(&client, "VELOCITY:2000,3000,4000"), "OK:VELOCITY_SET");
    assert_eq!(st.rig.axis(Axis::Z).unwrap().velocity_limit(), 4000.0);
    assert_eq!(st.rig.axis(Axis::Pan).unwrap().velocity_limit(), 2000.0);

    assert_eq!(st.ask(&client, "PAN:30"), "OK:PAN_SET");
    st.run_until(&client, "INFO:MOVE_COMPLETE");
    assert_eq!(st.rig.axis(Axis::Pan).unwrap().feedback().position, 3_000);

    assert_eq!(st.ask(&client, "DISABLE:PAN"), "OK:AXIS_DISABLED");
    assert_eq!(st.ask(&client, "PAN:10"), "ERROR:PAN_FAILED");
}

#[test]
fn fault_during_move_is_recovered() {
    let mut st = Station::new();
    let client = st.connect();
    st.enable_all(&client);

    assert_eq!(st.ask(&client, "MOVE:5000,0,0"), "OK:MOVE_STARTED");
    st.cycles(10);
    st.rig.axis(Axis::X).unwrap().inject_fault();
    st.run_until(&client, "INFO:MOVE_COMPLETE");
    assert_eq!(st.rig.axis(Axis::X).unwrap().feedback().position, 5000);
}

#[test]
fn axis_dropped_locally_fails_the_next_move() {
    let mut st = Station::new();
    let client = st.connect();
    st.enable_all(&client);

    st.control.dispatcher_mut().engine_mut().disable_axis(Axis::Y);
    assert!(!st.control.dispatcher().engine().is_enabled(Axis::Y));
    assert!(!st.rig.axis(Axis::Y).unwrap().feedback().energized);

    assert_eq!(st.ask(&client, "MOVE:100,100,0"), "OK:MOVE_STARTED");
    st.run_until(&client, "INFO:MOVE_FAILED");
    assert_eq!(st.rig.axis(Axis::Y).unwrap().mechanical_position(), 0.0);
}

#[test]
fn limit_switch_trips_a_move_until_reset() {
    let mut st = Station::new();
    let client = st.connect();
    st.enable_all(&client);
    st.rig.axis(Axis::X).unwrap().set_travel_limit(Some(2_000.0));

    assert_eq!(st.ask(&client, "MOVE:5000,300,0"), "OK:MOVE_STARTED");
    let seen = st.run_until(&client, "INFO:LIMIT_TRIPPED");
    assert_eq!(seen.last().map(String::as_str), Some("INFO:LIMIT_TRIPPED:X"));
    st.run_until(&client, "INFO:MOVE_FAILED");

    let x = st.rig.axis(Axis::X).unwrap();
    assert!((x.mechanical_position() - 2_000.0).abs() < 1.0);
    assert!(!x.feedback().energized);
    assert!(!st.rig.axis(Axis::Y).unwrap().feedback().energized);
    assert!(st.ask(&client, "STATUS").contains("MOVING=0"));

    // Carriage still on the switch: the trip stays latched.
    assert_eq!(st.ask(&client, "RESET"), "OK:RESETTING");
    assert_eq!(
        st.control.dispatcher().engine().limit_trip(),
        Some(Axis::X)
    );
    assert_eq!(st.ask(&client, "MOVE:100,0,0"), "ERROR:MOVE_FAILED");

    st.rig.axis(Axis::X).unwrap().place_at(1_500.0);
    assert_eq!(st.ask(&client, "RESET"), "OK:RESETTING");
    assert_eq!(st.control.dispatcher().engine().limit_trip(), None);

    st.enable_all(&client);
    assert_eq!(st.ask(&client, "MOVE:0,0,0"), "OK:MOVE_STARTED");
    st.run_until(&client, "INFO:MOVE_COMPLETE");
    assert_eq!(st.rig.axis(Axis::X).unwrap().feedback().position, 0);
}

#[test]
fn limit_switch_aborts_homing() {
    let mut st = Station::new();
    let client = st.connect();
    st.enable_all(&client);
    st.rig.axis(Axis::Z).unwrap().set_travel_limit(Some(2_000.0));

    assert_eq!(st.ask(&client, "HOME:ALL"), "OK:HOMING_STARTED");
    st.cycles(5);
    st.rig.axis(Axis::Z).unwrap().place_at(2_100.0);

    let seen = st.run_until(&client, "INFO:HOMING_FAILED");
    assert!(
        seen.iter().any(|line| line == "INFO:LIMIT_TRIPPED:Z"),
        "saw {seen:?}"
    );
    let pan = st.rig.axis(Axis::Pan).unwrap();
    assert!(!pan.feedback().energized);
    let parked = pan.mechanical_position();
    st.cycles(20);
    assert_eq!(st.rig.axis(Axis::Pan).unwrap().mechanical_position(), parked);
    assert!(st.ask(&client, "STATUS").ends_with("HOMED=0"));

    assert_eq!(st.ask(&client, "RESET"), "OK:RESETTING");
    assert_eq!(st.ask(&client, "HOME:ALL"), "ERROR:HOMING_FAILED");

    st.rig.axis(Axis::Z).unwrap().place_at(0.0);
    assert_eq!(st.ask(&client, "RESET"), "OK:RESETTING");
    st.enable_all(&client);
    assert_eq!(st.ask(&client, "HOME:ALL"), "OK:HOMING_STARTED");
    st.run_until(&client, "INFO:HOMING_COMPLETE");
}
