mod estop_gating;
mod moves;
mod pan_homing;
mod protocol_session;
mod reconnect;
mod support;
