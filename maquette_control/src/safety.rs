//! Safety module root.
//!
//! Emergency-stop interlock and the seam it uses to de-energize the
//! actuators.

pub mod estop;

pub use estop::{EmergencyStop, InterlockError, InterlockTarget};
