//! Simulated hardware.
//!
//! Every type is a cloneable handle over shared state: the control core
//! owns one clone as a driver, tests and the rig keep another to inject
//! conditions and observe effects.

pub mod axis;
pub mod inputs;
pub mod mux;
pub mod peripherals;

pub use axis::SimulatedAxis;
pub use inputs::{SimulatedHomeFlag, SimulatedInput, SimulatedLimitSwitch};
pub use mux::SimulatedMux;
pub use peripherals::{SimulatedRangefinder, SimulatedTilt};
