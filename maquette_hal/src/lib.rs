//! # Maquette HAL Library
//!
//! Simulation back-end for the maquette rig. Every type here implements
//! one of the driver traits from `maquette_common::hal::driver`, so the
//! control core runs unchanged against simulated or real hardware.
//!
//! # Module Structure
//!
//! - [`sim`] - Simulated axes, inputs, peripherals and device multiplexer
//! - [`devices`] - Serial peripheral consumers speaking over a `DeviceMux`
//! - [`rig`] - `SimulatedRig`, one assembly of all simulated parts
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        SimulatedRig                        │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │ SimulatedAxis│  │ home flag /  │  │ SimulatedMux     │  │
//! │  │  x4 (physics)│◄─┤ e-stop input │  │  tilt + distance │  │
//! │  └──────┬───────┘  └──────────────┘  └────────┬─────────┘  │
//! │         │ shared handles (Arc<Mutex<..>>)     │            │
//! └─────────┼─────────────────────────────────────┼────────────┘
//!           ▼                                     ▼
//!      AxisDriver                  MuxTiltServo / MuxRangefinder
//! ```

#![deny(missing_docs)]

pub mod devices;
pub mod rig;
pub mod sim;

pub use crate::rig::{RigHandles, SimulatedRig, SimulationConfig};
