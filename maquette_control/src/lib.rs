//! # Maquette Control Library
//!
//! Firmware core of the maquette camera gantry: a line protocol, a
//! command dispatcher with interlock gating, a non-blocking motion engine
//! over four step/direction drives and a tilt servo, an e-stop interlock
//! and a single-peer network transport.
//!
//! ## Architecture
//!
//! ```text
//!  peer ──TCP──► NetworkTransport ──bytes──► CommandParser ──Frame──► Dispatcher
//!    ▲             (heartbeat, backoff,        (CRC-16, 63-byte         │  gating by
//!    │              pending queue)              buffer, backspace)      │  EmergencyStop
//!    │                                                                  ▼
//!    └────────── OK:/ERROR:/INFO: lines ◄──────────────────────── MotionEngine
//!                                                                 (enable, move,
//!                                                                  pan homing jobs)
//! ```
//!
//! [`cycle::ControlLoop`] runs every stage once per cycle without
//! blocking; jobs advance through `poll(now)` and report completion as
//! unsolicited `INFO:` notices.
//!
//! ## Module Structure
//!
//! - [`protocol`] - CRC-16, frames, the incremental parser, responses
//! - [`dispatch`] - Command routing and the five command groups
//! - [`motion`] - Axis bookkeeping, tilt clamp, recovery and homing jobs
//! - [`safety`] - E-stop interlock
//! - [`transport`] - Connection state machine over a listener seam
//! - [`config`] - `maquette.toml`
//! - [`cycle`] - The control loop

pub mod config;
pub mod cycle;
pub mod dispatch;
pub mod motion;
pub mod protocol;
pub mod safety;
pub mod transport;
