//! Hardware abstraction seam.
//!
//! Driver traits for every actuator and peripheral the core talks to,
//! plus the feedback and error types they report.

pub mod driver;
pub mod types;
