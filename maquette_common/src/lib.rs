//! Maquette Common Library
//!
//! Shared vocabulary for every crate of the maquette rig workspace: axis
//! identifiers, protocol and motion constants, the driver traits through
//! which the core talks to actuators and peripherals, and the TOML
//! configuration layer.
//!
//! # Module Structure
//!
//! - [`consts`] - Protocol, motion and transport constants
//! - [`config`] - Configuration loading traits and types
//! - [`store`] - Key/value configuration store collaborator
//! - [`hal`] - Driver traits and actuator feedback types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use maquette_common::prelude::*;
//!
//! assert_eq!(Axis::parse_token("pan"), Some(Axis::Pan));
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
pub mod store;
