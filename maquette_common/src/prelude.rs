//! Prelude module for common re-exports.
//!
//! ```rust
//! use maquette_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::store::{ConfigStore, MemoryConfigStore, StoreError, StoreValue, TomlFileStore};

// ─── Hardware seam ──────────────────────────────────────────────────
pub use crate::hal::driver::{
    AxisDriver, DeviceError, DeviceMux, DigitalInput, DriverError, MeasurementError, MuxDevice,
    Rangefinder, TiltActuator,
};
pub use crate::hal::types::{AlertFlags, Axis, AxisFeedback};
