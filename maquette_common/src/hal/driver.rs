//! Driver traits and error types.
//!
//! This module defines the collaborators the core is written against:
//! - `AxisDriver` - Step/direction actuator with feedback and alerts
//! - `DigitalInput` - Single binary sensor (e-stop, pan home flag)
//! - `TiltActuator` - Angle-commanded servo
//! - `Rangefinder` - Distance sensor
//! - `DeviceMux` - Shared half-duplex serial channel with a selectable peer
//!
//! None of the methods block on motion. Completion is observed by polling
//! `AxisDriver::feedback`.

use crate::hal::types::{AlertFlags, AxisFeedback};
use thiserror::Error;

/// Errors reported by an axis driver when a command is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The drive is not energized.
    #[error("axis is not enabled")]
    NotEnabled,

    /// Alerts are latched and must be cleared first.
    #[error("axis has latched alerts: {0:?}")]
    InAlert(AlertFlags),
}

/// Errors from serial peripherals behind the device multiplexer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// No reply within the device timeout.
    #[error("device did not answer in time")]
    Timeout,

    /// The device answered with something other than an acknowledgement.
    #[error("device rejected command: {0}")]
    Rejected(String),

    /// The channel itself failed.
    #[error("device channel error: {0}")]
    Channel(String),
}

/// Rangefinder measurement failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MeasurementError {
    /// Target outside the valid sensing range.
    #[error("target out of range")]
    OutOfRange,

    /// No usable reading.
    #[error("measurement failed")]
    Failed,
}

impl MeasurementError {
    /// Sentinel the sensor firmware uses for an out-of-range target.
    pub const OUT_OF_RANGE_SENTINEL: f32 = -2.0;

    /// Convert a sentinel-style reading into a typed result.
    ///
    /// Non-negative values are distances, `-2` is out of range and any
    /// other negative value is a failure.
    pub fn from_sentinel(value: f32) -> Result<f32, MeasurementError> {
        if value >= 0.0 {
            Ok(value)
        } else if value == Self::OUT_OF_RANGE_SENTINEL {
            Err(Self::OutOfRange)
        } else {
            Err(Self::Failed)
        }
    }
}

/// Step/direction actuator with high-level feedback.
///
/// # Contract
///
/// | Operation | Blocking | Notes |
/// |-----------|----------|-------|
/// | `enable` / `disable` | no | `ready` follows `enable` after a drive-specific delay |
/// | `move_absolute` / `move_relative` | no | refused while disabled or alerted |
/// | `stop_abrupt` | no | discards remaining steps, no ramp |
/// | `set_position_reference` | no | redefines the commanded position |
pub trait AxisDriver: Send {
    /// Assert the enable output.
    fn enable(&mut self);

    /// Release the enable output immediately.
    fn disable(&mut self);

    /// Current feedback snapshot.
    fn feedback(&self) -> AxisFeedback;

    /// Velocity limit in counts/s, applied to subsequent moves.
    fn set_velocity_limit(&mut self, counts_per_s: f64);

    /// Currently configured velocity limit.
    fn velocity_limit(&self) -> f64;

    /// Acceleration limit in counts/s².
    fn set_acceleration_limit(&mut self, counts_per_s2: f64);

    /// Start an absolute move.
    fn move_absolute(&mut self, target: i32) -> Result<(), DriverError>;

    /// Start a move relative to the commanded position.
    fn move_relative(&mut self, delta: i32) -> Result<(), DriverError>;

    /// Halt immediately without deceleration.
    fn stop_abrupt(&mut self);

    /// Redefine the current commanded position.
    fn set_position_reference(&mut self, position: i32);

    /// Clear latched alerts.
    fn clear_alerts(&mut self);
}

/// Single binary input line, reported at its electrical level.
pub trait DigitalInput: Send {
    /// `true` when the line is electrically high.
    fn is_high(&self) -> bool;
}

/// Angle-commanded servo.
pub trait TiltActuator: Send {
    /// Command an angle in degrees. `Ok` means the device acknowledged it.
    fn command_angle(&mut self, degrees: f32) -> Result<(), DeviceError>;
}

/// Distance sensor.
pub trait Rangefinder: Send {
    /// Take one measurement in millimetres.
    fn take_measurement(&mut self) -> Result<f32, MeasurementError>;

    /// Toggle verbose diagnostic output. Default is a no-op.
    fn set_verbose(&mut self, _verbose: bool) {}
}

/// Peers reachable through the device multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxDevice {
    TiltServo,
    Rangefinder,
}

/// Shared half-duplex serial channel with a selectable active peer.
pub trait DeviceMux: Send {
    /// Route the channel to `device`.
    fn switch_to(&mut self, device: MuxDevice);

    /// Write bytes to the active peer.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, DeviceError>;

    /// Read one byte from the active peer if available.
    fn read_byte(&mut self) -> Option<u8>;
}
