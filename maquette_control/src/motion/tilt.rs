//! Tilt servo control with angular clamp.
//!
//! The servo has no position feedback. The engine's tilt angle is the
//! last angle the actuator acknowledged, always inside `[min, max]`.

use super::MotionError;
use maquette_common::consts::{DEFAULT_TILT_MAX, DEFAULT_TILT_MIN, TILT_RANGE_MAX};
use maquette_common::hal::driver::{DeviceError, TiltActuator};
use tracing::{info, warn};

/// Tilt angle and its clamp range, degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltState {
    pub angle: f32,
    pub min: f32,
    pub max: f32,
    /// Always inside `[min, max]`.
    pub home: f32,
}

/// Clamp-enforcing wrapper around the tilt actuator.
pub struct TiltControl {
    actuator: Box<dyn TiltActuator>,
    state: TiltState,
    enabled: bool,
}

impl TiltControl {
    /// Servo with the default clamp. `home` is clamped into it.
    pub fn new(actuator: Box<dyn TiltActuator>, home: f32) -> Self {
        Self {
            actuator,
            state: TiltState {
                angle: 0.0,
                min: DEFAULT_TILT_MIN,
                max: DEFAULT_TILT_MAX,
                home: home.clamp(DEFAULT_TILT_MIN, DEFAULT_TILT_MAX),
            },
            enabled: true,
        }
    }

    pub fn state(&self) -> TiltState {
        self.state
    }

    pub fn angle(&self) -> f32 {
        self.state.angle
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Command `requested`, clamped into the limits. The stored angle
    /// changes only once the actuator acknowledges.
    pub fn set_angle(&mut self, requested: f32) -> Result<f32, DeviceError> {
        let angle = requested.clamp(self.state.min, self.state.max);
        if angle != requested {
            warn!(requested, clamped = angle, "tilt angle clamped to limits");
        }
        self.actuator.command_angle(angle)?;
        self.state.angle = angle;
        Ok(angle)
    }

    pub fn go_home(&mut self) -> Result<f32, DeviceError> {
        self.set_angle(self.state.home)
    }

    /// Replace the clamp range. Requires `0 <= min < max <= 180`.
    ///
    /// The home angle is pulled into the new range. If the current angle
    /// falls outside it, the servo is re-commanded to the nearest limit.
    pub fn set_limits(&mut self, min: f32, max: f32) -> Result<(), MotionError> {
        if !(min >= 0.0 && min < max && max <= TILT_RANGE_MAX) {
            warn!(min, max, "invalid tilt limits rejected");
            return Err(MotionError::InvalidTiltLimits { min, max });
        }
        self.state.min = min;
        self.state.max = max;
        self.state.home = self.state.home.clamp(min, max);
        info!(min, max, "tilt limits set");

        if !(min..=max).contains(&self.state.angle) {
            if let Err(e) = self.set_angle(self.state.angle) {
                warn!(error = %e, "tilt re-clamp after limit change failed");
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for TiltControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiltControl")
            .field("state", &self.state)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
