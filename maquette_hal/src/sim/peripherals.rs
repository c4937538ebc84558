//! Directly simulated peripherals.
//!
//! These implement the peripheral traits without going through a serial
//! channel, which keeps engine tests independent of line framing.

use maquette_common::hal::driver::{DeviceError, MeasurementError, Rangefinder, TiltActuator};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct TiltState {
    history: Vec<f32>,
    reject: bool,
}

/// Tilt servo that records every acknowledged angle.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTilt {
    state: Arc<Mutex<TiltState>>,
}

impl SimulatedTilt {
    /// Create a servo that acknowledges every command.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse (or accept again) subsequent commands.
    pub fn set_reject(&self, reject: bool) {
        self.state.lock().reject = reject;
    }

    /// Last acknowledged angle.
    pub fn last_angle(&self) -> Option<f32> {
        self.state.lock().history.last().copied()
    }

    /// All acknowledged angles in order.
    pub fn history(&self) -> Vec<f32> {
        self.state.lock().history.clone()
    }
}

impl TiltActuator for SimulatedTilt {
    fn command_angle(&mut self, degrees: f32) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if state.reject {
            return Err(DeviceError::Timeout);
        }
        debug!(degrees, "tilt servo command");
        state.history.push(degrees);
        Ok(())
    }
}

#[derive(Debug)]
struct RangeState {
    next: Result<f32, MeasurementError>,
    verbose: bool,
    taken: u32,
}

/// Rangefinder returning a programmable reading.
#[derive(Debug, Clone)]
pub struct SimulatedRangefinder {
    state: Arc<Mutex<RangeState>>,
}

impl SimulatedRangefinder {
    /// Create a sensor that reads `distance_mm`.
    pub fn new(distance_mm: f32) -> Self {
        Self {
            state: Arc::new(Mutex::new(RangeState {
                next: Ok(distance_mm),
                verbose: false,
                taken: 0,
            })),
        }
    }

    /// Set the result of subsequent measurements.
    pub fn set_reading(&self, reading: Result<f32, MeasurementError>) {
        self.state.lock().next = reading;
    }

    /// Whether verbose output was requested.
    pub fn verbose(&self) -> bool {
        self.state.lock().verbose
    }

    /// Number of measurements taken.
    pub fn measurements_taken(&self) -> u32 {
        self.state.lock().taken
    }
}

impl Rangefinder for SimulatedRangefinder {
    fn take_measurement(&mut self) -> Result<f32, MeasurementError> {
        let mut state = self.state.lock();
        state.taken += 1;
        state.next
    }

    fn set_verbose(&mut self, verbose: bool) {
        self.state.lock().verbose = verbose;
    }
}
