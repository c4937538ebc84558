//! Per-axis state for the four step/direction drives.

use maquette_common::consts::{DEFAULT_ACCELERATION, DEFAULT_VELOCITY};
use maquette_common::hal::driver::AxisDriver;
use maquette_common::hal::types::{Axis, AxisFeedback};
use tracing::debug;

/// Book-keeping for one linear or pan axis.
///
/// `position` changes only after the drive reports the move settled
/// with no fault latched, or when the axis is zeroed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisState {
    pub enabled: bool,
    /// Counts.
    pub position: i32,
    /// Remembered for future enables, counts/s.
    pub velocity_limit: f64,
    /// Counts/s².
    pub acceleration_limit: f64,
    pub fault_present: bool,
}

impl Default for AxisState {
    fn default() -> Self {
        Self {
            enabled: false,
            position: 0,
            velocity_limit: DEFAULT_VELOCITY,
            acceleration_limit: DEFAULT_ACCELERATION,
            fault_present: false,
        }
    }
}

/// A drive together with the engine's view of it.
pub struct AxisChannel {
    pub axis: Axis,
    pub driver: Box<dyn AxisDriver>,
    pub state: AxisState,
}

impl AxisChannel {
    pub fn new(axis: Axis, driver: Box<dyn AxisDriver>) -> Self {
        Self {
            axis,
            driver,
            state: AxisState::default(),
        }
    }

    #[inline]
    pub fn feedback(&self) -> AxisFeedback {
        self.driver.feedback()
    }

    /// Push the remembered limits to the drive.
    pub fn apply_limits(&mut self) {
        self.driver.set_velocity_limit(self.state.velocity_limit);
        self.driver.set_acceleration_limit(self.state.acceleration_limit);
    }

    /// De-energize and forget enablement.
    pub fn disable(&mut self) {
        self.driver.disable();
        self.state.enabled = false;
        debug!(axis = %self.axis, "axis disabled");
    }

    /// Software zero: drive reference and engine position become 0.
    pub fn zero(&mut self) {
        self.driver.set_position_reference(0);
        self.state.position = 0;
    }
}

impl std::fmt::Debug for AxisChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxisChannel")
            .field("axis", &self.axis)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
