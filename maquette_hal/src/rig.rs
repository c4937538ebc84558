//! Simulated rig assembly.
//!
//! `SimulatedRig` builds one simulated instance of every part the control
//! core needs and hands out driver handles for it. The rig itself keeps
//! the observing side of each handle and advances physics time.

use crate::devices::{MuxRangefinder, MuxTiltServo, share_mux};
use crate::sim::{
    SimulatedAxis, SimulatedHomeFlag, SimulatedInput, SimulatedLimitSwitch, SimulatedMux,
};
use maquette_common::consts::{DEFAULT_ACCELERATION, DEFAULT_VELOCITY};
use maquette_common::hal::driver::{AxisDriver, DigitalInput, Rangefinder, TiltActuator};
use maquette_common::hal::types::Axis;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Simulation parameters.
///
/// # TOML Example
///
/// ```toml
/// [simulation]
/// ready_delay_ms = 50
/// pan_counts_per_rev = 36000
/// pan_flag_start = 9000
/// pan_flag_width = 400
/// travel_limit_counts = 200000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Time a drive needs to assert ready after energizing.
    pub ready_delay_ms: u64,
    /// Pan counts per mechanical revolution.
    pub pan_counts_per_rev: i64,
    /// Start of the home flag window in mechanical counts.
    pub pan_flag_start: i64,
    /// Width of the home flag window in counts.
    pub pan_flag_width: i64,
    /// Mechanical pan position at power-up.
    pub pan_start: f64,
    /// Initial rangefinder reading in millimetres.
    pub distance_mm: f32,
    /// E-stop input is active-low (healthy line reads high).
    pub estop_active_low: bool,
    /// Mechanical position of the X/Y/Z end-of-travel switches. Zero
    /// leaves the linear axes without a limit.
    pub travel_limit_counts: i64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ready_delay_ms: 50,
            pan_counts_per_rev: 36_000,
            pan_flag_start: 9_000,
            pan_flag_width: 400,
            pan_start: 0.0,
            distance_mm: 1000.0,
            estop_active_low: true,
            travel_limit_counts: 200_000,
        }
    }
}

/// Driver handles consumed by the control core.
pub struct RigHandles {
    /// X, Y, Z and pan drives, in `Axis::DRIVEN` order.
    pub axes: [Box<dyn AxisDriver>; 4],
    /// Pan home flag.
    pub pan_home: Box<dyn DigitalInput>,
    /// Emergency-stop input line.
    pub estop: Box<dyn DigitalInput>,
    /// X, Y and Z end-of-travel switches, high when tripped.
    pub limits: [Box<dyn DigitalInput>; 3],
    /// Tilt servo.
    pub tilt: Box<dyn TiltActuator>,
    /// Distance sensor.
    pub rangefinder: Box<dyn Rangefinder>,
}

/// All simulated parts of one rig.
pub struct SimulatedRig {
    config: SimulationConfig,
    axes: [SimulatedAxis; 4],
    estop: SimulatedInput,
    mux: SimulatedMux,
}

impl SimulatedRig {
    /// Build a rig with healthy drives, a clear e-stop and the stage at
    /// `config.pan_start`.
    pub fn new(config: SimulationConfig) -> Self {
        let delay = Duration::from_millis(config.ready_delay_ms);
        let make = |name| SimulatedAxis::new(name, DEFAULT_VELOCITY, DEFAULT_ACCELERATION, delay);
        let axes = [make("x"), make("y"), make("z"), make("pan")];
        axes[3].place_at(config.pan_start);
        if config.travel_limit_counts > 0 {
            for axis in &axes[..3] {
                axis.set_travel_limit(Some(config.travel_limit_counts as f64));
            }
        }

        let estop = SimulatedInput::new(config.estop_active_low);
        let mux = SimulatedMux::new();
        mux.set_distance_reply(&format!("DIST:{:.3}", config.distance_mm));

        info!(
            ready_delay_ms = config.ready_delay_ms,
            pan_counts_per_rev = config.pan_counts_per_rev,
            travel_limit_counts = config.travel_limit_counts,
            "simulated rig built"
        );

        Self {
            config,
            axes,
            estop,
            mux,
        }
    }

    /// Create driver handles for the control core.
    pub fn handles(&self) -> RigHandles {
        let shared = share_mux(self.mux.clone());
        let pan = self.axes[3].clone();
        RigHandles {
            axes: [
                Box::new(self.axes[0].clone()),
                Box::new(self.axes[1].clone()),
                Box::new(self.axes[2].clone()),
                Box::new(pan.clone()),
            ],
            pan_home: Box::new(SimulatedHomeFlag::new(
                pan,
                self.config.pan_counts_per_rev,
                self.config.pan_flag_start,
                self.config.pan_flag_width,
            )),
            estop: Box::new(self.estop.clone()),
            limits: [
                Box::new(SimulatedLimitSwitch::new(self.axes[0].clone())),
                Box::new(SimulatedLimitSwitch::new(self.axes[1].clone())),
                Box::new(SimulatedLimitSwitch::new(self.axes[2].clone())),
            ],
            tilt: Box::new(MuxTiltServo::new(shared.clone())),
            rangefinder: Box::new(MuxRangefinder::new(shared)),
        }
    }

    /// Advance every drive by `dt`.
    pub fn advance(&self, dt: Duration) {
        for axis in &self.axes {
            axis.advance(dt);
        }
    }

    /// Observing handle for a driven axis. `None` for tilt.
    pub fn axis(&self, axis: Axis) -> Option<&SimulatedAxis> {
        axis.driven_index().map(|i| &self.axes[i])
    }

    /// Trip or clear the e-stop condition.
    pub fn set_estop_tripped(&self, tripped: bool) {
        self.estop.set_high(tripped != self.config.estop_active_low);
    }

    /// Serial multiplexer shared by tilt servo and rangefinder.
    pub fn mux(&self) -> &SimulatedMux {
        &self.mux
    }
}
