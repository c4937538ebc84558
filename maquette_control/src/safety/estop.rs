//! Emergency-stop interlock.
//!
//! ```text
//!            hardware trip / activate()
//!  Inactive ───────────────────────────────► Active
//!     ▲                                        │
//!     └──────── reset() with input clear ──────┘
//! ```
//!
//! Tripping de-energizes every actuator through [`InterlockTarget`].
//! Reset only lifts the block on motion; nothing is re-energized until
//! an explicit enable command.

use maquette_common::hal::driver::DigitalInput;
use thiserror::Error;
use tracing::{info, warn};

/// Whatever the interlock has to stop.
pub trait InterlockTarget {
    /// De-energize all actuators, abort running work and block motion.
    fn interlock_tripped(&mut self);

    /// Lift the motion block. Must not re-energize anything.
    fn interlock_released(&mut self);
}

/// Reset refusal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InterlockError {
    #[error("emergency-stop input is still tripped")]
    StillTripped,
}

/// Latching e-stop state machine over one input line.
pub struct EmergencyStop {
    input: Box<dyn DigitalInput>,
    /// Healthy line reads high; a low level means tripped.
    active_low: bool,
    active: bool,
    activations: u64,
}

impl EmergencyStop {
    pub fn new(input: Box<dyn DigitalInput>, active_low: bool) -> Self {
        Self {
            input,
            active_low,
            active: false,
            activations: 0,
        }
    }

    /// Read the input once; a tripped line at startup activates at once.
    pub fn init(&mut self, target: &mut dyn InterlockTarget) {
        if self.hardware_tripped() {
            warn!("emergency stop active at startup");
            self.latch(target);
        } else {
            info!(active_low = self.active_low, "emergency stop initialized");
        }
    }

    /// Poll the input. Returns `true` only on a new trip.
    pub fn poll(&mut self, target: &mut dyn InterlockTarget) -> bool {
        if self.hardware_tripped() && !self.active {
            warn!("emergency stop tripped by hardware");
            self.latch(target);
            return true;
        }
        false
    }

    /// Force the interlock active regardless of the input.
    pub fn activate(&mut self, target: &mut dyn InterlockTarget) {
        warn!("emergency stop activated by command");
        self.latch(target);
    }

    /// Clear the interlock. Refused while the input is still tripped.
    pub fn reset(&mut self, target: &mut dyn InterlockTarget) -> Result<(), InterlockError> {
        if self.hardware_tripped() {
            warn!("emergency stop reset refused, input still tripped");
            return Err(InterlockError::StillTripped);
        }
        if self.active {
            info!("emergency stop reset");
        }
        self.active = false;
        target.interlock_released();
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current electrical condition of the input, polarity applied.
    pub fn hardware_tripped(&self) -> bool {
        self.input.is_high() != self.active_low
    }

    /// Number of times the interlock has latched.
    pub fn activations(&self) -> u64 {
        self.activations
    }

    fn latch(&mut self, target: &mut dyn InterlockTarget) {
        self.active = true;
        self.activations += 1;
        target.interlock_tripped();
    }
}

impl std::fmt::Debug for EmergencyStop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmergencyStop")
            .field("active_low", &self.active_low)
            .field("active", &self.active)
            .field("activations", &self.activations)
            .finish_non_exhaustive()
    }
}
