//! Simulated binary inputs.
//!
//! - `SimulatedInput` - A line whose level is set by the test or operator
//! - `SimulatedHomeFlag` - The pan home flag, derived from the pan drive's
//!   mechanical angle
//! - `SimulatedLimitSwitch` - End-of-travel switch of a linear axis, closed
//!   while the carriage sits at its travel limit

use super::axis::SimulatedAxis;
use maquette_common::hal::driver::DigitalInput;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Digital input with an externally controlled level.
#[derive(Debug, Clone)]
pub struct SimulatedInput {
    level: Arc<AtomicBool>,
}

impl SimulatedInput {
    /// Create an input at the given electrical level.
    pub fn new(high: bool) -> Self {
        Self {
            level: Arc::new(AtomicBool::new(high)),
        }
    }

    /// Drive the line high or low.
    pub fn set_high(&self, high: bool) {
        self.level.store(high, Ordering::SeqCst);
    }
}

impl DigitalInput for SimulatedInput {
    fn is_high(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }
}

/// Optical flag mounted on the pan stage.
///
/// The flag is high while the mechanical position, taken modulo one
/// revolution, lies inside `[flag_start, flag_start + flag_width)`.
#[derive(Debug, Clone)]
pub struct SimulatedHomeFlag {
    axis: SimulatedAxis,
    counts_per_rev: i64,
    flag_start: i64,
    flag_width: i64,
}

impl SimulatedHomeFlag {
    /// Attach a flag window to the pan drive.
    pub fn new(axis: SimulatedAxis, counts_per_rev: i64, flag_start: i64, flag_width: i64) -> Self {
        Self {
            axis,
            counts_per_rev: counts_per_rev.max(1),
            flag_start,
            flag_width,
        }
    }
}

impl DigitalInput for SimulatedHomeFlag {
    fn is_high(&self) -> bool {
        let position = self.axis.mechanical_position().round() as i64;
        let angle = position.rem_euclid(self.counts_per_rev);
        let offset = (angle - self.flag_start).rem_euclid(self.counts_per_rev);
        offset < self.flag_width
    }
}

/// Hardware limit switch at the positive end of a linear axis.
///
/// Reads high (tripped) while the carriage is at or past the travel
/// limit set with [`SimulatedAxis::set_travel_limit`].
#[derive(Debug, Clone)]
pub struct SimulatedLimitSwitch {
    axis: SimulatedAxis,
}

impl SimulatedLimitSwitch {
    /// Mount a switch on `axis`.
    pub fn new(axis: SimulatedAxis) -> Self {
        Self { axis }
    }
}

impl DigitalInput for SimulatedLimitSwitch {
    fn is_high(&self) -> bool {
        self.axis.at_travel_limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maquette_common::hal::driver::AxisDriver;
    use std::time::Duration;

    #[test]
    fn input_level_is_shared_between_clones() {
        let input = SimulatedInput::new(true);
        let reader = input.clone();
        assert!(reader.is_high());
        input.set_high(false);
        assert!(!reader.is_high());
    }

    #[test]
    fn home_flag_tracks_mechanical_angle() {
        let mut axis = SimulatedAxis::new("pan", 10_000.0, 100_000.0, Duration::ZERO);
        let flag = SimulatedHomeFlag::new(axis.clone(), 36_000, 9_000, 500);
        assert!(!flag.is_high());

        axis.place_at(9_100.0);
        assert!(flag.is_high());

        // Re-referencing moves the logical zero, not the flag.
        axis.set_position_reference(0);
        assert!(flag.is_high());

        axis.place_at(9_600.0);
        assert!(!flag.is_high());
    }

    #[test]
    fn limit_switch_closes_at_end_of_travel() {
        let axis = SimulatedAxis::new("x", 10_000.0, 100_000.0, Duration::ZERO);
        let switch = SimulatedLimitSwitch::new(axis.clone());
        assert!(!switch.is_high());

        axis.place_at(5_000.0);
        assert!(!switch.is_high());

        axis.set_travel_limit(Some(4_000.0));
        assert!(switch.is_high());
        axis.place_at(3_000.0);
        assert!(!switch.is_high());
    }

    #[test]
    fn home_flag_wraps_around_revolution() {
        let axis = SimulatedAxis::new("pan", 10_000.0, 100_000.0, Duration::ZERO);
        let flag = SimulatedHomeFlag::new(axis.clone(), 1_000, 950, 100);
        axis.place_at(20.0);
        assert!(flag.is_high());
        axis.place_at(-30.0);
        assert!(flag.is_high());
        axis.place_at(60.0);
        assert!(!flag.is_high());
    }
}
