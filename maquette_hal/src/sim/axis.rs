//! Step/direction axis simulator.
//!
//! `SimulatedAxis` emulates a closed-loop stepper drive as seen through
//! its enable output, step generator and high-level feedback (HLFB) line:
//! - Energizing raises HLFB after a configurable settle delay
//! - Moves follow a trapezoidal/triangular profile bounded by the
//!   velocity and acceleration limits
//! - HLFB drops while steps are being issued
//! - Faults can be injected and are cleared by cycling the enable output
//! - An optional end-of-travel position halts the drive and latches
//!   `TRAVEL_LIMIT`
//!
//! The handle is cheap to clone; all clones share one physics state so
//! the rig can advance time while the control core owns the driver.

use maquette_common::hal::driver::{AxisDriver, DriverError};
use maquette_common::hal::types::{AlertFlags, AxisFeedback};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Physics state of one simulated drive.
#[derive(Debug)]
struct AxisPhysics {
    /// Commanded position in counts (fractional while moving)
    position: f64,
    /// Offset between commanded and mechanical position
    reference_offset: f64,
    /// Current velocity in counts/s
    velocity: f64,
    /// Move target in counts
    target: i32,
    velocity_limit: f64,
    acceleration_limit: f64,
    /// Enable output state
    energized: bool,
    /// Time since the last energize
    energized_for: Duration,
    /// HLFB settle delay after energize
    ready_delay: Duration,
    /// Steps still being issued
    moving: bool,
    /// Internal drive fault, cleared by de-energizing
    drive_fault: bool,
    /// Latched alert register
    alerts: AlertFlags,
    /// Remaining enables that will come up faulted
    faulty_enables: u32,
    /// Fault survives enable cycling
    persistent_fault: bool,
    /// HLFB never asserts (dead drive)
    never_ready: bool,
    /// Mechanical end of travel in the positive direction
    travel_limit: Option<f64>,
}

impl AxisPhysics {
    fn new(velocity_limit: f64, acceleration_limit: f64, ready_delay: Duration) -> Self {
        Self {
            position: 0.0,
            reference_offset: 0.0,
            velocity: 0.0,
            target: 0,
            velocity_limit,
            acceleration_limit,
            energized: false,
            energized_for: Duration::ZERO,
            ready_delay,
            moving: false,
            drive_fault: false,
            alerts: AlertFlags::empty(),
            faulty_enables: 0,
            persistent_fault: false,
            never_ready: false,
            travel_limit: None,
        }
    }

    fn ready(&self) -> bool {
        self.energized
            && !self.drive_fault
            && !self.never_ready
            && !self.moving
            && self.energized_for >= self.ready_delay
    }

    fn latch_fault(&mut self) {
        self.drive_fault = true;
        self.alerts |= AlertFlags::MOTOR_FAULTED;
        self.halt();
    }

    fn halt(&mut self) {
        self.velocity = 0.0;
        self.moving = false;
        self.target = self.position.round() as i32;
        self.position = f64::from(self.target);
    }

    fn advance(&mut self, dt: Duration) {
        if self.energized {
            self.energized_for = self.energized_for.saturating_add(dt);
        }
        if !self.moving {
            return;
        }
        if !self.energized || self.drive_fault {
            self.halt();
            return;
        }

        let dt_s = dt.as_secs_f64();
        let error = f64::from(self.target) - self.position;
        if error.abs() < 0.5 {
            self.finish_move();
            return;
        }

        let max_vel = self.velocity_limit.max(1.0);
        let max_acc = self.acceleration_limit.max(1.0);

        // Triangular profile: decelerate once inside the stopping distance
        let stopping_distance = self.velocity * self.velocity / (2.0 * max_acc);
        let desired_velocity = if error.abs() <= stopping_distance {
            error.signum() * (2.0 * max_acc * error.abs()).sqrt().min(max_vel)
        } else {
            error.signum() * max_vel
        };

        let max_vel_change = max_acc * dt_s;
        self.velocity += (desired_velocity - self.velocity).clamp(-max_vel_change, max_vel_change);

        let step = self.velocity * dt_s;
        if step.signum() == error.signum() && step.abs() >= error.abs() {
            self.finish_move();
        } else {
            self.position += step;
            self.check_travel_limit();
        }
        trace!(position = self.position, velocity = self.velocity, "axis step");
    }

    fn at_travel_limit(&self) -> bool {
        self.travel_limit
            .is_some_and(|limit| self.position + self.reference_offset >= limit - 0.5)
    }

    /// Stop at the end of travel if the last step ran into it.
    fn check_travel_limit(&mut self) {
        let Some(limit) = self.travel_limit else {
            return;
        };
        if self.moving && self.velocity > 0.0 && self.at_travel_limit() {
            self.position = limit - self.reference_offset;
            self.halt();
            self.alerts |= AlertFlags::TRAVEL_LIMIT;
        }
    }

    fn finish_move(&mut self) {
        self.position = f64::from(self.target);
        self.velocity = 0.0;
        self.moving = false;
    }

    fn start_move(&mut self, target: i32) -> Result<(), DriverError> {
        if !self.energized {
            self.alerts |= AlertFlags::MOVE_WHILE_DISABLED;
            return Err(DriverError::NotEnabled);
        }
        if !self.alerts.is_empty() {
            self.alerts |= AlertFlags::MOVE_WHILE_ALERTED;
            return Err(DriverError::InAlert(self.alerts));
        }
        self.target = target;
        self.moving = true;
        Ok(())
    }
}

/// Shared handle to one simulated drive.
#[derive(Debug, Clone)]
pub struct SimulatedAxis {
    name: &'static str,
    state: Arc<Mutex<AxisPhysics>>,
}

impl SimulatedAxis {
    /// Create a de-energized drive at position zero.
    pub fn new(
        name: &'static str,
        velocity_limit: f64,
        acceleration_limit: f64,
        ready_delay: Duration,
    ) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(AxisPhysics::new(
                velocity_limit,
                acceleration_limit,
                ready_delay,
            ))),
        }
    }

    /// Drive name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Advance the simulation by `dt`.
    pub fn advance(&self, dt: Duration) {
        self.state.lock().advance(dt);
    }

    /// Mechanical position in counts, unaffected by reference resets.
    pub fn mechanical_position(&self) -> f64 {
        let state = self.state.lock();
        state.position + state.reference_offset
    }

    /// Turn the stage by hand to a mechanical position. The logical
    /// reference is kept, so the commanded position shifts with it.
    pub fn place_at(&self, mechanical: f64) {
        let mut state = self.state.lock();
        state.position = mechanical - state.reference_offset;
        state.halt();
    }

    /// Place the positive end of travel at a mechanical position.
    /// `None` removes it.
    pub fn set_travel_limit(&self, mechanical: Option<f64>) {
        self.state.lock().travel_limit = mechanical;
    }

    /// The carriage sits at or beyond its end of travel.
    pub fn at_travel_limit(&self) -> bool {
        self.state.lock().at_travel_limit()
    }

    /// Latch a drive fault now, stopping any motion.
    pub fn inject_fault(&self) {
        warn!(axis = self.name, "injected drive fault");
        self.state.lock().latch_fault();
    }

    /// The next `count` enables come up faulted.
    pub fn fail_next_enables(&self, count: u32) {
        self.state.lock().faulty_enables = count;
    }

    /// Make the fault survive enable cycling.
    pub fn set_persistent_fault(&self, persistent: bool) {
        let mut state = self.state.lock();
        state.persistent_fault = persistent;
        if persistent {
            state.latch_fault();
        }
    }

    /// Keep HLFB deasserted regardless of drive state.
    pub fn set_never_ready(&self, never_ready: bool) {
        self.state.lock().never_ready = never_ready;
    }
}

impl AxisDriver for SimulatedAxis {
    fn enable(&mut self) {
        let mut state = self.state.lock();
        if !state.energized {
            state.energized = true;
            state.energized_for = Duration::ZERO;
        }
        if state.faulty_enables > 0 {
            state.faulty_enables -= 1;
            state.latch_fault();
        }
        if state.persistent_fault {
            state.latch_fault();
        }
        debug!(axis = self.name, "energized");
    }

    fn disable(&mut self) {
        let mut state = self.state.lock();
        if state.moving {
            state.alerts |= AlertFlags::DISABLED_IN_MOTION;
        }
        state.energized = false;
        state.energized_for = Duration::ZERO;
        if !state.persistent_fault {
            state.drive_fault = false;
        }
        state.halt();
        debug!(axis = self.name, "de-energized");
    }

    fn feedback(&self) -> AxisFeedback {
        let state = self.state.lock();
        AxisFeedback {
            energized: state.energized,
            ready: state.ready(),
            steps_complete: !state.moving,
            alerts: state.alerts,
            position: state.position.round() as i32,
        }
    }

    fn set_velocity_limit(&mut self, counts_per_s: f64) {
        self.state.lock().velocity_limit = counts_per_s;
    }

    fn velocity_limit(&self) -> f64 {
        self.state.lock().velocity_limit
    }

    fn set_acceleration_limit(&mut self, counts_per_s2: f64) {
        self.state.lock().acceleration_limit = counts_per_s2;
    }

    fn move_absolute(&mut self, target: i32) -> Result<(), DriverError> {
        self.state.lock().start_move(target)
    }

    fn move_relative(&mut self, delta: i32) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        let target = state.target.saturating_add(delta);
        state.start_move(target)
    }

    fn stop_abrupt(&mut self) {
        self.state.lock().halt();
    }

    fn set_position_reference(&mut self, position: i32) {
        let mut state = self.state.lock();
        let mechanical = state.position + state.reference_offset;
        state.position = f64::from(position);
        state.target = position;
        state.reference_offset = mechanical - state.position;
    }

    fn clear_alerts(&mut self) {
        let mut state = self.state.lock();
        state.alerts = if state.drive_fault {
            AlertFlags::MOTOR_FAULTED
        } else {
            AlertFlags::empty()
        };
    }
}
