//! Motion engine: owns the drives, the tilt servo and the job slot.

use super::axis::{AxisChannel, AxisState};
use super::homing::{HomingReport, PanHoming};
use super::jobs::{EnableJob, Job, JobContext, JobOutcome, MoveJob};
use super::tilt::{TiltControl, TiltState};
use super::{MotionError, MotionEvent, MotionPhase, MotionSettings, Position, Step};
use crate::safety::InterlockTarget;
use maquette_common::hal::driver::{AxisDriver, DigitalInput, TiltActuator};
use maquette_common::hal::types::{AlertFlags, Axis};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info, warn};

const PAN: usize = 3;

/// Hardware the engine takes ownership of.
pub struct MotionParts {
    /// X, Y, Z and pan drives, in `Axis::DRIVEN` order.
    pub axes: [Box<dyn AxisDriver>; 4],
    pub pan_home: Box<dyn DigitalInput>,
    /// X, Y and Z end-of-travel switches, high when tripped.
    pub limits: [Box<dyn DigitalInput>; 3],
    pub tilt: Box<dyn TiltActuator>,
}

/// Multi-axis move request. Negative linear targets leave the axis
/// alone, as do `None` or negative pan/tilt angles.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveTarget {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Degrees.
    pub pan: Option<f32>,
    /// Degrees.
    pub tilt: Option<f32>,
}

/// Which axes a move request actually commanded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MoveReport {
    pub commanded: Vec<Axis>,
    /// Disabled or refused axes. Their positions do not change.
    pub rejected: Vec<Axis>,
}

pub struct MotionEngine {
    axes: [AxisChannel; 4],
    pan_home: Box<dyn DigitalInput>,
    limits: [Box<dyn DigitalInput>; 3],
    tilt: TiltControl,
    settings: MotionSettings,
    phase: MotionPhase,
    job: Option<Job>,
    events: VecDeque<MotionEvent>,
    homed: bool,
    interlocked: bool,
    /// Axis whose limit tripped, latched until `recover()`.
    limit_trip: Option<Axis>,
    initialized: bool,
    last_pan_homing: Option<HomingReport>,
}

impl MotionEngine {
    pub fn new(parts: MotionParts, settings: MotionSettings) -> Self {
        let [x, y, z, pan] = parts.axes;
        Self {
            axes: [
                AxisChannel::new(Axis::X, x),
                AxisChannel::new(Axis::Y, y),
                AxisChannel::new(Axis::Z, z),
                AxisChannel::new(Axis::Pan, pan),
            ],
            pan_home: parts.pan_home,
            limits: parts.limits,
            tilt: TiltControl::new(parts.tilt, settings.tilt_home),
            settings,
            phase: MotionPhase::Idle,
            job: None,
            events: VecDeque::new(),
            homed: false,
            interlocked: false,
            limit_trip: None,
            initialized: false,
            last_pan_homing: None,
        }
    }

    /// Push limits to every drive and send the tilt servo home.
    pub fn init(&mut self) {
        for channel in &mut self.axes {
            channel.apply_limits();
        }
        if let Err(e) = self.tilt.go_home() {
            warn!(error = %e, "tilt servo did not acknowledge home angle");
        }
        self.initialized = true;
        info!(
            tilt_home = self.tilt.state().home,
            pan_counts_per_degree = self.settings.pan_counts_per_degree,
            "motion engine initialized"
        );
    }

    // ─── Enable / disable ───────────────────────────────────────────

    /// Start energizing `axes`. Tilt is enabled at once; driven axes
    /// report through `EnableComplete` / `EnableFailed`.
    pub fn enable_axes(&mut self, axes: &[Axis], now: Instant) -> Result<(), MotionError> {
        if self.interlocked {
            return Err(MotionError::Interlocked);
        }
        if let Some(axis) = self.limit_trip {
            return Err(MotionError::LimitTripped(axis));
        }
        if self.job.is_some() {
            return Err(MotionError::Busy);
        }
        if axes.contains(&Axis::Tilt) {
            self.tilt.set_enabled(true);
        }
        if !axes.iter().any(|a| a.driven_index().is_some()) {
            self.events.push_back(MotionEvent::EnableComplete);
            return Ok(());
        }

        let mut ctx = JobContext {
            axes: &mut self.axes,
            pan_home: &*self.pan_home,
            settings: &self.settings,
        };
        let job = EnableJob::start(&mut ctx, axes, now);
        self.job = Some(Job::Enable(job));
        info!(?axes, "enabling axes");
        Ok(())
    }

    /// De-energize one axis immediately. No feedback is awaited.
    pub fn disable_axis(&mut self, axis: Axis) {
        match axis.driven_index() {
            Some(index) => self.axes[index].disable(),
            None => self.tilt.set_enabled(false),
        }
        info!(%axis, "axis disabled");
    }

    // ─── Homing ─────────────────────────────────────────────────────

    /// Home a single axis.
    ///
    /// Linear axes have no home sensor: an enabled axis is zeroed in
    /// software. Pan runs the flag search; tilt goes to its home angle.
    pub fn home_axis(&mut self, axis: Axis, now: Instant) -> Result<(), MotionError> {
        self.check_ready()?;
        match axis.driven_index() {
            None => {
                if !self.tilt.is_enabled() {
                    return Err(MotionError::AxisDisabled(Axis::Tilt));
                }
                self.tilt.go_home()?;
                Ok(())
            }
            Some(PAN) => {
                if !self.axes[PAN].state.enabled {
                    return Err(MotionError::AxisDisabled(Axis::Pan));
                }
                self.start_pan_homing(false, now);
                Ok(())
            }
            Some(index) => {
                let channel = &mut self.axes[index];
                if !channel.state.enabled {
                    return Err(MotionError::AxisDisabled(axis));
                }
                channel.zero();
                info!(%axis, "axis zeroed");
                Ok(())
            }
        }
    }

    /// Zero the linear axes, send tilt home and start the pan flag
    /// search. `is_homed` turns true when the search succeeds.
    pub fn home_all(&mut self, now: Instant) -> Result<(), MotionError> {
        self.check_ready()?;
        if let Some(channel) = self.axes.iter().find(|c| !c.state.enabled) {
            return Err(MotionError::AxisDisabled(channel.axis));
        }
        for channel in self.axes.iter_mut().filter(|c| c.axis.is_linear()) {
            channel.zero();
        }
        if self.tilt.is_enabled() {
            self.tilt.go_home()?;
        } else {
            warn!("tilt disabled, skipped during homing");
        }
        self.homed = false;
        self.start_pan_homing(true, now);
        Ok(())
    }

    fn start_pan_homing(&mut self, all_axes: bool, now: Instant) {
        let job = PanHoming::start(&mut self.axes[PAN], &*self.pan_home, &self.settings, now);
        self.job = Some(Job::Homing { job, all_axes });
        self.phase = MotionPhase::Homing;
    }

    // ─── Moves ──────────────────────────────────────────────────────

    /// Start independent absolute moves.
    ///
    /// Disabled axes are rejected individually; the request as a whole
    /// is still accepted and the final event reports the rejection.
    /// Tilt is commanded synchronously.
    pub fn move_to(&mut self, target: MoveTarget, now: Instant) -> Result<MoveReport, MotionError> {
        self.check_ready()?;
        let mut report = MoveReport::default();
        let mut legs = Vec::new();

        let linear = [(Axis::X, target.x), (Axis::Y, target.y), (Axis::Z, target.z)];
        let pan = target
            .pan
            .filter(|deg| *deg >= 0.0)
            .map(|deg| (Axis::Pan, self.settings.pan_counts(deg)));
        for (axis, counts) in linear.into_iter().filter(|(_, v)| *v >= 0).chain(pan) {
            let index = axis.driven_index().unwrap_or(PAN);
            if self.axes[index].state.enabled {
                legs.push((index, counts));
                report.commanded.push(axis);
            } else {
                warn!(%axis, "move rejected, axis disabled");
                report.rejected.push(axis);
            }
        }

        if let Some(angle) = target.tilt.filter(|a| *a >= 0.0) {
            match self.set_tilt_angle(angle) {
                Ok(_) => report.commanded.push(Axis::Tilt),
                Err(e) => {
                    warn!(error = %e, "tilt part of move failed");
                    report.rejected.push(Axis::Tilt);
                }
            }
        }

        self.start_move(&legs, report.rejected.clone(), now);
        debug!(?report, "move started");
        Ok(report)
    }

    /// Pan-only absolute move, degrees.
    pub fn move_pan(&mut self, degrees: f32, now: Instant) -> Result<(), MotionError> {
        self.check_ready()?;
        if !self.axes[PAN].state.enabled {
            return Err(MotionError::AxisDisabled(Axis::Pan));
        }
        let counts = self.settings.pan_counts(degrees);
        self.start_move(&[(PAN, counts)], Vec::new(), now);
        Ok(())
    }

    fn start_move(&mut self, legs: &[(usize, i32)], rejected: Vec<Axis>, now: Instant) {
        let mut ctx = JobContext {
            axes: &mut self.axes,
            pan_home: &*self.pan_home,
            settings: &self.settings,
        };
        let job = MoveJob::start(&mut ctx, legs, rejected, now);
        self.job = Some(Job::Move(job));
        self.phase = MotionPhase::Moving;
    }

    /// Halt every drive abruptly and cancel the running job.
    pub fn stop(&mut self) {
        for channel in &mut self.axes {
            channel.driver.stop_abrupt();
            channel.state.enabled &= channel.feedback().energized;
        }
        if let Some(job) = self.job.take() {
            if let Job::Homing { job: homing, .. } = &job {
                homing.abort(&mut self.axes[PAN]);
            }
            let event = self.complete(job.cancelled(MotionError::Stopped));
            self.events.push_back(event);
        }
        if matches!(self.phase, MotionPhase::Moving | MotionPhase::Homing) {
            self.phase = MotionPhase::Idle;
        }
        info!("motion stopped");
    }

    /// Clear drive alerts and a latched limit trip. Leaves `Error` when
    /// no fault remains and every limit switch reads open.
    pub fn recover(&mut self) -> bool {
        for channel in &mut self.axes {
            channel.driver.clear_alerts();
            channel.state.fault_present = channel.feedback().faulted();
        }
        if let Some(axis) = self.limit_trip {
            match self.closed_limit() {
                Some(closed) => warn!(%closed, "limit switch still closed, trip kept"),
                None => {
                    self.limit_trip = None;
                    info!(%axis, "limit trip cleared");
                }
            }
        }
        let clean = !self.axes.iter().any(|c| c.state.fault_present) && self.limit_trip.is_none();
        if clean && self.phase == MotionPhase::Error {
            self.phase = MotionPhase::Idle;
            info!("motion engine recovered");
        } else if !clean {
            warn!("faults remain after recovery");
        }
        clean
    }

    // ─── Tilt ───────────────────────────────────────────────────────

    /// Command tilt, clamped into its limits. Returns the applied angle.
    pub fn set_tilt_angle(&mut self, degrees: f32) -> Result<f32, MotionError> {
        if self.interlocked {
            return Err(MotionError::Interlocked);
        }
        if !self.tilt.is_enabled() {
            return Err(MotionError::AxisDisabled(Axis::Tilt));
        }
        Ok(self.tilt.set_angle(degrees)?)
    }

    pub fn set_tilt_limits(&mut self, min: f32, max: f32) -> Result<(), MotionError> {
        self.tilt.set_limits(min, max)
    }

    // ─── Limits ─────────────────────────────────────────────────────

    /// Velocity limits in counts/s. Pan follows `vx`. While pan homing
    /// runs, the pan value is only remembered and applied afterwards.
    pub fn set_velocity(&mut self, vx: f64, vy: f64, vz: f64) {
        let pan_homing = matches!(self.job, Some(Job::Homing { .. }));
        for (channel, velocity) in self.axes.iter_mut().zip([vx, vy, vz, vx]) {
            channel.state.velocity_limit = velocity;
            let deferred = pan_homing && channel.axis == Axis::Pan;
            if self.initialized && !deferred {
                channel.driver.set_velocity_limit(velocity);
            }
        }
        info!(vx, vy, vz, "velocity limits set");
    }

    /// Acceleration limit in counts/s², applied to every drive.
    pub fn set_acceleration(&mut self, acceleration: f64) {
        for channel in &mut self.axes {
            channel.state.acceleration_limit = acceleration;
            if self.initialized {
                channel.driver.set_acceleration_limit(acceleration);
            }
        }
        info!(acceleration, "acceleration limit set");
    }

    // ─── Polling ────────────────────────────────────────────────────

    /// Advance the running job. Returns at most one completion event.
    pub fn poll(&mut self, now: Instant) -> Option<MotionEvent> {
        if let Some(event) = self.check_limits() {
            return Some(event);
        }
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }
        let Some(mut job) = self.job.take() else {
            for channel in &mut self.axes {
                channel.state.fault_present = channel.feedback().faulted();
            }
            return None;
        };

        let mut ctx = JobContext {
            axes: &mut self.axes,
            pan_home: &*self.pan_home,
            settings: &self.settings,
        };
        match job.poll(&mut ctx, now) {
            Step::Continue => {
                self.job = Some(job);
                None
            }
            Step::Done(outcome) => Some(self.complete(outcome)),
        }
    }

    /// First axis with a closed limit switch or a drive-side travel
    /// limit alert.
    fn closed_limit(&self) -> Option<Axis> {
        let switch = self
            .limits
            .iter()
            .zip(Axis::LINEAR)
            .find(|(input, _)| input.is_high())
            .map(|(_, axis)| axis);
        switch.or_else(|| {
            self.axes
                .iter()
                .find(|c| c.feedback().alerts.contains(AlertFlags::TRAVEL_LIMIT))
                .map(|c| c.axis)
        })
    }

    /// Trip on a newly closed limit: de-energize everything, abort the
    /// job and latch `Error`.
    fn check_limits(&mut self) -> Option<MotionEvent> {
        if self.limit_trip.is_some() {
            return None;
        }
        let axis = self.closed_limit()?;
        for channel in &mut self.axes {
            channel.driver.stop_abrupt();
            channel.disable();
        }
        self.limit_trip = Some(axis);
        if let Some(job) = self.job.take() {
            if let Job::Homing { job: homing, .. } = &job {
                homing.abort(&mut self.axes[PAN]);
            }
            let event = self.complete(job.cancelled(MotionError::LimitTripped(axis)));
            self.events.push_back(event);
        }
        self.phase = MotionPhase::Error;
        warn!(%axis, "limit switch tripped, all axes de-energized");
        Some(MotionEvent::LimitTripped(axis))
    }

    fn complete(&mut self, outcome: JobOutcome) -> MotionEvent {
        let fault_phase = |e: &MotionError| {
            if e.is_fault() {
                MotionPhase::Error
            } else {
                MotionPhase::Idle
            }
        };
        let event = match outcome {
            JobOutcome::Enable(Ok(())) => MotionEvent::EnableComplete,
            JobOutcome::Enable(Err(e)) => MotionEvent::EnableFailed(e),
            JobOutcome::Move(Ok(())) => {
                self.phase = MotionPhase::Idle;
                MotionEvent::MoveComplete
            }
            JobOutcome::Move(Err(e)) => {
                self.phase = fault_phase(&e);
                MotionEvent::MoveFailed(e)
            }
            JobOutcome::Homing {
                result: Ok(report),
                all_axes,
            } => {
                self.last_pan_homing = Some(report);
                self.homed |= all_axes;
                self.phase = MotionPhase::Idle;
                MotionEvent::HomingComplete {
                    segments: report.segments,
                }
            }
            JobOutcome::Homing { result: Err(e), .. } => {
                self.phase = fault_phase(&e);
                MotionEvent::HomingFailed(e)
            }
        };
        if event.is_failure() {
            warn!(?event, phase = ?self.phase, "motion job failed");
        } else {
            info!(?event, "motion job complete");
        }
        event
    }

    fn check_ready(&self) -> Result<(), MotionError> {
        if self.interlocked {
            Err(MotionError::Interlocked)
        } else if let Some(axis) = self.limit_trip {
            Err(MotionError::LimitTripped(axis))
        } else if self.job.is_some() {
            Err(MotionError::Busy)
        } else if self.phase == MotionPhase::Error {
            Err(MotionError::InErrorState)
        } else {
            Ok(())
        }
    }

    // ─── Queries ────────────────────────────────────────────────────

    pub fn phase(&self) -> MotionPhase {
        self.phase
    }

    pub fn is_homed(&self) -> bool {
        self.homed
    }

    /// A job is in flight.
    pub fn is_busy(&self) -> bool {
        self.job.is_some()
    }

    pub fn is_interlocked(&self) -> bool {
        self.interlocked
    }

    /// Axis of a latched limit trip.
    pub fn limit_trip(&self) -> Option<Axis> {
        self.limit_trip
    }

    /// Motion in progress or any drive still issuing steps.
    pub fn is_moving(&self) -> bool {
        matches!(self.phase, MotionPhase::Moving | MotionPhase::Homing)
            || self.axes.iter().any(|c| !c.feedback().steps_complete)
    }

    pub fn is_enabled(&self, axis: Axis) -> bool {
        match axis.driven_index() {
            Some(index) => self.axes[index].state.enabled,
            None => self.tilt.is_enabled(),
        }
    }

    pub fn position(&self) -> Position {
        Position {
            x: self.axes[0].state.position,
            y: self.axes[1].state.position,
            z: self.axes[2].state.position,
            pan: self.settings.pan_degrees(self.axes[PAN].state.position),
            tilt: self.tilt.angle(),
        }
    }

    /// State of a driven axis. `None` for tilt.
    pub fn axis_state(&self, axis: Axis) -> Option<AxisState> {
        axis.driven_index().map(|i| self.axes[i].state)
    }

    pub fn tilt_state(&self) -> TiltState {
        self.tilt.state()
    }

    pub fn settings(&self) -> &MotionSettings {
        &self.settings
    }

    /// Report of the last successful pan homing run.
    pub fn last_pan_homing(&self) -> Option<HomingReport> {
        self.last_pan_homing
    }
}

impl InterlockTarget for MotionEngine {
    fn interlock_tripped(&mut self) {
        for channel in &mut self.axes {
            channel.disable();
        }
        self.interlocked = true;
        if let Some(job) = self.job.take() {
            if let Job::Homing { job: homing, .. } = &job {
                homing.abort(&mut self.axes[PAN]);
            }
            let event = self.complete(job.cancelled(MotionError::Interlocked));
            self.phase = MotionPhase::Error;
            self.events.push_back(event);
        }
        warn!(phase = ?self.phase, "interlock tripped, all axes de-energized");
    }

    fn interlock_released(&mut self) {
        self.interlocked = false;
        info!("interlock released, axes remain disabled until enabled");
    }
}

impl std::fmt::Debug for MotionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionEngine")
            .field("axes", &self.axes)
            .field("tilt", &self.tilt)
            .field("phase", &self.phase)
            .field("job", &self.job)
            .field("homed", &self.homed)
            .field("interlocked", &self.interlocked)
            .field("limit_trip", &self.limit_trip)
            .finish_non_exhaustive()
    }
}
