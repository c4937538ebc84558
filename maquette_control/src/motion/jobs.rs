//! Enable and move jobs, and the job slot the engine polls.
//!
//! Each job drives one or more legs, one leg per axis. A leg may embed a
//! [`FaultRecovery`]; at most one recovery runs per leg.

use super::axis::AxisChannel;
use super::homing::{HomingReport, PanHoming};
use super::recovery::FaultRecovery;
use super::{MotionError, MotionSettings, Step};
use maquette_common::hal::driver::DigitalInput;
use maquette_common::hal::types::Axis;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything a job may touch while polled.
pub struct JobContext<'a> {
    pub axes: &'a mut [AxisChannel; 4],
    pub pan_home: &'a dyn DigitalInput,
    pub settings: &'a MotionSettings,
}

impl JobContext<'_> {
    fn channel(&mut self, index: usize) -> &mut AxisChannel {
        &mut self.axes[index]
    }
}

/// Pick the most significant failure among legs: faults first.
fn combine(results: impl Iterator<Item = Result<(), MotionError>>) -> Result<(), MotionError> {
    let mut first: Option<MotionError> = None;
    for error in results.filter_map(Result::err) {
        let replace = match &first {
            Some(current) => !current.is_fault() && error.is_fault(),
            None => true,
        };
        if replace {
            first = Some(error);
        }
    }
    first.map_or(Ok(()), Err)
}

// ─── Enable ─────────────────────────────────────────────────────────

#[derive(Debug)]
enum EnablePhase {
    Waiting,
    Recovering(FaultRecovery),
    Done(Result<(), MotionError>),
}

#[derive(Debug)]
struct EnableLeg {
    index: usize,
    phase: EnablePhase,
    since: Instant,
}

/// Energize drives and wait for ready, recovering once per drive.
#[derive(Debug)]
pub struct EnableJob {
    legs: Vec<EnableLeg>,
}

impl EnableJob {
    /// Energize every listed driven axis. Tilt entries are ignored.
    pub fn start(ctx: &mut JobContext<'_>, axes: &[Axis], now: Instant) -> Self {
        let mut legs = Vec::new();
        for index in axes.iter().filter_map(|a| a.driven_index()) {
            if legs.iter().any(|l: &EnableLeg| l.index == index) {
                continue;
            }
            let channel = ctx.channel(index);
            channel.apply_limits();
            channel.driver.enable();
            debug!(axis = %channel.axis, "enable requested");
            legs.push(EnableLeg {
                index,
                phase: EnablePhase::Waiting,
                since: now,
            });
        }
        Self { legs }
    }

    pub fn poll(&mut self, ctx: &mut JobContext<'_>, now: Instant) -> Step<Result<(), MotionError>> {
        let settings = ctx.settings;
        for leg in &mut self.legs {
            let channel = &mut ctx.axes[leg.index];
            match &mut leg.phase {
                EnablePhase::Done(_) => {}
                EnablePhase::Waiting => {
                    let feedback = channel.feedback();
                    let timed_out = now.saturating_duration_since(leg.since) > settings.enable_timeout;
                    if feedback.ready && !feedback.faulted() {
                        if feedback.in_alert() {
                            channel.driver.clear_alerts();
                        }
                        channel.state.enabled = true;
                        channel.state.fault_present = false;
                        info!(axis = %channel.axis, "axis enabled");
                        leg.phase = EnablePhase::Done(Ok(()));
                    } else if feedback.faulted() || timed_out {
                        leg.phase = EnablePhase::Recovering(FaultRecovery::start(channel, now));
                    }
                }
                EnablePhase::Recovering(recovery) => {
                    if let Step::Done(result) = recovery.poll(channel, settings, now) {
                        channel.state.enabled = result.is_ok();
                        if let Err(e) = &result {
                            warn!(axis = %channel.axis, error = %e, "axis enable failed");
                        }
                        leg.phase = EnablePhase::Done(result);
                    }
                }
            }
        }

        if self.legs.iter().all(|l| matches!(l.phase, EnablePhase::Done(_))) {
            let results = self.legs.iter().map(|l| match &l.phase {
                EnablePhase::Done(r) => r.clone(),
                _ => Ok(()),
            });
            Step::Done(combine(results))
        } else {
            Step::Continue
        }
    }
}

// ─── Move ───────────────────────────────────────────────────────────

#[derive(Debug)]
enum LegPhase {
    /// Alerts were latched before the move; clear them first.
    PreRecovery(FaultRecovery),
    Running,
    Recovering(FaultRecovery),
    Done(Result<(), MotionError>),
}

#[derive(Debug)]
struct MoveLeg {
    index: usize,
    target: i32,
    phase: LegPhase,
    recovered: bool,
}

/// Absolute moves on independent axes, no coordination between them.
#[derive(Debug)]
pub struct MoveJob {
    legs: Vec<MoveLeg>,
    /// Axes refused before the job started.
    rejected: Vec<Axis>,
}

impl MoveJob {
    /// Command every `(index, target)` leg. `rejected` axes make the
    /// job report failure once the other legs finish.
    pub fn start(
        ctx: &mut JobContext<'_>,
        targets: &[(usize, i32)],
        rejected: Vec<Axis>,
        now: Instant,
    ) -> Self {
        let legs = targets
            .iter()
            .map(|&(index, target)| {
                let channel = ctx.channel(index);
                let phase = if channel.feedback().in_alert() {
                    LegPhase::PreRecovery(FaultRecovery::start(channel, now))
                } else {
                    command(channel, target)
                };
                MoveLeg {
                    index,
                    target,
                    recovered: matches!(phase, LegPhase::PreRecovery(_)),
                    phase,
                }
            })
            .collect();
        Self { legs, rejected }
    }

    pub fn poll(&mut self, ctx: &mut JobContext<'_>, now: Instant) -> Step<Result<(), MotionError>> {
        let settings = ctx.settings;
        for leg in &mut self.legs {
            let channel = &mut ctx.axes[leg.index];
            match &mut leg.phase {
                LegPhase::Done(_) => {}
                LegPhase::PreRecovery(recovery) => {
                    if let Step::Done(result) = recovery.poll(channel, settings, now) {
                        leg.phase = match result {
                            Ok(()) => command(channel, leg.target),
                            Err(e) => LegPhase::Done(Err(e)),
                        };
                    }
                }
                LegPhase::Running => {
                    let feedback = channel.feedback();
                    if !feedback.energized {
                        warn!(axis = %channel.axis, "axis de-energized during move");
                        leg.phase = LegPhase::Done(Err(MotionError::AxisDisabled(channel.axis)));
                    } else if feedback.in_alert() {
                        if leg.recovered {
                            channel.state.fault_present = true;
                            warn!(axis = %channel.axis, alerts = ?feedback.alerts, "move failed after recovery");
                            leg.phase = LegPhase::Done(Err(MotionError::Fault(channel.axis)));
                        } else {
                            leg.recovered = true;
                            leg.phase = LegPhase::Recovering(FaultRecovery::start(channel, now));
                        }
                    } else if feedback.settled() {
                        channel.state.position = leg.target;
                        debug!(axis = %channel.axis, position = leg.target, "move settled");
                        leg.phase = LegPhase::Done(Ok(()));
                    }
                }
                LegPhase::Recovering(recovery) => {
                    if let Step::Done(result) = recovery.poll(channel, settings, now) {
                        leg.phase = match result {
                            // Re-command the original target once.
                            Ok(()) => command(channel, leg.target),
                            Err(e) => LegPhase::Done(Err(e)),
                        };
                    }
                }
            }
        }

        if self.legs.iter().all(|l| matches!(l.phase, LegPhase::Done(_))) {
            let results = self.legs.iter().map(|l| match &l.phase {
                LegPhase::Done(r) => r.clone(),
                _ => Ok(()),
            });
            let result = combine(results).and_then(|()| match self.rejected.first() {
                Some(&axis) => Err(MotionError::AxisDisabled(axis)),
                None => Ok(()),
            });
            Step::Done(result)
        } else {
            Step::Continue
        }
    }
}

fn command(channel: &mut AxisChannel, target: i32) -> LegPhase {
    match channel.driver.move_absolute(target) {
        Ok(()) => {
            debug!(axis = %channel.axis, target, "move commanded");
            LegPhase::Running
        }
        Err(e) => {
            warn!(axis = %channel.axis, error = %e, "move refused by drive");
            LegPhase::Done(Err(MotionError::Fault(channel.axis)))
        }
    }
}

// ─── Slot ───────────────────────────────────────────────────────────

/// Outcome of a finished job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Enable(Result<(), MotionError>),
    Move(Result<(), MotionError>),
    Homing {
        result: Result<HomingReport, MotionError>,
        /// Part of a full `HOME:ALL`.
        all_axes: bool,
    },
}

/// The single in-flight job.
#[derive(Debug)]
pub enum Job {
    Enable(EnableJob),
    Move(MoveJob),
    Homing { job: PanHoming, all_axes: bool },
}

impl Job {
    pub fn poll(&mut self, ctx: &mut JobContext<'_>, now: Instant) -> Step<JobOutcome> {
        match self {
            Self::Enable(job) => match job.poll(ctx, now) {
                Step::Continue => Step::Continue,
                Step::Done(r) => Step::Done(JobOutcome::Enable(r)),
            },
            Self::Move(job) => match job.poll(ctx, now) {
                Step::Continue => Step::Continue,
                Step::Done(r) => Step::Done(JobOutcome::Move(r)),
            },
            Self::Homing { job, all_axes } => {
                let pan = Axis::Pan.driven_index().unwrap_or(3);
                match job.poll(&mut ctx.axes[pan], ctx.pan_home, ctx.settings, now) {
                    Step::Continue => Step::Continue,
                    Step::Done(result) => Step::Done(JobOutcome::Homing {
                        result,
                        all_axes: *all_axes,
                    }),
                }
            }
        }
    }

    /// Failure outcome reported when the job is cut short.
    pub fn cancelled(&self, reason: MotionError) -> JobOutcome {
        match self {
            Self::Enable(_) => JobOutcome::Enable(Err(reason)),
            Self::Move(_) => JobOutcome::Move(Err(reason)),
            Self::Homing { all_axes, .. } => JobOutcome::Homing {
                result: Err(reason),
                all_axes: *all_axes,
            },
        }
    }
}
