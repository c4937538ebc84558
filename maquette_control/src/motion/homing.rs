//! Pan flag homing.
//!
//! The pan stage carries an optical flag read through a binary input.
//! Homing rotates in the positive direction in relative chunks until the
//! flag edge is crossed, then makes that point the new zero.
//!
//! ## Sequence
//!
//! | Phase | Action | Leaves when |
//! |-------|--------|-------------|
//! | Cycling | drive disabled, homing velocity set | 100 ms elapsed, drive re-enabled |
//! | Settling | wait for ready, recover once on fault | ready (3 s limit) |
//! | Escaping | only if the flag was high at start: rotate | flag low |
//! | Acquiring | rotate | flag high: abrupt stop, disable |
//! | Rereferencing | drive disabled | 50 ms elapsed: reference 0, enable |
//! | Resettling | wait for ready, recover once on fault | ready (3 s limit) |
//!
//! Starting inside the flag window therefore crosses two direction
//! segments (escape, then re-acquire); starting outside crosses one.
//! The flag is checked on every poll, not only between chunks. The
//! original velocity limit is restored on every exit path.

use super::axis::AxisChannel;
use super::recovery::FaultRecovery;
use super::{MotionError, MotionSettings, Step};
use maquette_common::hal::driver::DigitalInput;
use maquette_common::hal::types::Axis;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Drive disengage time before the search.
const PAN_DISENGAGE: Duration = Duration::from_millis(100);

/// Time allowed for the drive to report ready around the search.
const PAN_SETTLE_TIMEOUT: Duration = Duration::from_secs(3);

/// Pause with the drive disabled before re-referencing.
const PAN_REREFERENCE_PAUSE: Duration = Duration::from_millis(50);

// ─── Phases ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingPhase {
    Cycling,
    Settling,
    Escaping,
    Acquiring,
    Rereferencing,
    Resettling,
}

/// Outcome of a successful homing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomingReport {
    /// Direction segments run: 2 when starting inside the flag, else 1.
    pub segments: u8,
    /// Relative chunks issued.
    pub chunks: u32,
}

// ─── Job ────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct PanHoming {
    phase: HomingPhase,
    since: Instant,
    started: Instant,
    initially_flagged: bool,
    segments: u8,
    chunks: u32,
    recovery: Option<FaultRecovery>,
    recovered: bool,
}

impl PanHoming {
    /// Latch the flag state, drop to homing velocity and disengage.
    pub fn start(
        channel: &mut AxisChannel,
        flag: &dyn DigitalInput,
        settings: &MotionSettings,
        now: Instant,
    ) -> Self {
        let initially_flagged = flag.is_high();
        info!(initially_flagged, velocity = settings.homing_velocity, "pan homing started");
        channel.driver.set_velocity_limit(settings.homing_velocity);
        channel.driver.disable();
        Self {
            phase: HomingPhase::Cycling,
            since: now,
            started: now,
            initially_flagged,
            segments: 0,
            chunks: 0,
            recovery: None,
            recovered: false,
        }
    }

    pub fn phase(&self) -> HomingPhase {
        self.phase
    }

    pub fn poll(
        &mut self,
        channel: &mut AxisChannel,
        flag: &dyn DigitalInput,
        settings: &MotionSettings,
        now: Instant,
    ) -> Step<Result<HomingReport, MotionError>> {
        if let Some(limit) = settings.homing_timeout {
            if now.saturating_duration_since(self.started) > limit {
                channel.driver.stop_abrupt();
                return self.fail(channel, MotionError::HomingTimeout);
            }
        }

        let elapsed = now.saturating_duration_since(self.since);
        match self.phase {
            HomingPhase::Cycling => {
                if elapsed >= PAN_DISENGAGE {
                    channel.driver.enable();
                    self.enter(HomingPhase::Settling, now);
                }
                Step::Continue
            }
            HomingPhase::Settling => match self.settle(channel, settings, now) {
                Step::Continue => Step::Continue,
                Step::Done(Err(e)) => self.fail(channel, e),
                Step::Done(Ok(())) => {
                    self.segments = 1;
                    let next = if self.initially_flagged {
                        HomingPhase::Escaping
                    } else {
                        HomingPhase::Acquiring
                    };
                    self.enter(next, now);
                    Step::Continue
                }
            },
            HomingPhase::Escaping => {
                if channel.feedback().in_alert() {
                    channel.driver.stop_abrupt();
                    return self.fail(channel, MotionError::Fault(Axis::Pan));
                }
                if !flag.is_high() {
                    // Keep rotating the same way; the pending chunk carries on.
                    self.segments = 2;
                    self.enter(HomingPhase::Acquiring, now);
                    return Step::Continue;
                }
                self.issue_chunk(channel, settings)
            }
            HomingPhase::Acquiring => {
                if channel.feedback().in_alert() {
                    channel.driver.stop_abrupt();
                    return self.fail(channel, MotionError::Fault(Axis::Pan));
                }
                if flag.is_high() {
                    channel.driver.stop_abrupt();
                    info!(
                        position = channel.feedback().position,
                        chunks = self.chunks,
                        "pan home flag acquired"
                    );
                    channel.driver.disable();
                    self.enter(HomingPhase::Rereferencing, now);
                    return Step::Continue;
                }
                self.issue_chunk(channel, settings)
            }
            HomingPhase::Rereferencing => {
                if elapsed >= PAN_REREFERENCE_PAUSE {
                    channel.driver.set_position_reference(0);
                    channel.driver.enable();
                    self.recovered = false;
                    self.enter(HomingPhase::Resettling, now);
                }
                Step::Continue
            }
            HomingPhase::Resettling => match self.settle(channel, settings, now) {
                Step::Continue => Step::Continue,
                Step::Done(Err(e)) => self.fail(channel, e),
                Step::Done(Ok(())) => self.finish(channel),
            },
        }
    }

    /// Restore the remembered velocity after an external abort.
    pub fn abort(&self, channel: &mut AxisChannel) {
        channel.driver.set_velocity_limit(channel.state.velocity_limit);
        warn!(phase = ?self.phase, "pan homing aborted");
    }

    fn enter(&mut self, phase: HomingPhase, now: Instant) {
        debug!(from = ?self.phase, to = ?phase, "pan homing phase");
        self.phase = phase;
        self.since = now;
    }

    fn issue_chunk(
        &mut self,
        channel: &mut AxisChannel,
        settings: &MotionSettings,
    ) -> Step<Result<HomingReport, MotionError>> {
        if channel.feedback().steps_complete {
            if let Err(e) = channel.driver.move_relative(settings.homing_chunk_counts) {
                warn!(error = %e, "pan homing chunk refused");
                return self.fail(channel, MotionError::Fault(Axis::Pan));
            }
            self.chunks += 1;
        }
        Step::Continue
    }

    /// Wait for ready with at most one recovery for this wait.
    fn settle(
        &mut self,
        channel: &mut AxisChannel,
        settings: &MotionSettings,
        now: Instant,
    ) -> Step<Result<(), MotionError>> {
        if let Some(recovery) = self.recovery.as_mut() {
            let step = recovery.poll(channel, settings, now);
            if matches!(step, Step::Done(_)) {
                self.recovery = None;
            }
            return step;
        }

        let feedback = channel.feedback();
        if feedback.faulted() {
            if self.recovered {
                return Step::Done(Err(MotionError::Fault(Axis::Pan)));
            }
            self.recovered = true;
            self.recovery = Some(FaultRecovery::start(channel, now));
            return Step::Continue;
        }
        if feedback.ready {
            if feedback.in_alert() {
                channel.driver.clear_alerts();
            }
            return Step::Done(Ok(()));
        }
        if now.saturating_duration_since(self.since) > PAN_SETTLE_TIMEOUT {
            return Step::Done(Err(MotionError::EnableTimeout(Axis::Pan)));
        }
        Step::Continue
    }

    fn fail(
        &mut self,
        channel: &mut AxisChannel,
        error: MotionError,
    ) -> Step<Result<HomingReport, MotionError>> {
        channel.driver.set_velocity_limit(channel.state.velocity_limit);
        channel.state.fault_present = channel.feedback().faulted();
        warn!(phase = ?self.phase, error = %error, "pan homing failed");
        Step::Done(Err(error))
    }

    fn finish(&mut self, channel: &mut AxisChannel) -> Step<Result<HomingReport, MotionError>> {
        channel.driver.clear_alerts();
        channel.driver.set_velocity_limit(channel.state.velocity_limit);
        channel.state.position = 0;
        channel.state.fault_present = false;
        let report = HomingReport {
            segments: self.segments,
            chunks: self.chunks,
        };
        info!(segments = report.segments, chunks = report.chunks, "pan homed and zeroed");
        Step::Done(Ok(report))
    }
}
