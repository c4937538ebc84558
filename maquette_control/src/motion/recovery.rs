//! Drive fault recovery.
//!
//! Cycles the enable output to clear a drive fault:
//!
//! ```text
//! start: disable ──► Pausing ──(recovery_pause)──► enable ──► AwaitingReady
//!                                                               │
//!            ready: clear alerts, Ok ◄──────────────────────────┤
//!            enable_timeout elapsed: RecoveryFailed ◄───────────┘
//! ```
//!
//! Move, enable and homing jobs embed one of these and run it at most
//! once per attempt.

use super::axis::AxisChannel;
use super::{MotionError, MotionSettings, Step};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPhase {
    Pausing,
    AwaitingReady,
}

#[derive(Debug, Clone)]
pub struct FaultRecovery {
    phase: RecoveryPhase,
    since: Instant,
}

impl FaultRecovery {
    /// De-energize the drive and start the pause.
    pub fn start(channel: &mut AxisChannel, now: Instant) -> Self {
        warn!(axis = %channel.axis, alerts = ?channel.feedback().alerts, "cycling enable to clear fault");
        channel.driver.disable();
        Self {
            phase: RecoveryPhase::Pausing,
            since: now,
        }
    }

    pub fn phase(&self) -> RecoveryPhase {
        self.phase
    }

    pub fn poll(
        &mut self,
        channel: &mut AxisChannel,
        settings: &MotionSettings,
        now: Instant,
    ) -> Step<Result<(), MotionError>> {
        let elapsed = now.saturating_duration_since(self.since);
        match self.phase {
            RecoveryPhase::Pausing => {
                if elapsed >= settings.recovery_pause {
                    channel.driver.enable();
                    self.phase = RecoveryPhase::AwaitingReady;
                    self.since = now;
                }
                Step::Continue
            }
            RecoveryPhase::AwaitingReady => {
                // Alerts stay latched until cleared, so only `ready` counts here.
                if channel.feedback().ready {
                    channel.driver.clear_alerts();
                    if channel.feedback().faulted() {
                        warn!(axis = %channel.axis, "fault persists after recovery");
                        channel.state.fault_present = true;
                        return Step::Done(Err(MotionError::RecoveryFailed(channel.axis)));
                    }
                    channel.state.fault_present = false;
                    info!(axis = %channel.axis, "fault cleared");
                    Step::Done(Ok(()))
                } else if elapsed > settings.enable_timeout {
                    warn!(axis = %channel.axis, "drive not ready after recovery");
                    channel.state.fault_present = channel.feedback().faulted();
                    Step::Done(Err(MotionError::RecoveryFailed(channel.axis)))
                } else {
                    Step::Continue
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maquette_common::hal::types::Axis;
    use maquette_hal::sim::SimulatedAxis;
    use std::time::Duration;

    const DT: Duration = Duration::from_millis(5);

    fn run(
        job: &mut FaultRecovery,
        channel: &mut AxisChannel,
        sim: &SimulatedAxis,
        now: &mut Instant,
    ) -> Result<(), MotionError> {
        let settings = MotionSettings::default();
        loop {
            sim.advance(DT);
            *now += DT;
            if let Step::Done(result) = job.poll(channel, &settings, *now) {
                return result;
            }
        }
    }

    fn channel() -> (AxisChannel, SimulatedAxis) {
        let sim = SimulatedAxis::new("x", 10_000.0, 100_000.0, Duration::from_millis(50));
        let mut channel = AxisChannel::new(Axis::X, Box::new(sim.clone()));
        channel.driver.enable();
        (channel, sim)
    }

    #[test]
    fn transient_fault_is_cleared() {
        let (mut channel, sim) = channel();
        sim.inject_fault();
        let mut now = Instant::now();
        let mut job = FaultRecovery::start(&mut channel, now);
        assert!(!channel.feedback().energized);

        assert_eq!(run(&mut job, &mut channel, &sim, &mut now), Ok(()));
        let fb = channel.feedback();
        assert!(fb.energized && fb.ready && !fb.in_alert());
        assert!(!channel.state.fault_present);
    }

    #[test]
    fn persistent_fault_times_out() {
        let (mut channel, sim) = channel();
        sim.set_persistent_fault(true);
        let mut now = Instant::now();
        let start = now;
        let mut job = FaultRecovery::start(&mut channel, now);

        assert_eq!(
            run(&mut job, &mut channel, &sim, &mut now),
            Err(MotionError::RecoveryFailed(Axis::X))
        );
        assert!(now - start > MotionSettings::default().enable_timeout);
        assert!(channel.state.fault_present);
    }
}
