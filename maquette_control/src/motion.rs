//! Motion control root.
//!
//! Owns axis enablement, positions, homing, moves, velocity and
//! acceleration limits, and the tilt clamp. Nothing here blocks: every
//! wait (drive ready, move completion, flag search, fault recovery) is a
//! job polled once per control cycle.
//!
//! # Phases
//!
//! ```text
//!          home_all / home_axis(Pan)
//!   Idle ───────────────────────────► Homing ──┐
//!    ▲  │         move_to / move_pan           │ success: Idle
//!    │  └───────────────────────────► Moving ──┤ fault / trip: Error
//!    │                                         ▼
//!    └──────────── recover() ─────────────── Error
//! ```
//!
//! Only one job runs at a time. A new HOME, MOVE or ENABLE while a job
//! is in flight is refused with [`MotionError::Busy`].
//!
//! # Limit Switches
//!
//! The X, Y and Z end-of-travel switches, and a drive's `TRAVEL_LIMIT`
//! alert, are checked on every poll. A trip de-energizes every drive,
//! aborts the running job and latches `Error` until a `recover()` with
//! all switches open.
//!
//! # Units
//!
//! Linear positions are counts, velocities counts/s and accelerations
//! counts/s². Pan is commanded in degrees and converted with
//! `pan_counts_per_degree`. Tilt is in degrees.

pub mod axis;
pub mod engine;
pub mod homing;
pub mod jobs;
pub mod recovery;
pub mod tilt;

pub use axis::{AxisChannel, AxisState};
pub use engine::{MotionEngine, MotionParts, MoveReport, MoveTarget};
pub use homing::{HomingPhase, HomingReport, PanHoming};
pub use tilt::{TiltControl, TiltState};

use crate::protocol::Response;
use maquette_common::consts::{
    DEFAULT_ENABLE_TIMEOUT_MS, DEFAULT_HOMING_CHUNK_COUNTS, DEFAULT_HOMING_TIMEOUT_MS,
    DEFAULT_HOMING_VELOCITY, DEFAULT_RECOVERY_PAUSE_MS, DEFAULT_TILT_HOME,
};
use maquette_common::hal::driver::DeviceError;
use maquette_common::hal::types::Axis;
use std::time::Duration;
use thiserror::Error;

// ─── Phase & Step ───────────────────────────────────────────────────

/// Engine-wide motion phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionPhase {
    #[default]
    Idle,
    Homing,
    Moving,
    /// A fault or interlock trip aborted a job. Left only via `recover()`.
    Error,
}

/// Result of polling a job once.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    Continue,
    Done(T),
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Motion request and job failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    #[error("emergency stop interlock is active")]
    Interlocked,

    #[error("another motion job is running")]
    Busy,

    #[error("engine is in error state, recovery required")]
    InErrorState,

    #[error("axis {0} is not enabled")]
    AxisDisabled(Axis),

    #[error("invalid tilt limits {min}..{max}")]
    InvalidTiltLimits { min: f32, max: f32 },

    #[error("tilt actuator: {0}")]
    Tilt(#[from] DeviceError),

    #[error("axis {0} faulted")]
    Fault(Axis),

    #[error("axis {0} did not recover from fault")]
    RecoveryFailed(Axis),

    #[error("axis {0} did not report ready in time")]
    EnableTimeout(Axis),

    #[error("pan homing timed out")]
    HomingTimeout,

    #[error("stopped by operator")]
    Stopped,

    #[error("limit switch on axis {0} tripped")]
    LimitTripped(Axis),
}

impl MotionError {
    /// Faults that leave the engine in `MotionPhase::Error`.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            Self::Fault(_)
                | Self::RecoveryFailed(_)
                | Self::EnableTimeout(_)
                | Self::HomingTimeout
                | Self::LimitTripped(_)
        )
    }
}

// ─── Events ─────────────────────────────────────────────────────────

/// Completion of a job, reported once.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionEvent {
    EnableComplete,
    EnableFailed(MotionError),
    HomingComplete { segments: u8 },
    HomingFailed(MotionError),
    MoveComplete,
    MoveFailed(MotionError),
    /// A limit switch tripped. Reported before the aborted job's failure.
    LimitTripped(Axis),
}

impl MotionEvent {
    /// Unsolicited protocol notice for this event.
    pub fn notice(&self) -> Response {
        if let Self::LimitTripped(axis) = self {
            return Response::info(format!("LIMIT_TRIPPED:{axis}"));
        }
        Response::info(match self {
            Self::EnableComplete => "ENABLE_COMPLETE",
            Self::EnableFailed(_) => "ENABLE_FAILED",
            Self::HomingComplete { .. } => "HOMING_COMPLETE",
            Self::HomingFailed(_) => "HOMING_FAILED",
            Self::MoveComplete => "MOVE_COMPLETE",
            Self::MoveFailed(_) => "MOVE_FAILED",
            Self::LimitTripped(_) => "LIMIT_TRIPPED",
        })
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::EnableFailed(_)
                | Self::HomingFailed(_)
                | Self::MoveFailed(_)
                | Self::LimitTripped(_)
        )
    }
}

// ─── Settings ───────────────────────────────────────────────────────

/// Timing and homing parameters of the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSettings {
    /// Time a drive has to report ready after energizing.
    pub enable_timeout: Duration,
    /// Pause between de-energize and re-energize during recovery.
    pub recovery_pause: Duration,
    /// Pan velocity limit during the flag search, counts/s.
    pub homing_velocity: f64,
    /// Relative move size per search chunk, counts.
    pub homing_chunk_counts: i32,
    /// Overall pan homing deadline. `None` disables it.
    pub homing_timeout: Option<Duration>,
    pub pan_counts_per_degree: f64,
    /// Tilt angle used at startup and by homing, degrees.
    pub tilt_home: f32,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            enable_timeout: Duration::from_millis(DEFAULT_ENABLE_TIMEOUT_MS),
            recovery_pause: Duration::from_millis(DEFAULT_RECOVERY_PAUSE_MS),
            homing_velocity: DEFAULT_HOMING_VELOCITY,
            homing_chunk_counts: DEFAULT_HOMING_CHUNK_COUNTS,
            homing_timeout: (DEFAULT_HOMING_TIMEOUT_MS > 0)
                .then(|| Duration::from_millis(DEFAULT_HOMING_TIMEOUT_MS)),
            pan_counts_per_degree: 1.0,
            tilt_home: DEFAULT_TILT_HOME,
        }
    }
}

impl MotionSettings {
    /// Pan degrees to drive counts.
    pub fn pan_counts(&self, degrees: f32) -> i32 {
        (f64::from(degrees) * self.pan_counts_per_degree).round() as i32
    }

    /// Pan drive counts to degrees.
    pub fn pan_degrees(&self, counts: i32) -> f32 {
        (f64::from(counts) / self.pan_counts_per_degree) as f32
    }
}

// ─── Position ───────────────────────────────────────────────────────

/// Last known position of every axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Degrees.
    pub pan: f32,
    /// Degrees.
    pub tilt: f32,
}
