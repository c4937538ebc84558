//! Axis identifiers and actuator feedback types.
//!
//! - `Axis` - The five degrees of freedom of the rig
//! - `AlertFlags` - Latched actuator alert bits
//! - `AxisFeedback` - Snapshot of one driver's status signals

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One independently controlled degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Linear X carriage.
    X,
    /// Linear Y carriage.
    Y,
    /// Linear Z carriage.
    Z,
    /// Rotational pan stage (step/direction driven).
    Pan,
    /// Tilt servo (angle commanded, no position feedback).
    Tilt,
}

impl Axis {
    /// Axes driven by step/direction actuators, in index order.
    pub const DRIVEN: [Axis; 4] = [Axis::X, Axis::Y, Axis::Z, Axis::Pan];

    /// The three linear axes.
    pub const LINEAR: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Parse a protocol axis token, case-insensitive.
    ///
    /// Accepts `X`, `Y`, `Z`, `PAN`/`P` and `TILT`/`T`.
    pub fn parse_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "X" => Some(Self::X),
            "Y" => Some(Self::Y),
            "Z" => Some(Self::Z),
            "PAN" | "P" => Some(Self::Pan),
            "TILT" | "T" => Some(Self::Tilt),
            _ => None,
        }
    }

    /// Index into driven-axis arrays. `None` for tilt.
    #[inline]
    pub const fn driven_index(self) -> Option<usize> {
        match self {
            Self::X => Some(0),
            Self::Y => Some(1),
            Self::Z => Some(2),
            Self::Pan => Some(3),
            Self::Tilt => None,
        }
    }

    #[inline]
    pub const fn is_linear(self) -> bool {
        matches!(self, Self::X | Self::Y | Self::Z)
    }

    /// Upper-case protocol name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::Y => "Y",
            Self::Z => "Z",
            Self::Pan => "PAN",
            Self::Tilt => "TILT",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Latched actuator alerts. Cleared only by `AxisDriver::clear_alerts`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AlertFlags: u16 {
        /// Drive reported an internal fault.
        const MOTOR_FAULTED        = 0x0001;
        /// Motion was commanded while an alert was active.
        const MOVE_WHILE_ALERTED   = 0x0002;
        /// Motion was commanded while the drive was disabled.
        const MOVE_WHILE_DISABLED  = 0x0004;
        /// Drive was disabled in the middle of a move.
        const DISABLED_IN_MOTION   = 0x0008;
        /// Drive halted at its end of travel. Treated as a tripped limit
        /// switch until cleared.
        const TRAVEL_LIMIT         = 0x0010;
    }
}

/// Status signals of one step/direction actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisFeedback {
    /// Enable output is asserted.
    pub energized: bool,
    /// High-level feedback line asserted (drive ready / in position).
    pub ready: bool,
    /// All commanded steps have been issued.
    pub steps_complete: bool,
    /// Latched alerts.
    pub alerts: AlertFlags,
    /// Commanded position in counts.
    pub position: i32,
}

impl AxisFeedback {
    /// A drive fault is latched.
    #[inline]
    pub fn faulted(&self) -> bool {
        self.alerts.contains(AlertFlags::MOTOR_FAULTED)
    }

    /// Any alert is latched.
    #[inline]
    pub fn in_alert(&self) -> bool {
        !self.alerts.is_empty()
    }

    /// Move complete: steps issued, drive ready and nothing latched.
    #[inline]
    pub fn settled(&self) -> bool {
        self.steps_complete && self.ready && !self.faulted()
    }
}
