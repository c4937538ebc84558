//! `HOME`, `MOVE`, `STOP`, `VELOCITY`, `ENABLE` and `DISABLE`.

use super::Dispatcher;
use super::settings::is_drive_limit;
use crate::motion::MoveTarget;
use crate::protocol::{Frame, Response};
use maquette_common::hal::types::Axis;
use tracing::{info, warn};

/// Axis selection of `HOME`, `ENABLE` and `DISABLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisSelection {
    All,
    One(Axis),
}

impl AxisSelection {
    fn parse(token: &str) -> Option<Self> {
        if token.trim().eq_ignore_ascii_case("ALL") {
            Some(Self::All)
        } else {
            Axis::parse_token(token).map(Self::One)
        }
    }
}

impl Dispatcher {
    pub(super) fn motion_command(&mut self, frame: &Frame) -> Response {
        match frame.name.as_str() {
            "HOME" => self.home(frame),
            "MOVE" => self.move_to(frame),
            "STOP" => {
                self.engine.stop();
                Response::ok("MOTION_STOPPED")
            }
            "VELOCITY" => self.velocity(frame),
            "ENABLE" => self.enable(frame),
            "DISABLE" => self.disable(frame),
            _ => Response::error("UNKNOWN_COMMAND"),
        }
    }

    fn home(&mut self, frame: &Frame) -> Response {
        if frame.param_count() == 0 {
            return Response::error("MISSING_PARAM");
        }
        let result = match AxisSelection::parse(frame.param(0)) {
            Some(AxisSelection::All) => self.engine.home_all(self.now),
            Some(AxisSelection::One(axis)) if axis.is_linear() => {
                self.engine.home_axis(axis, self.now)
            }
            _ => return Response::error("INVALID_AXIS"),
        };
        match result {
            Ok(()) => Response::ok("HOMING_STARTED"),
            Err(e) => {
                warn!(error = %e, "homing refused");
                Response::error("HOMING_FAILED")
            }
        }
    }

    fn move_to(&mut self, frame: &Frame) -> Response {
        if frame.param_count() < 3 {
            return Response::error("MISSING_PARAMS");
        }
        let counts = |i: usize| frame.param_f64(i).round() as i32;
        let target = MoveTarget {
            x: counts(0),
            y: counts(1),
            z: counts(2),
            pan: (frame.param_count() > 3).then(|| frame.param_f32(3)),
            tilt: (frame.param_count() > 4).then(|| frame.param_f32(4)),
        };
        match self.engine.move_to(target, self.now) {
            Ok(report) => {
                if !report.rejected.is_empty() {
                    warn!(rejected = ?report.rejected, "move started with disabled axes");
                }
                Response::ok("MOVE_STARTED")
            }
            Err(e) => {
                warn!(error = %e, "move refused");
                Response::error("MOVE_FAILED")
            }
        }
    }

    fn velocity(&mut self, frame: &Frame) -> Response {
        if frame.param_count() < 3 {
            return Response::error("MISSING_PARAMS");
        }
        let [vx, vy, vz] = [0, 1, 2].map(|i| frame.param_f64(i));
        if ![vx, vy, vz].into_iter().all(is_drive_limit) {
            return Response::error("INVALID_PARAMETERS");
        }
        self.engine.set_velocity(vx, vy, vz);
        Response::ok("VELOCITY_SET")
    }

    fn enable(&mut self, frame: &Frame) -> Response {
        if frame.param_count() == 0 {
            return Response::error("MISSING_PARAM");
        }
        let axes: Vec<Axis> = match AxisSelection::parse(frame.param(0)) {
            Some(AxisSelection::All) => Axis::DRIVEN.into_iter().chain([Axis::Tilt]).collect(),
            Some(AxisSelection::One(axis)) => vec![axis],
            None => return Response::error("INVALID_AXIS"),
        };
        match self.engine.enable_axes(&axes, self.now) {
            Ok(()) => Response::ok("ENABLING"),
            Err(e) => {
                warn!(error = %e, "enable refused");
                Response::error("ENABLE_FAILED")
            }
        }
    }

    fn disable(&mut self, frame: &Frame) -> Response {
        if frame.param_count() == 0 {
            return Response::error("MISSING_PARAM");
        }
        match AxisSelection::parse(frame.param(0)) {
            Some(AxisSelection::All) => {
                for axis in Axis::DRIVEN.into_iter().chain([Axis::Tilt]) {
                    self.engine.disable_axis(axis);
                }
            }
            Some(AxisSelection::One(axis)) => self.engine.disable_axis(axis),
            None => return Response::error("INVALID_AXIS"),
        }
        info!(token = frame.param(0), "disable command");
        Response::ok("AXIS_DISABLED")
    }
}
