//! Rangefinder and servo commands: `MEASURE`, `SCAN`, `TILT`, `PAN`.

use super::Dispatcher;
use crate::protocol::{Frame, Response, Status};
use maquette_common::hal::driver::MeasurementError;
use tracing::{info, warn};

impl Dispatcher {
    pub(super) fn rangefinder_command(&mut self, frame: &Frame) -> Response {
        match frame.name.as_str() {
            "MEASURE" => match self.rangefinder.take_measurement() {
                Ok(distance) => Response::formatted(Status::Ok, format_args!("{distance:.3}")),
                Err(MeasurementError::OutOfRange) => Response::error("OUT_OF_RANGE"),
                Err(MeasurementError::Failed) => Response::error("MEASUREMENT_FAILED"),
            },
            "SCAN" => {
                if frame.param_count() < 5 {
                    return Response::error("MISSING_PARAMS");
                }
                // Acknowledged only; scan execution lives outside the core.
                info!(
                    x1 = frame.param_f32(0),
                    y1 = frame.param_f32(1),
                    x2 = frame.param_f32(2),
                    y2 = frame.param_f32(3),
                    step = frame.param_f32(4),
                    "scan requested"
                );
                Response::ok("SCAN_STARTED")
            }
            _ => Response::error("UNKNOWN_COMMAND"),
        }
    }

    pub(super) fn servo_command(&mut self, frame: &Frame) -> Response {
        let name = frame.name.as_str();
        if frame.param_count() == 0 {
            return Response::error("MISSING_PARAM");
        }
        let angle = frame.param_f32(0);
        let result = match name {
            "TILT" => self.engine.set_tilt_angle(angle).map(|_| ()),
            "PAN" => self.engine.move_pan(angle, self.now),
            _ => return Response::error("UNKNOWN_COMMAND"),
        };
        match (name, result) {
            ("TILT", Ok(())) => Response::ok("TILT_SET"),
            ("TILT", Err(e)) => {
                warn!(error = %e, angle, "tilt command failed");
                Response::error("TILT_FAILED")
            }
            (_, Ok(())) => Response::ok("PAN_SET"),
            (_, Err(e)) => {
                warn!(error = %e, angle, "pan command failed");
                Response::error("PAN_FAILED")
            }
        }
    }
}
