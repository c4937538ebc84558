//! `PING`, `RESET`, `STATUS` and `DEBUG`.

use super::Dispatcher;
use crate::protocol::{Frame, Response};
use tracing::info;

impl Dispatcher {
    pub(super) fn system_command(&mut self, frame: &Frame) -> Response {
        match frame.name.as_str() {
            "PING" => Response::ok("PONG"),
            "RESET" => {
                self.engine.stop();
                let clean = self.engine.recover();
                info!(clean, "soft reset");
                Response::ok("RESETTING")
            }
            "STATUS" => self.status(),
            "DEBUG" => self.debug_mode(frame),
            _ => Response::error("UNKNOWN_COMMAND"),
        }
    }

    /// `X=..,Y=..,Z=..,PAN=..,TILT=..,ESTOP=0|1,MOVING=0|1,HOMED=0|1`
    pub fn status(&self) -> Response {
        let pos = self.engine.position();
        Response::ok(format!(
            "X={:.2},Y={:.2},Z={:.2},PAN={:.2},TILT={:.2},ESTOP={},MOVING={},HOMED={}",
            f64::from(pos.x),
            f64::from(pos.y),
            f64::from(pos.z),
            pos.pan,
            pos.tilt,
            u8::from(self.interlock.is_active()),
            u8::from(self.engine.is_moving()),
            u8::from(self.engine.is_homed()),
        ))
    }

    fn debug_mode(&mut self, frame: &Frame) -> Response {
        if frame.param_count() == 0 {
            return Response::error("MISSING_PARAM");
        }
        let enabled = match frame.param(0) {
            "ON" => true,
            "OFF" => false,
            _ => return Response::error("INVALID_PARAM"),
        };
        self.debug = enabled;
        self.rangefinder.set_verbose(enabled);
        info!(enabled, "debug mode");
        Response::ok(if enabled {
            "DEBUG_ENABLED"
        } else {
            "DEBUG_DISABLED"
        })
    }
}
