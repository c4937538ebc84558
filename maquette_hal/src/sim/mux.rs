//! Simulated device multiplexer.
//!
//! Emulates the shared serial channel and the two peers behind it:
//!
//! | Peer | Request | Reply |
//! |------|---------|-------|
//! | tilt servo controller | `ANGLE:<deg>\r\n` | `OK\r\n`, or `ERR\r\n` if unparsable |
//! | rangefinder | `DIST\r\n` | `DIST:<mm>\r\n` |
//!
//! The tilt peer clamps to its own 0-180° range like the real controller.

use maquette_common::hal::driver::{DeviceError, DeviceMux, MuxDevice};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug)]
struct MuxState {
    active: MuxDevice,
    line: Vec<u8>,
    replies: VecDeque<u8>,
    servo_angle: Option<f32>,
    servo_silent: bool,
    distance_reply: String,
}

impl MuxState {
    fn handle_line(&mut self, line: &str) {
        let reply = match self.active {
            MuxDevice::TiltServo => {
                if self.servo_silent {
                    return;
                }
                match line.strip_prefix("ANGLE:").map(|v| v.trim().parse::<f32>()) {
                    Some(Ok(angle)) => {
                        self.servo_angle = Some(angle.clamp(0.0, 180.0));
                        "OK".to_string()
                    }
                    _ => "ERR".to_string(),
                }
            }
            MuxDevice::Rangefinder if line == "DIST" => self.distance_reply.clone(),
            MuxDevice::Rangefinder => return,
        };
        trace!(device = ?self.active, %reply, "mux peer reply");
        self.replies.extend(reply.bytes());
        self.replies.extend(b"\r\n");
    }
}

/// Serial multiplexer with emulated tilt controller and rangefinder.
#[derive(Debug, Clone)]
pub struct SimulatedMux {
    state: Arc<Mutex<MuxState>>,
}

impl Default for SimulatedMux {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedMux {
    /// Create a mux routed to the tilt servo, rangefinder reading 1000 mm.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MuxState {
                active: MuxDevice::TiltServo,
                line: Vec::new(),
                replies: VecDeque::new(),
                servo_angle: None,
                servo_silent: false,
                distance_reply: "DIST:1000.0".to_string(),
            })),
        }
    }

    /// Angle last accepted by the servo controller.
    pub fn servo_angle(&self) -> Option<f32> {
        self.state.lock().servo_angle
    }

    /// Stop (or resume) answering servo commands.
    pub fn set_servo_silent(&self, silent: bool) {
        self.state.lock().servo_silent = silent;
    }

    /// Raw line the rangefinder answers `DIST` with, without terminator.
    pub fn set_distance_reply(&self, reply: &str) {
        self.state.lock().distance_reply = reply.to_string();
    }

    /// Device the channel is currently routed to.
    pub fn active(&self) -> MuxDevice {
        self.state.lock().active
    }
}

impl DeviceMux for SimulatedMux {
    fn switch_to(&mut self, device: MuxDevice) {
        let mut state = self.state.lock();
        if state.active != device {
            state.active = device;
            state.line.clear();
            state.replies.clear();
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, DeviceError> {
        let mut state = self.state.lock();
        for &b in bytes {
            match b {
                b'\r' => {}
                b'\n' => {
                    let line = String::from_utf8_lossy(&state.line).into_owned();
                    state.line.clear();
                    state.handle_line(line.trim());
                }
                _ => state.line.push(b),
            }
        }
        Ok(bytes.len())
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.state.lock().replies.pop_front()
    }
}
