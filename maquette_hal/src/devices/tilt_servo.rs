//! Tilt servo controller behind the device multiplexer.

use super::line::{await_reply, flush_input};
use super::{DEFAULT_REPLY_TIMEOUT, SharedMux};
use maquette_common::hal::driver::{DeviceError, MuxDevice, TiltActuator};
use std::time::Duration;
use tracing::{debug, warn};

/// Sends `ANGLE:<deg>` and waits for the controller's `OK`.
pub struct MuxTiltServo {
    mux: SharedMux,
    timeout: Duration,
}

impl MuxTiltServo {
    /// Create a consumer with the default reply timeout.
    pub fn new(mux: SharedMux) -> Self {
        Self {
            mux,
            timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    /// Override the reply timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl TiltActuator for MuxTiltServo {
    fn command_angle(&mut self, degrees: f32) -> Result<(), DeviceError> {
        let mut mux = self.mux.lock();
        mux.switch_to(MuxDevice::TiltServo);
        flush_input(&mut *mux);

        let request = format!("ANGLE:{degrees:.2}\r\n");
        mux.write(request.as_bytes())?;
        debug!(degrees, "tilt angle sent");

        let reply = await_reply(&mut *mux, self.timeout, |line| {
            if line == "OK" {
                Some(Ok(()))
            } else if line.starts_with("ERR") {
                Some(Err(DeviceError::Rejected(line.to_string())))
            } else {
                None
            }
        });

        match reply {
            Some(result) => result,
            None => {
                warn!(degrees, "tilt servo did not acknowledge");
                Err(DeviceError::Timeout)
            }
        }
    }
}
