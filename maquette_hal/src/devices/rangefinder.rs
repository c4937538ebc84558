//! Laser rangefinder behind the device multiplexer.
//!
//! The sensor answers `DIST` with either `DIST:<mm>` or a bare number.
//! Readings outside 0-5000 mm are reported as out of range.

use super::line::{await_reply, flush_input};
use super::{DEFAULT_REPLY_TIMEOUT, SharedMux};
use maquette_common::hal::driver::{MeasurementError, MuxDevice, Rangefinder};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Largest distance the sensor reports reliably, in millimetres.
pub const MAX_RANGE_MM: f32 = 5000.0;

/// Sends `DIST` and parses the reply.
pub struct MuxRangefinder {
    mux: SharedMux,
    timeout: Duration,
    verbose: bool,
    last: Option<f32>,
}

impl MuxRangefinder {
    /// Create a consumer with the default reply timeout.
    pub fn new(mux: SharedMux) -> Self {
        Self {
            mux,
            timeout: DEFAULT_REPLY_TIMEOUT,
            verbose: false,
            last: None,
        }
    }

    /// Override the reply timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Last successful reading.
    pub fn last_measurement(&self) -> Option<f32> {
        self.last
    }
}

/// Parse one reply line.
fn parse_distance(line: &str) -> Result<f32, MeasurementError> {
    let value = line.strip_prefix("DIST:").unwrap_or(line).trim();
    let distance: f32 = value.parse().map_err(|_| MeasurementError::Failed)?;
    if !(0.0..=MAX_RANGE_MM).contains(&distance) {
        return Err(MeasurementError::OutOfRange);
    }
    Ok(distance)
}

impl Rangefinder for MuxRangefinder {
    fn take_measurement(&mut self) -> Result<f32, MeasurementError> {
        let reply = {
            let mut mux = self.mux.lock();
            mux.switch_to(MuxDevice::Rangefinder);
            flush_input(&mut *mux);
            if mux.write(b"DIST\r\n").is_err() {
                return Err(MeasurementError::Failed);
            }
            await_reply(&mut *mux, self.timeout, |line| Some(parse_distance(line)))
        };

        let result = reply.unwrap_or(Err(MeasurementError::Failed));
        match result {
            Ok(distance) => {
                self.last = Some(distance);
                if self.verbose {
                    info!(distance, "rangefinder measurement");
                } else {
                    debug!(distance, "rangefinder measurement");
                }
            }
            Err(e) => warn!(error = %e, "rangefinder measurement failed"),
        }
        result
    }

    fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::share_mux;
    use crate::sim::SimulatedMux;

    #[test]
    fn parse_prefixed_and_bare_replies() {
        assert_eq!(parse_distance("DIST:1234.5"), Ok(1234.5));
        assert_eq!(parse_distance("87"), Ok(87.0));
        assert_eq!(parse_distance("DIST:9000"), Err(MeasurementError::OutOfRange));
        assert_eq!(parse_distance("DIST:-4"), Err(MeasurementError::OutOfRange));
        assert_eq!(parse_distance("garbage"), Err(MeasurementError::Failed));
    }

    #[test]
    fn measurement_through_mux() {
        let sim = SimulatedMux::new();
        sim.set_distance_reply("DIST:250.125");
        let mut sensor = MuxRangefinder::new(share_mux(sim.clone()));
        assert_eq!(sensor.take_measurement(), Ok(250.125));
        assert_eq!(sensor.last_measurement(), Some(250.125));
    }

    #[test]
    fn servo_and_rangefinder_share_one_channel() {
        use crate::devices::MuxTiltServo;
        use maquette_common::hal::driver::TiltActuator;

        let sim = SimulatedMux::new();
        let shared = share_mux(sim.clone());
        let mut servo = MuxTiltServo::new(shared.clone());
        let mut sensor = MuxRangefinder::new(shared);

        servo.command_angle(60.0).unwrap();
        assert_eq!(sensor.take_measurement(), Ok(1000.0));
        assert_eq!(sim.active(), MuxDevice::Rangefinder);
        servo.command_angle(70.0).unwrap();
        assert_eq!(sim.servo_angle(), Some(70.0));
    }
}
