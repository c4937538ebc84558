//! Command dispatcher.
//!
//! Turns parsed frames into subsystem calls and exactly one response.
//!
//! # Gating Order
//!
//! 1. `ESTOP` latches the interlock, whatever else is going on.
//! 2. While the interlock is active, everything except `STATUS` and
//!    `RESET_ESTOP` is refused with `ERROR:ESTOP_ACTIVE`.
//! 3. `RESET_ESTOP` tries to release the interlock.
//! 4. Everything else is routed by command group.
//!
//! # Command Groups
//!
//! | Group | Commands |
//! |-------|----------|
//! | System | `PING`, `RESET`, `STATUS`, `DEBUG` |
//! | Motion | `HOME`, `MOVE`, `STOP`, `VELOCITY`, `ENABLE`, `DISABLE` |
//! | Rangefinder | `MEASURE`, `SCAN` |
//! | Servo | `TILT`, `PAN` |
//! | Config | `CONFIG`, `GET`, `SET`, `SAVE` |
//!
//! Command names are matched exactly. Axis tokens are case-insensitive.

pub mod motion;
pub mod peripheral;
pub mod settings;
pub mod system;

use crate::motion::MotionEngine;
use crate::protocol::{Frame, FrameHandler, Response};
use crate::safety::EmergencyStop;
use maquette_common::hal::driver::Rangefinder;
use maquette_common::store::ConfigStore;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Routing group of a command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandGroup {
    System,
    Motion,
    Rangefinder,
    Servo,
    Config,
}

impl CommandGroup {
    pub fn of(name: &str) -> Option<Self> {
        match name {
            "PING" | "RESET" | "STATUS" | "DEBUG" => Some(Self::System),
            "HOME" | "MOVE" | "STOP" | "VELOCITY" | "ENABLE" | "DISABLE" => Some(Self::Motion),
            "MEASURE" | "SCAN" => Some(Self::Rangefinder),
            "TILT" | "PAN" => Some(Self::Servo),
            "CONFIG" | "GET" | "SET" | "SAVE" => Some(Self::Config),
            _ => None,
        }
    }
}

/// Owns the subsystems commands act on.
pub struct Dispatcher {
    engine: MotionEngine,
    interlock: EmergencyStop,
    rangefinder: Box<dyn Rangefinder>,
    store: Box<dyn ConfigStore>,
    debug: bool,
    now: Instant,
}

impl Dispatcher {
    pub fn new(
        engine: MotionEngine,
        interlock: EmergencyStop,
        rangefinder: Box<dyn Rangefinder>,
        store: Box<dyn ConfigStore>,
    ) -> Self {
        Self {
            engine,
            interlock,
            rangefinder,
            store,
            debug: false,
            now: Instant::now(),
        }
    }

    /// Bring the subsystems up: startup values from the store, drive
    /// limits and tilt home, then the first interlock read.
    pub fn init(&mut self, now: Instant) {
        self.now = now;
        self.load_startup_settings();
        self.engine.init();
        self.interlock.init(&mut self.engine);
        info!(
            interlock_active = self.interlock.is_active(),
            "dispatcher ready"
        );
    }

    /// Timestamp used for jobs started by the next frames.
    pub fn set_now(&mut self, now: Instant) {
        self.now = now;
    }

    /// Poll the e-stop input. Returns the notice for a new trip.
    pub fn poll_interlock(&mut self) -> Option<Response> {
        self.interlock
            .poll(&mut self.engine)
            .then(|| Response::info("ESTOP_ACTIVATED"))
    }

    /// Advance motion. Returns the notice for a finished job.
    pub fn poll_motion(&mut self, now: Instant) -> Option<Response> {
        self.engine.poll(now).map(|event| event.notice())
    }

    /// Apply velocity, acceleration and tilt limits from the store.
    pub fn load_startup_settings(&mut self) {
        let values = settings::StartupValues::from_store(self.store.as_ref());
        self.engine
            .set_velocity(values.velocity[0], values.velocity[1], values.velocity[2]);
        self.engine.set_acceleration(values.acceleration);
        if let Err(e) = self.engine.set_tilt_limits(values.tilt_min, values.tilt_max) {
            warn!(error = %e, "stored tilt limits ignored");
        }
        debug!(?values, "startup settings applied");
    }

    pub fn engine(&self) -> &MotionEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut MotionEngine {
        &mut self.engine
    }

    pub fn interlock(&self) -> &EmergencyStop {
        &self.interlock
    }

    pub fn store(&self) -> &dyn ConfigStore {
        self.store.as_ref()
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    fn route(&mut self, frame: &Frame) -> Response {
        match CommandGroup::of(&frame.name) {
            Some(CommandGroup::System) => self.system_command(frame),
            Some(CommandGroup::Motion) => self.motion_command(frame),
            Some(CommandGroup::Rangefinder) => self.rangefinder_command(frame),
            Some(CommandGroup::Servo) => self.servo_command(frame),
            Some(CommandGroup::Config) => self.config_command(frame),
            None => Response::error("UNKNOWN_COMMAND"),
        }
    }
}

impl FrameHandler for Dispatcher {
    fn on_frame(&mut self, frame: &Frame) -> Response {
        let name = frame.name.as_str();
        if self.debug {
            info!(command = name, params = ?frame.params, "command");
        } else {
            debug!(command = name, params = frame.param_count(), "command");
        }

        if name == "ESTOP" {
            self.interlock.activate(&mut self.engine);
            return Response::ok("ESTOP_ACTIVATED");
        }
        if self.interlock.is_active() && name != "STATUS" && name != "RESET_ESTOP" {
            return Response::error("ESTOP_ACTIVE");
        }
        if name == "RESET_ESTOP" {
            return match self.interlock.reset(&mut self.engine) {
                Ok(()) => Response::ok("ESTOP_RESET"),
                Err(_) => Response::error("ESTOP_STILL_ACTIVE"),
            };
        }
        self.route(frame)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("engine", &self.engine)
            .field("interlock", &self.interlock)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}
