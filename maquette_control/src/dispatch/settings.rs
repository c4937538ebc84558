//! Configuration store commands: `CONFIG`, `GET`, `SET`, `SAVE`.
//!
//! Keys with a live effect:
//!
//! | Key | Effect |
//! |-----|--------|
//! | `velocity_x`, `velocity_y`, `velocity_z` | Drive velocity limits (pan follows X) |
//! | `acceleration` | Acceleration limit of every drive |
//! | `tilt_min`, `tilt_max` | Tilt clamp |

use super::Dispatcher;
use crate::protocol::{Frame, Response, Status};
use maquette_common::consts::{
    DEFAULT_ACCELERATION, DEFAULT_TILT_MAX, DEFAULT_TILT_MIN, DEFAULT_VELOCITY,
};
use maquette_common::store::{ConfigStore, StoreError};
use tracing::{info, warn};

/// Keys holding a drive velocity or acceleration limit.
const DRIVE_LIMIT_KEYS: [&str; 4] = ["velocity_x", "velocity_y", "velocity_z", "acceleration"];

/// Drive limits must be finite and strictly positive.
pub(super) fn is_drive_limit(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Motion values read from the store at startup and after `SET`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartupValues {
    pub velocity: [f64; 3],
    pub acceleration: f64,
    pub tilt_min: f32,
    pub tilt_max: f32,
}

impl StartupValues {
    pub fn from_store(store: &dyn ConfigStore) -> Self {
        Self {
            velocity: [
                store.get_float("velocity_x", DEFAULT_VELOCITY),
                store.get_float("velocity_y", DEFAULT_VELOCITY),
                store.get_float("velocity_z", DEFAULT_VELOCITY),
            ],
            acceleration: store.get_float("acceleration", DEFAULT_ACCELERATION),
            tilt_min: store.get_float("tilt_min", f64::from(DEFAULT_TILT_MIN)) as f32,
            tilt_max: store.get_float("tilt_max", f64::from(DEFAULT_TILT_MAX)) as f32,
        }
    }
}

impl Dispatcher {
    pub(super) fn config_command(&mut self, frame: &Frame) -> Response {
        match frame.name.as_str() {
            "CONFIG" => self.config(frame),
            "GET" => {
                if frame.param_count() == 0 {
                    return Response::error("MISSING_KEY");
                }
                match self.store.value(frame.param(0)) {
                    Some(value) => Response::formatted(Status::Ok, format_args!("{value}")),
                    None => Response::error("KEY_NOT_FOUND"),
                }
            }
            "SET" => self.set(frame),
            "SAVE" => self.save(),
            _ => Response::error("UNKNOWN_COMMAND"),
        }
    }

    fn config(&mut self, frame: &Frame) -> Response {
        if frame.param_count() == 0 {
            return Response::error("MISSING_CONFIG_COMMAND");
        }
        match frame.param(0) {
            "LOAD" => match self.store.load() {
                Ok(()) => {
                    self.load_startup_settings();
                    info!(keys = self.store.keys().len(), "configuration loaded");
                    Response::ok("CONFIG_LOADED")
                }
                Err(e) => {
                    warn!(error = %e, "configuration load failed");
                    Response::error("CONFIG_LOAD_FAILED")
                }
            },
            "SAVE" => self.save(),
            "LIST" => Response::formatted(Status::Ok, format_args!("{}", self.store.keys().join(","))),
            _ => Response::error("INVALID_CONFIG_COMMAND"),
        }
    }

    fn set(&mut self, frame: &Frame) -> Response {
        if frame.param_count() < 2 {
            return Response::error("MISSING_PARAMS");
        }
        let key = frame.param(0);
        if DRIVE_LIMIT_KEYS.contains(&key)
            && !frame.param(1).trim().parse::<f64>().is_ok_and(is_drive_limit)
        {
            return Response::error("INVALID_PARAMETERS");
        }
        match self.store.set_raw(key, frame.param(1)) {
            Ok(()) => {
                self.apply_live(key);
                Response::ok("VALUE_SET")
            }
            Err(StoreError::Full) => Response::error("STORE_FULL"),
            Err(e) => {
                warn!(key, error = %e, "store set failed");
                Response::error("SET_FAILED")
            }
        }
    }

    fn save(&mut self) -> Response {
        match self.store.save() {
            Ok(()) => {
                info!("configuration saved");
                Response::ok("CONFIG_SAVED")
            }
            Err(e) => {
                warn!(error = %e, "configuration save failed");
                Response::error("CONFIG_SAVE_FAILED")
            }
        }
    }

    fn apply_live(&mut self, key: &str) {
        let values = StartupValues::from_store(self.store.as_ref());
        match key {
            "velocity_x" | "velocity_y" | "velocity_z" => {
                let [vx, vy, vz] = values.velocity;
                self.engine.set_velocity(vx, vy, vz);
            }
            "acceleration" => self.engine.set_acceleration(values.acceleration),
            "tilt_min" | "tilt_max" => {
                if let Err(e) = self.engine.set_tilt_limits(values.tilt_min, values.tilt_max) {
                    warn!(error = %e, "tilt limits not applied");
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::test_support::Bench;
    use maquette_common::consts::MAX_STORE_ITEMS;
    use maquette_common::hal::types::Axis;
    use maquette_common::store::{MemoryConfigStore, TomlFileStore};

    #[test]
    fn startup_values_come_from_store() {
        let mut store = MemoryConfigStore::new();
        store.set_float("velocity_y", 4_000.0).unwrap();
        store.set_int("acceleration", 50_000).unwrap();
        store.set_float("tilt_min", 30.0).unwrap();
        let b = Bench::with_store(store);
        let engine = b.dispatcher.engine();
        assert_eq!(engine.axis_state(Axis::Y).map(|s| s.velocity_limit), Some(4_000.0));
        assert_eq!(engine.axis_state(Axis::X).map(|s| s.velocity_limit), Some(DEFAULT_VELOCITY));
        assert_eq!(engine.axis_state(Axis::Z).map(|s| s.acceleration_limit), Some(50_000.0));
        assert_eq!(engine.tilt_state().min, 30.0);
    }

    #[test]
    fn invalid_stored_tilt_limits_are_ignored() {
        let mut store = MemoryConfigStore::new();
        store.set_float("tilt_min", 150.0).unwrap();
        let b = Bench::with_store(store);
        let tilt = b.dispatcher.engine().tilt_state();
        assert_eq!((tilt.min, tilt.max), (DEFAULT_TILT_MIN, DEFAULT_TILT_MAX));
    }

    #[test]
    fn set_get_and_list() {
        let mut b = Bench::new();
        assert_eq!(b.send("SET:operator"), "ERROR:MISSING_PARAMS\n");
        assert_eq!(b.send("SET:operator,bench"), "OK:VALUE_SET\n");
        assert_eq!(b.send("SET:gain,2.5"), "OK:VALUE_SET\n");
        assert_eq!(b.send("GET:operator"), "OK:bench\n");
        assert_eq!(b.send("GET:gain"), "OK:2.5\n");
        assert_eq!(b.send("GET:nothing"), "ERROR:KEY_NOT_FOUND\n");
        assert_eq!(b.send("GET"), "ERROR:MISSING_KEY\n");
        assert_eq!(b.send("CONFIG:LIST"), "OK:gain,operator\n");
    }

    #[test]
    fn set_applies_live_values() {
        let mut b = Bench::new();
        assert_eq!(b.send("SET:tilt_max,100"), "OK:VALUE_SET\n");
        assert_eq!(b.send("TILT:120"), "OK:TILT_SET\n");
        assert_eq!(b.dispatcher.engine().position().tilt, 100.0);

        b.send("SET:velocity_x,2500");
        let engine = b.dispatcher.engine();
        assert_eq!(engine.axis_state(Axis::Pan).map(|s| s.velocity_limit), Some(2_500.0));
    }

    #[test]
    fn drive_limits_must_be_positive() {
        let mut b = Bench::new();
        for line in [
            "SET:velocity_x,0",
            "SET:velocity_y,-5",
            "SET:velocity_z,nan",
            "SET:acceleration,inf",
            "SET:velocity_x,fast",
        ] {
            assert_eq!(b.send(line), "ERROR:INVALID_PARAMETERS\n", "{line}");
        }
        assert_eq!(b.send("GET:velocity_x"), "ERROR:KEY_NOT_FOUND\n");
        let engine = b.dispatcher.engine();
        assert_eq!(engine.axis_state(Axis::X).map(|s| s.velocity_limit), Some(DEFAULT_VELOCITY));
        assert_eq!(b.send("SET:acceleration,40000"), "OK:VALUE_SET\n");
    }

    #[test]
    fn store_full_is_reported() {
        let mut b = Bench::new();
        for i in 0..MAX_STORE_ITEMS {
            assert_eq!(b.send(&format!("SET:k{i},{i}")), "OK:VALUE_SET\n");
        }
        assert_eq!(b.send("SET:one_more,1"), "ERROR:STORE_FULL\n");
        assert_eq!(b.send("SET:k0,7"), "OK:VALUE_SET\n");
    }

    #[test]
    fn config_subcommands() {
        let mut b = Bench::new();
        assert_eq!(b.send("CONFIG"), "ERROR:MISSING_CONFIG_COMMAND\n");
        assert_eq!(b.send("CONFIG:WIPE"), "ERROR:INVALID_CONFIG_COMMAND\n");
        assert_eq!(b.send("CONFIG:LOAD"), "OK:CONFIG_LOADED\n");
        assert_eq!(b.send("CONFIG:SAVE"), "OK:CONFIG_SAVED\n");
        assert_eq!(b.send("SAVE"), "OK:CONFIG_SAVED\n");
    }

    #[test]
    fn saved_values_survive_reload_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maquette_store.toml");

        let mut b = Bench::with_store(TomlFileStore::new(&path));
        assert_eq!(b.send("SET:tilt_min,60"), "OK:VALUE_SET\n");
        assert_eq!(b.send("SET:operator,bench"), "OK:VALUE_SET\n");
        assert_eq!(b.send("SAVE"), "OK:CONFIG_SAVED\n");

        let mut b = Bench::with_store(TomlFileStore::open(&path).unwrap());
        assert_eq!(b.send("GET:operator"), "OK:bench\n");
        assert_eq!(b.dispatcher.engine().tilt_state().min, 60.0);

        std::fs::write(&path, "tilt_min = 50.0\n").unwrap();
        assert_eq!(b.send("CONFIG:LOAD"), "OK:CONFIG_LOADED\n");
        assert_eq!(b.dispatcher.engine().tilt_state().min, 50.0);
        assert_eq!(b.send("GET:operator"), "ERROR:KEY_NOT_FOUND\n");
    }

    #[test]
    fn load_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        let mut b = Bench::with_store(TomlFileStore::new(&path));
        std::fs::write(&path, "not toml at all [").unwrap();
        assert_eq!(b.send("CONFIG:LOAD"), "ERROR:CONFIG_LOAD_FAILED\n");
    }
}
