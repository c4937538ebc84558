//! Runtime configuration (`maquette.toml`).
//!
//! ```toml
//! [shared]
//! log_level = "info"
//! service_name = "maquette"
//!
//! [transport]
//! bind = "0.0.0.0:8888"
//! connection_timeout_ms = 60000
//! heartbeat_interval_ms = 10000
//! auto_reconnect = true
//! max_reconnect_attempts = 5
//! relisten_interval_ms = 30000
//!
//! [motion]
//! pan_counts_per_degree = 100.0
//!
//! [interlock]
//! active_low = true
//!
//! [loop]
//! cycle_period_ms = 5
//!
//! [store]
//! path = "maquette_store.toml"
//! ```
//!
//! Every section and field is optional. Values that only the key/value
//! store carries (velocities, acceleration, tilt limits) are not part of
//! this file.

use crate::motion::MotionSettings;
use crate::transport::TransportSettings;
use maquette_common::config::{ConfigError, SharedConfig};
use maquette_common::consts::{
    DEFAULT_COMMAND_PORT, DEFAULT_CONNECTION_TIMEOUT_MS, DEFAULT_ENABLE_TIMEOUT_MS,
    DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_HOMING_CHUNK_COUNTS, DEFAULT_HOMING_TIMEOUT_MS,
    DEFAULT_HOMING_VELOCITY, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECOVERY_PAUSE_MS,
    DEFAULT_TILT_HOME, TILT_RANGE_MAX,
};
use maquette_hal::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ─── Root ───────────────────────────────────────────────────────────

/// Complete runtime configuration of the `maquette` binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub shared: SharedConfig,
    pub transport: TransportConfig,
    pub motion: MotionConfig,
    pub interlock: InterlockConfig,
    #[serde(rename = "loop")]
    pub cycle: LoopConfig,
    pub store: StoreConfig,
    pub simulation: SimulationConfig,
}

impl ControlConfig {
    /// Check semantic constraints the types cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let t = &self.transport;
        if t.bind.trim().is_empty() {
            return Err(invalid("transport.bind cannot be empty"));
        }
        if t.connection_timeout_ms == 0 {
            return Err(invalid("transport.connection_timeout_ms must be > 0"));
        }
        if t.max_reconnect_attempts == 0 {
            return Err(invalid("transport.max_reconnect_attempts must be > 0"));
        }
        if t.relisten_interval_ms == 0 {
            return Err(invalid("transport.relisten_interval_ms must be > 0"));
        }

        let m = &self.motion;
        if m.enable_timeout_ms == 0 {
            return Err(invalid("motion.enable_timeout_ms must be > 0"));
        }
        if m.homing_velocity.is_nan() || m.homing_velocity <= 0.0 {
            return Err(invalid("motion.homing_velocity must be > 0"));
        }
        if m.homing_chunk_counts <= 0 {
            return Err(invalid("motion.homing_chunk_counts must be > 0"));
        }
        if m.pan_counts_per_degree.is_nan() || m.pan_counts_per_degree <= 0.0 {
            return Err(invalid("motion.pan_counts_per_degree must be > 0"));
        }
        if !(0.0..=TILT_RANGE_MAX).contains(&m.tilt_home) {
            return Err(invalid(format!(
                "motion.tilt_home must be within [0, {TILT_RANGE_MAX}], got {}",
                m.tilt_home
            )));
        }

        if self.cycle.cycle_period_ms == 0 {
            return Err(invalid("loop.cycle_period_ms must be > 0"));
        }
        if self.store.path.as_os_str().is_empty() {
            return Err(invalid("store.path cannot be empty"));
        }
        Ok(())
    }

    pub fn to_motion_settings(&self) -> MotionSettings {
        let m = &self.motion;
        MotionSettings {
            enable_timeout: Duration::from_millis(m.enable_timeout_ms),
            recovery_pause: Duration::from_millis(m.recovery_pause_ms),
            homing_velocity: m.homing_velocity,
            homing_chunk_counts: m.homing_chunk_counts,
            homing_timeout: (m.homing_timeout_ms > 0)
                .then(|| Duration::from_millis(m.homing_timeout_ms)),
            pan_counts_per_degree: m.pan_counts_per_degree,
            tilt_home: m.tilt_home,
        }
    }

    /// Transport settings. The backoff table keeps its built-in values.
    pub fn to_transport_settings(&self) -> TransportSettings {
        let t = &self.transport;
        TransportSettings {
            connection_timeout: Duration::from_millis(t.connection_timeout_ms),
            heartbeat_interval: Duration::from_millis(t.heartbeat_interval_ms),
            auto_reconnect: t.auto_reconnect,
            max_reconnect_attempts: t.max_reconnect_attempts,
            ..TransportSettings::default()
        }
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(msg.into())
}

// ─── Sections ───────────────────────────────────────────────────────

/// `[transport]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Listen address of the command port.
    pub bind: String,
    pub connection_timeout_ms: u64,
    /// Zero disables heartbeats.
    pub heartbeat_interval_ms: u64,
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
    /// Period of `connect()` retries once reconnects are exhausted.
    pub relisten_interval_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind: format!("0.0.0.0:{DEFAULT_COMMAND_PORT}"),
            connection_timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            auto_reconnect: true,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            relisten_interval_ms: 30_000,
        }
    }
}

/// `[motion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub enable_timeout_ms: u64,
    pub recovery_pause_ms: u64,
    /// Counts/s.
    pub homing_velocity: f64,
    pub homing_chunk_counts: i32,
    /// Zero disables the pan homing deadline.
    pub homing_timeout_ms: u64,
    pub pan_counts_per_degree: f64,
    pub tilt_home: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            enable_timeout_ms: DEFAULT_ENABLE_TIMEOUT_MS,
            recovery_pause_ms: DEFAULT_RECOVERY_PAUSE_MS,
            homing_velocity: DEFAULT_HOMING_VELOCITY,
            homing_chunk_counts: DEFAULT_HOMING_CHUNK_COUNTS,
            homing_timeout_ms: DEFAULT_HOMING_TIMEOUT_MS,
            pan_counts_per_degree: 1.0,
            tilt_home: DEFAULT_TILT_HOME,
        }
    }
}

/// `[interlock]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterlockConfig {
    /// A healthy e-stop line reads high.
    pub active_low: bool,
}

impl Default for InterlockConfig {
    fn default() -> Self {
        Self { active_low: true }
    }
}

/// `[loop]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub cycle_period_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self { cycle_period_ms: 5 }
    }
}

impl LoopConfig {
    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_period_ms)
    }
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Key/value store file.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("maquette_store.toml"),
        }
    }
}
