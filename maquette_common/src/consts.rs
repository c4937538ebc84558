//! Rig-wide constants for the maquette workspace.
//!
//! Single source of truth for protocol limits, motion defaults and
//! transport timing. Imported by all crates, no duplication permitted.

use static_assertions::const_assert;

// ─── Protocol ───────────────────────────────────────────────────────

/// Line buffer capacity in bytes, terminator excluded.
pub const FRAME_BUFFER_CAPACITY: usize = 63;

/// Maximum number of positional parameters kept per frame.
pub const MAX_FRAME_PARAMS: usize = 10;

/// Maximum response body length in characters.
pub const MAX_RESPONSE_BODY: usize = 63;

/// CRC-16 seed.
pub const CRC16_SEED: u16 = 0xFFFF;

/// CRC-16 reflected polynomial (CRC-16/ARC family).
pub const CRC16_POLY: u16 = 0xA001;

// ─── Motion ─────────────────────────────────────────────────────────

/// Default linear/pan velocity limit in counts/s.
pub const DEFAULT_VELOCITY: f64 = 10_000.0;

/// Default acceleration limit in counts/s².
pub const DEFAULT_ACCELERATION: f64 = 100_000.0;

/// Default lower tilt clamp in degrees.
pub const DEFAULT_TILT_MIN: f32 = 45.0;

/// Default upper tilt clamp in degrees.
pub const DEFAULT_TILT_MAX: f32 = 135.0;

/// Default tilt home (center) angle in degrees.
pub const DEFAULT_TILT_HOME: f32 = 90.0;

/// Absolute tilt mechanical range in degrees.
pub const TILT_RANGE_MAX: f32 = 180.0;

/// Time allowed for an actuator to report ready after energizing.
pub const DEFAULT_ENABLE_TIMEOUT_MS: u64 = 5_000;

/// Pause between de-energize and re-energize during fault recovery.
pub const DEFAULT_RECOVERY_PAUSE_MS: u64 = 10;

/// Reduced velocity used while searching for the pan home flag.
pub const DEFAULT_HOMING_VELOCITY: f64 = 5_000.0;

/// Relative move size issued per pan homing search chunk.
pub const DEFAULT_HOMING_CHUNK_COUNTS: i32 = 1_000;

/// Overall pan homing deadline. Zero disables it.
pub const DEFAULT_HOMING_TIMEOUT_MS: u64 = 0;

// ─── Transport ──────────────────────────────────────────────────────

/// Default inactivity timeout before a connection is declared dead.
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 60_000;

/// Default heartbeat period while connected.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 10_000;

/// Liveness marker written on every heartbeat.
pub const HEARTBEAT_MARKER: [u8; 4] = [0xFF, 0xFE, 0xFD, 0xFC];

/// Reconnect backoff table, indexed by consecutive attempt count.
pub const RECONNECT_BACKOFF_MS: [u64; 5] = [1_000, 2_000, 5_000, 10_000, 30_000];

/// Consecutive reconnect attempts before the transport gives up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Number of chunks the pending-write queue can hold.
pub const PENDING_WRITE_SLOTS: usize = 16;

/// Largest single chunk accepted into the pending-write queue.
pub const PENDING_WRITE_CHUNK: usize = 256;

/// Default TCP port for the command listener.
pub const DEFAULT_COMMAND_PORT: u16 = 8888;

// ─── Configuration store ────────────────────────────────────────────

/// Maximum number of key/value items in the configuration store.
pub const MAX_STORE_ITEMS: usize = 50;

const_assert!(FRAME_BUFFER_CAPACITY <= MAX_RESPONSE_BODY);
const_assert!(RECONNECT_BACKOFF_MS.len() > 0);
const_assert!(PENDING_WRITE_CHUNK > FRAME_BUFFER_CAPACITY + 8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_table_is_ascending() {
        assert!(RECONNECT_BACKOFF_MS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn tilt_defaults_are_consistent() {
        assert!(DEFAULT_TILT_MIN >= 0.0);
        assert!(DEFAULT_TILT_MIN < DEFAULT_TILT_MAX);
        assert!(DEFAULT_TILT_MAX <= TILT_RANGE_MAX);
        assert!((DEFAULT_TILT_MIN..=DEFAULT_TILT_MAX).contains(&DEFAULT_TILT_HOME));
    }

    #[test]
    fn homing_is_slower_than_default_motion() {
        assert!(DEFAULT_HOMING_VELOCITY < DEFAULT_VELOCITY);
    }
}
