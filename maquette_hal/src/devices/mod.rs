//! Serial peripheral consumers.
//!
//! The tilt servo controller and the rangefinder share one half-duplex
//! serial channel. Each consumer selects its peer, writes a request line
//! and waits a bounded time for a reply line.

mod line;
pub mod rangefinder;
pub mod tilt_servo;

pub use rangefinder::MuxRangefinder;
pub use tilt_servo::MuxTiltServo;

use maquette_common::hal::driver::DeviceMux;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Multiplexer shared by every consumer on the channel.
pub type SharedMux = Arc<Mutex<dyn DeviceMux>>;

/// Wrap a multiplexer for sharing between consumers.
pub fn share_mux<M: DeviceMux + 'static>(mux: M) -> SharedMux {
    Arc::new(Mutex::new(mux))
}

/// Default time a peer has to answer a request.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(1);
