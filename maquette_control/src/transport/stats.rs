//! Transport counters.

use std::fmt;

/// Monotonic counters, cleared only by `NetworkTransport::reset_stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportStats {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub connection_count: u32,
    pub error_count: u32,
    pub reconnect_attempts: u32,
    pub reconnect_successes: u32,
}

impl fmt::Display for TransportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "connections={} sent={} received={} errors={} reconnects={}/{}",
            self.connection_count,
            self.bytes_sent,
            self.bytes_received,
            self.error_count,
            self.reconnect_successes,
            self.reconnect_attempts
        )
    }
}
