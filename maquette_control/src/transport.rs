//! Network transport for the command channel.
//!
//! A single-peer, non-blocking connection manager. Nothing here blocks:
//! accept, read and write report "no peer" or "no data" instead.
//!
//! # Connection States
//!
//! ```text
//!              accept                     peer close / send failure
//! Disconnected ──────► Connected ───────────────────────────┐
//!      ▲  ▲               │ ▲                               │
//!      │  │    inactivity │ │ backoff elapsed, accept        ▼
//!      │  │               ▼ │                         Disconnected
//!      │  └──────────  Timeout        Reconnecting ◄────────┘
//!      │                               │  (auto-reconnect)
//!      └──── attempt cap reached ──────┘
//! ```
//!
//! After the attempt cap the transport parks in `Disconnected` and only
//! a manual [`NetworkTransport::connect`] starts accepting again.
//!
//! # Pending Writes
//!
//! Writes issued while disconnected, and the unsent rest of a failed
//! write, go to a bounded FIFO replayed in order right after the next
//! connect. A full queue refuses the write.
//!
//! # Modules
//!
//! - `stream` - Listener/stream seam and the TCP implementation
//! - `memory` - In-process loopback listener for tests and `--loopback`
//! - `backoff` - Reconnect delay table and attempt cap
//! - `pending` - Pending-write FIFO
//! - `stats` - Monotonic counters
//! - `network` - The connection state machine

pub mod backoff;
pub mod memory;
pub mod network;
pub mod pending;
pub mod stats;
pub mod stream;

pub use backoff::ReconnectBackoff;
pub use memory::{MemoryClient, MemoryConnector, MemoryListener};
pub use network::{NetworkTransport, WriteOutcome};
pub use pending::PendingWrites;
pub use stats::TransportStats;
pub use stream::{PeerListener, PeerStream, TcpPeerListener, TcpPeerStream};

use maquette_common::consts::{
    DEFAULT_CONNECTION_TIMEOUT_MS, DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_MAX_RECONNECT_ATTEMPTS,
    RECONNECT_BACKOFF_MS,
};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// ─── State ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Link failure, resolved to `Disconnected` within the same call.
    Error,
    /// Inactivity timeout, resolved to `Disconnected` within the same call.
    Timeout,
    Reconnecting,
}

impl ConnectionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Error => "Error",
            Self::Timeout => "Timeout",
            Self::Reconnecting => "Reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Last error recorded by the transport, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportErrorCode {
    #[default]
    None,
    InitializationFailed,
    LinkDown,
    ClientDisconnected,
    BufferOverflow,
    SendFailed,
    Timeout,
    InvalidData,
    ReconnectFailed,
}

impl TransportErrorCode {
    pub const fn description(self) -> &'static str {
        match self {
            Self::None => "no error",
            Self::InitializationFailed => "initialization failed",
            Self::LinkDown => "physical link down",
            Self::ClientDisconnected => "client disconnected",
            Self::BufferOverflow => "buffer overflow",
            Self::SendFailed => "send failed",
            Self::Timeout => "connection timeout",
            Self::InvalidData => "invalid data",
            Self::ReconnectFailed => "reconnection failed",
        }
    }
}

impl fmt::Display for TransportErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Transport I/O failures returned to the caller.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("pending write queue is full")]
    QueueFull,

    #[error("write of {0} bytes exceeds the pending chunk size")]
    ChunkTooLarge(usize),

    #[error("peer i/o: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn code(&self) -> TransportErrorCode {
        match self {
            Self::QueueFull | Self::ChunkTooLarge(_) => TransportErrorCode::BufferOverflow,
            Self::Io(_) => TransportErrorCode::SendFailed,
        }
    }
}

// ─── Settings ───────────────────────────────────────────────────────

/// Timing and reconnect policy.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportSettings {
    /// Inactivity allowed before a connection is declared dead.
    pub connection_timeout: Duration,
    /// Heartbeat period while connected. Zero disables heartbeats.
    pub heartbeat_interval: Duration,
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
    /// Delay before the next attempt, indexed by failed attempts so far.
    pub backoff: Vec<Duration>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_millis(DEFAULT_CONNECTION_TIMEOUT_MS),
            heartbeat_interval: Duration::from_millis(DEFAULT_HEARTBEAT_INTERVAL_MS),
            auto_reconnect: true,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            backoff: RECONNECT_BACKOFF_MS
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
        }
    }
}
