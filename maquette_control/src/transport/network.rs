//! Connection state machine.

use super::backoff::ReconnectBackoff;
use super::pending::PendingWrites;
use super::stats::TransportStats;
use super::stream::{PeerListener, PeerStream};
use super::{ConnectionState, TransportError, TransportErrorCode, TransportSettings};
use maquette_common::consts::{HEARTBEAT_MARKER, PENDING_WRITE_CHUNK};
use std::io;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What happened to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Handed to the peer in full.
    Sent,
    /// Held in the pending queue, fully or in part.
    Queued,
}

/// How the transport looks for a peer while not connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seeking {
    /// Accept on every update.
    Listening,
    /// A connection was lost: accept only when the backoff allows.
    Reconnecting,
    /// Attempt cap reached: wait for a manual `connect()`.
    Parked,
}

/// Single-peer transport over a [`PeerListener`].
pub struct NetworkTransport<L: PeerListener> {
    listener: L,
    stream: Option<L::Stream>,
    settings: TransportSettings,
    state: ConnectionState,
    seeking: Seeking,
    last_error: TransportErrorCode,
    stats: TransportStats,
    pending: PendingWrites,
    backoff: ReconnectBackoff,
    last_activity: Option<Instant>,
    last_heartbeat: Option<Instant>,
    connected_since: Option<Instant>,
}

impl<L: PeerListener> NetworkTransport<L> {
    pub fn new(listener: L, settings: TransportSettings) -> Self {
        let backoff =
            ReconnectBackoff::new(settings.backoff.clone(), settings.max_reconnect_attempts);
        info!(
            addr = %listener.local_addr(),
            timeout_ms = settings.connection_timeout.as_millis() as u64,
            heartbeat_ms = settings.heartbeat_interval.as_millis() as u64,
            auto_reconnect = settings.auto_reconnect,
            "transport created"
        );
        Self {
            listener,
            stream: None,
            settings,
            state: ConnectionState::Disconnected,
            seeking: Seeking::Listening,
            last_error: TransportErrorCode::None,
            stats: TransportStats::default(),
            pending: PendingWrites::new(),
            backoff,
            last_activity: None,
            last_heartbeat: None,
            connected_since: None,
        }
    }

    // ─── Housekeeping ───────────────────────────────────────────────

    /// Run timeout, heartbeat and accept/reconnect handling once.
    pub fn update(&mut self, now: Instant) {
        if self.stream.is_some() {
            self.check_timeout(now);
        }
        if self.stream.is_some() {
            if !self.pending.is_empty() {
                self.flush_pending(now);
            }
            self.heartbeat(now);
            return;
        }

        match self.seeking {
            Seeking::Listening => {
                self.try_accept(now, ConnectionState::Connecting);
            }
            Seeking::Reconnecting => self.try_reconnect(now),
            Seeking::Parked => {}
        }
    }

    fn check_timeout(&mut self, now: Instant) {
        let idle = self
            .last_activity
            .map_or(Duration::ZERO, |t| now.saturating_duration_since(t));
        if idle > self.settings.connection_timeout {
            self.set_state(ConnectionState::Timeout);
            warn!(idle_ms = idle.as_millis() as u64, "connection timed out");
            self.drop_link(now, TransportErrorCode::Timeout);
        }
    }

    fn heartbeat(&mut self, now: Instant) {
        let interval = self.settings.heartbeat_interval;
        if interval.is_zero() || !self.pending.is_empty() {
            return;
        }
        let due = self
            .last_heartbeat
            .is_none_or(|t| now.saturating_duration_since(t) >= interval);
        if !due {
            return;
        }
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        match stream.write(&HEARTBEAT_MARKER) {
            Ok(n) if n == HEARTBEAT_MARKER.len() => {
                self.stats.bytes_sent += n as u64;
                self.last_heartbeat = Some(now);
                debug!("heartbeat sent");
            }
            Ok(n) => {
                // A partial marker would corrupt the line stream.
                self.stats.bytes_sent += n as u64;
                warn!(written = n, "heartbeat truncated");
                self.drop_link(now, TransportErrorCode::SendFailed);
            }
            Err(e) if is_transient(&e) => {}
            Err(e) => {
                warn!(error = %e, "heartbeat failed");
                self.drop_link(now, TransportErrorCode::SendFailed);
            }
        }
    }

    fn try_accept(&mut self, now: Instant, via: ConnectionState) -> bool {
        match self.listener.accept() {
            Ok(Some(stream)) => {
                self.set_state(via);
                self.on_connected(stream, now);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "accept failed");
                self.record_error(TransportErrorCode::LinkDown);
                false
            }
        }
    }

    fn try_reconnect(&mut self, now: Instant) {
        if !self.backoff.is_due(now) {
            return;
        }
        self.backoff.record_attempt(now);
        self.stats.reconnect_attempts += 1;
        self.set_state(ConnectionState::Reconnecting);

        if self.try_accept(now, ConnectionState::Reconnecting) {
            self.stats.reconnect_successes += 1;
            info!("reconnected");
            return;
        }

        self.record_error(TransportErrorCode::ReconnectFailed);
        if self.backoff.is_exhausted() {
            warn!(
                attempts = self.backoff.attempts(),
                "reconnect attempts exhausted, waiting for manual connect"
            );
            self.seeking = Seeking::Parked;
            self.set_state(ConnectionState::Disconnected);
        } else {
            debug!(
                attempt = self.backoff.attempts(),
                next_in_ms = self.backoff.delay().as_millis() as u64,
                "reconnect attempt failed"
            );
        }
    }

    fn on_connected(&mut self, stream: L::Stream, now: Instant) {
        info!(peer = %stream.peer(), "peer connected");
        self.stream = Some(stream);
        self.set_state(ConnectionState::Connected);
        self.seeking = Seeking::Listening;
        self.backoff.reset();
        self.stats.connection_count += 1;
        self.last_activity = Some(now);
        self.last_heartbeat = Some(now);
        self.connected_since = Some(now);
        if !self.pending.is_empty() {
            self.flush_pending(now);
        }
    }

    /// Forget the peer and start looking for the next one.
    fn drop_link(&mut self, now: Instant, code: TransportErrorCode) {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown();
            info!(peer = %stream.peer(), reason = %code, "peer dropped");
        }
        self.record_error(code);
        self.connected_since = None;
        self.set_state(ConnectionState::Disconnected);
        if self.settings.auto_reconnect {
            self.seeking = Seeking::Reconnecting;
            self.backoff.reset();
            self.try_reconnect(now);
        } else {
            self.seeking = Seeking::Listening;
        }
    }

    /// Replay queued chunks in order. Stops at the first chunk that
    /// does not go out in full and reports `false`.
    fn flush_pending(&mut self, now: Instant) -> bool {
        let queued = self.pending.len();
        while let Some(chunk) = self.pending.front() {
            let Some(stream) = self.stream.as_mut() else {
                return false;
            };
            let len = chunk.len();
            match stream.write(chunk) {
                Ok(n) => {
                    self.stats.bytes_sent += n as u64;
                    self.pending.consume_front(n);
                    if n > 0 {
                        self.last_activity = Some(now);
                    }
                    if n < len {
                        warn!(left = self.pending.len(), "pending replay partial");
                        return false;
                    }
                }
                Err(e) if is_transient(&e) => return false,
                Err(e) => {
                    warn!(error = %e, "pending replay failed");
                    self.drop_link(now, TransportErrorCode::SendFailed);
                    return false;
                }
            }
        }
        if queued > 0 {
            info!(chunks = queued, "pending writes replayed");
        }
        true
    }

    // ─── I/O ────────────────────────────────────────────────────────

    /// Read available bytes. Returns 0 when disconnected or idle.
    pub fn read(&mut self, now: Instant, buf: &mut [u8]) -> Result<usize, TransportError> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(0);
        };
        match stream.read(buf) {
            Ok(0) if !buf.is_empty() => {
                self.drop_link(now, TransportErrorCode::ClientDisconnected);
                Ok(0)
            }
            Ok(n) => {
                self.stats.bytes_received += n as u64;
                self.last_activity = Some(now);
                Ok(n)
            }
            Err(e) if is_transient(&e) => Ok(0),
            Err(e) => {
                self.drop_link(now, TransportErrorCode::ClientDisconnected);
                Err(e.into())
            }
        }
    }

    /// Write `bytes`, or queue them when they cannot go out now.
    ///
    /// Queued data is always sent before anything written later. A write
    /// longer than one queue slot is refused whole, since a short write
    /// could not queue its remainder.
    pub fn write(&mut self, now: Instant, bytes: &[u8]) -> Result<WriteOutcome, TransportError> {
        if bytes.is_empty() {
            return Ok(WriteOutcome::Sent);
        }
        if bytes.len() > PENDING_WRITE_CHUNK {
            let e = TransportError::ChunkTooLarge(bytes.len());
            warn!(len = bytes.len(), "write larger than a queue slot refused");
            self.record_error(e.code());
            return Err(e);
        }
        if self.stream.is_some() && !self.pending.is_empty() {
            self.flush_pending(now);
        }
        if self.stream.is_none() || !self.pending.is_empty() {
            return self.enqueue(bytes);
        }

        let Some(stream) = self.stream.as_mut() else {
            return self.enqueue(bytes);
        };
        match stream.write(bytes) {
            Ok(n) if n == bytes.len() => {
                self.stats.bytes_sent += n as u64;
                self.last_activity = Some(now);
                Ok(WriteOutcome::Sent)
            }
            Ok(n) => {
                self.stats.bytes_sent += n as u64;
                if n > 0 {
                    self.last_activity = Some(now);
                }
                debug!(written = n, total = bytes.len(), "short write, rest queued");
                self.enqueue(&bytes[n..])
            }
            Err(e) if is_transient(&e) => self.enqueue(bytes),
            Err(e) => {
                warn!(error = %e, "send failed");
                let queued = self.enqueue(bytes);
                self.drop_link(now, TransportErrorCode::SendFailed);
                queued
            }
        }
    }

    fn enqueue(&mut self, bytes: &[u8]) -> Result<WriteOutcome, TransportError> {
        match self.pending.push(bytes) {
            Ok(()) => Ok(WriteOutcome::Queued),
            Err(e) => {
                warn!(len = bytes.len(), error = %e, "write dropped");
                self.record_error(e.code());
                Err(e)
            }
        }
    }

    // ─── Manual control ─────────────────────────────────────────────

    /// Accept a waiting peer now, clearing an exhausted reconnect cycle.
    pub fn connect(&mut self, now: Instant) -> bool {
        if self.stream.is_some() {
            return true;
        }
        self.backoff.reset();
        self.seeking = Seeking::Listening;
        self.set_state(ConnectionState::Connecting);
        if self.try_accept(now, ConnectionState::Connecting) {
            return true;
        }
        self.set_state(ConnectionState::Disconnected);
        false
    }

    /// Close the current peer. Reconnect counters are cleared and the
    /// transport goes back to plain listening.
    pub fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown();
            info!(peer = %stream.peer(), "peer disconnected");
        }
        self.connected_since = None;
        self.backoff.reset();
        self.seeking = Seeking::Listening;
        self.set_state(ConnectionState::Disconnected);
    }

    pub fn set_connection_timeout(&mut self, timeout: Duration) {
        self.settings.connection_timeout = timeout;
    }

    pub fn set_heartbeat_interval(&mut self, interval: Duration) {
        self.settings.heartbeat_interval = interval;
    }

    pub fn set_auto_reconnect(&mut self, enabled: bool) {
        self.settings.auto_reconnect = enabled;
        if !enabled && self.seeking == Seeking::Reconnecting {
            self.seeking = Seeking::Listening;
        }
    }

    pub fn reset_stats(&mut self) {
        self.stats = TransportStats::default();
    }

    pub fn clear_error(&mut self) {
        self.last_error = TransportErrorCode::None;
    }

    // ─── Queries ────────────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Reconnect attempts ran out; only `connect()` resumes accepting.
    pub fn is_exhausted(&self) -> bool {
        self.seeking == Seeking::Parked
    }

    pub fn last_error(&self) -> TransportErrorCode {
        self.last_error
    }

    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    pub fn pending_chunks(&self) -> usize {
        self.pending.len()
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// One-line summary of state, error, counters and queue depth.
    pub fn diagnostics(&self, now: Instant) -> String {
        let connected_for = self
            .connected_since
            .map_or(0, |t| now.saturating_duration_since(t).as_secs());
        format!(
            "state={} addr={} error=\"{}\" {} pending={} connected_for={}s",
            self.state,
            self.listener.local_addr(),
            self.last_error,
            self.stats,
            self.pending.len(),
            connected_for
        )
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "transport state");
            self.state = state;
        }
    }

    fn record_error(&mut self, code: TransportErrorCode) {
        self.last_error = code;
        self.stats.error_count += 1;
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

impl<L: PeerListener> std::fmt::Debug for NetworkTransport<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkTransport")
            .field("state", &self.state)
            .field("seeking", &self.seeking)
            .field("last_error", &self.last_error)
            .field("stats", &self.stats)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
