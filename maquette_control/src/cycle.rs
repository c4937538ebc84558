//! Cooperative control loop.
//!
//! One cycle runs these steps in order:
//!
//! 1. Interlock poll, `INFO:ESTOP_ACTIVATED` on a new trip
//! 2. Transport housekeeping (accept, timeout, heartbeat, replay)
//! 3. Byte intake: parser → dispatcher → response written back
//! 4. Motion poll, `INFO:*` notice for a finished job
//! 5. Re-listen once reconnects are exhausted
//!
//! Nothing in a cycle blocks. Pacing is up to the caller; `run` sleeps
//! out the remainder of each period.

use crate::dispatch::Dispatcher;
use crate::protocol::{CommandParser, Response};
use crate::transport::{NetworkTransport, PeerListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Bytes pulled from the transport per read call.
const READ_CHUNK: usize = 256;

/// Read calls per cycle before yielding to motion.
const MAX_READS_PER_CYCLE: usize = 16;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// Per-cycle timing statistics. O(1) per record, no allocation.
#[derive(Debug, Clone)]
pub struct CycleStats {
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: u64,
    pub min_cycle_ns: u64,
    pub max_cycle_ns: u64,
    sum_cycle_ns: u64,
    /// Cycles that took longer than the period.
    pub overruns: u64,
    pub frames: u64,
    pub notices: u64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: u64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            frames: 0,
            notices: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, duration: Duration, period: Duration) {
        let ns = duration.as_nanos() as u64;
        self.cycle_count += 1;
        self.last_cycle_ns = ns;
        self.min_cycle_ns = self.min_cycle_ns.min(ns);
        self.max_cycle_ns = self.max_cycle_ns.max(ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(ns);
        if duration > period {
            self.overruns += 1;
        }
    }

    /// Average cycle time [ns], 0 before the first cycle.
    #[inline]
    pub fn avg_cycle_ns(&self) -> u64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count
        }
    }
}

// ─── Control Loop ───────────────────────────────────────────────────

/// Transport, parser and dispatcher wired into one cycle.
pub struct ControlLoop<L: PeerListener> {
    transport: NetworkTransport<L>,
    parser: CommandParser,
    dispatcher: Dispatcher,
    stats: CycleStats,
    relisten_interval: Duration,
    exhausted_since: Option<Instant>,
}

impl<L: PeerListener> ControlLoop<L> {
    pub fn new(
        transport: NetworkTransport<L>,
        dispatcher: Dispatcher,
        relisten_interval: Duration,
    ) -> Self {
        Self {
            transport,
            parser: CommandParser::new(),
            dispatcher,
            stats: CycleStats::new(),
            relisten_interval,
            exhausted_since: None,
        }
    }

    /// Execute one cycle at `now`.
    pub fn run_cycle(&mut self, now: Instant) {
        self.dispatcher.set_now(now);

        if let Some(notice) = self.dispatcher.poll_interlock() {
            self.emit(now, &notice);
        }

        self.transport.update(now);
        self.intake(now);

        if let Some(notice) = self.dispatcher.poll_motion(now) {
            self.emit(now, &notice);
        }

        self.relisten(now);
    }

    fn intake(&mut self, now: Instant) {
        let mut buf = [0u8; READ_CHUNK];
        for _ in 0..MAX_READS_PER_CYCLE {
            let n = match self.transport.read(now, &mut buf) {
                Ok(0) => return,
                Ok(n) => n,
                Err(e) => {
                    debug!(error = %e, "read failed");
                    return;
                }
            };
            let responses = self.parser.push_bytes(&buf[..n], &mut self.dispatcher);
            self.stats.frames += responses.len() as u64;
            for response in &responses {
                self.send(now, response);
            }
        }
    }

    fn emit(&mut self, now: Instant, notice: &Response) {
        self.stats.notices += 1;
        info!(%notice, "notice");
        self.send(now, notice);
    }

    fn send(&mut self, now: Instant, response: &Response) {
        let line = response.encode();
        if let Err(e) = self.transport.write(now, line.as_bytes()) {
            warn!(error = %e, %response, "response dropped");
        }
    }

    fn relisten(&mut self, now: Instant) {
        if !self.transport.is_exhausted() {
            self.exhausted_since = None;
            return;
        }
        let since = *self.exhausted_since.get_or_insert(now);
        if now.saturating_duration_since(since) >= self.relisten_interval {
            info!("re-listening after exhausted reconnects");
            self.exhausted_since = Some(now);
            self.transport.connect(now);
        }
    }

    /// Run cycles every `period` until `running` clears. `tick` is
    /// called with the elapsed time before each cycle.
    pub fn run(&mut self, period: Duration, running: &AtomicBool, mut tick: impl FnMut(Duration)) {
        info!(period_ms = period.as_millis() as u64, "control loop running");
        let mut last = Instant::now();
        while running.load(Ordering::SeqCst) {
            let start = Instant::now();
            tick(start.saturating_duration_since(last));
            last = start;

            self.run_cycle(start);

            let elapsed = start.elapsed();
            self.stats.record(elapsed, period);
            if let Some(remaining) = period.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
        info!(
            cycles = self.stats.cycle_count,
            avg_cycle_ns = self.stats.avg_cycle_ns(),
            max_cycle_ns = self.stats.max_cycle_ns,
            overruns = self.stats.overruns,
            frames = self.stats.frames,
            "control loop stopped"
        );
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn transport(&self) -> &NetworkTransport<L> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut NetworkTransport<L> {
        &mut self.transport
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    pub fn parser(&self) -> &CommandParser {
        &self.parser
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
