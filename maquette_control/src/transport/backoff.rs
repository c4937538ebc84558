//! Reconnect backoff.
//!
//! The delay before the next attempt is `table[min(failed, len) - 1]`:
//! the first attempt after a loss is immediate, later ones wait longer
//! and the last entry repeats. After `max_attempts` consecutive failures
//! the backoff is exhausted until `reset`.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    table: Vec<Duration>,
    max_attempts: u32,
    attempts: u32,
    last_attempt: Option<Instant>,
}

impl ReconnectBackoff {
    pub fn new(table: Vec<Duration>, max_attempts: u32) -> Self {
        Self {
            table,
            max_attempts,
            attempts: 0,
            last_attempt: None,
        }
    }

    /// Wait required after the attempts made so far.
    pub fn delay(&self) -> Duration {
        match self.attempts.checked_sub(1) {
            None => Duration::ZERO,
            Some(failed) => {
                let last = self.table.len().saturating_sub(1);
                self.table
                    .get((failed as usize).min(last))
                    .copied()
                    .unwrap_or(Duration::ZERO)
            }
        }
    }

    /// An attempt may be made at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.last_attempt
            .is_none_or(|last| now.saturating_duration_since(last) >= self.delay())
    }

    pub fn record_attempt(&mut self, now: Instant) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_attempt = Some(now);
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
        self.last_attempt = None;
    }
}
