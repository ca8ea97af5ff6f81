//! # Fibonacci Backoff
//!
//! Retry delays for clusters whose reconcile keeps failing. Delays follow the
//! Fibonacci sequence scaled by the minimum (min, min, 2·min, 3·min, 5·min, ...)
//! and are capped at the maximum.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_secs: u64,
    max_secs: u64,
    previous: u64,
    current: u64,
}

impl FibonacciBackoff {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        let min_secs = min_secs.max(1);
        Self {
            min_secs,
            max_secs: max_secs.max(min_secs),
            previous: 0,
            current: 1,
        }
    }

    /// Next delay in seconds, advancing the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let delay = self.current.saturating_mul(self.min_secs).min(self.max_secs);
        if delay < self.max_secs {
            let next = self.previous.saturating_add(self.current);
            self.previous = self.current;
            self.current = next;
        }
        delay
    }

    pub fn reset(&mut self) {
        self.previous = 0;
        self.current = 1;
    }

    /// Delay for the `error_count`-th consecutive error (0-indexed)
    pub fn calculate_for_error_count(error_count: u32, min_secs: u64, max_secs: u64) -> Duration {
        let mut backoff = Self::new(min_secs, max_secs);
        let mut delay = backoff.next_backoff_seconds();
        for _ in 0..error_count {
            delay = backoff.next_backoff_seconds();
        }
        Duration::from_secs(delay)
    }
}

/// Error backoff of one cluster
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
    /// No reconcile is attempted before this instant
    pub retry_at: Option<Instant>,
}

impl BackoffState {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
            retry_at: None,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    /// Record a failure and return the delay before the next attempt
    pub fn record_failure(&mut self, now: Instant) -> Duration {
        self.increment_error();
        let delay = Duration::from_secs(self.backoff.next_backoff_seconds());
        self.retry_at = Some(now + delay);
        delay
    }

    pub fn reset(&mut self) {
        self.backoff.reset();
        self.error_count = 0;
        self.retry_at = None;
    }

    pub fn is_waiting(&self, now: Instant) -> bool {
        self.retry_at.is_some_and(|retry_at| now < retry_at)
    }
}
