//! Idempotency guard for collision resolution
//!
//! The same physical contact is seen on many consecutive frames until the
//! resulting mutation propagates. A key is blocked while its mutation is in
//! flight and for a debounce window after it resolved, so one contact yields
//! one mutation regardless of frame rate.

use std::collections::HashSet;

use super::schedule::Scheduler;
use crate::tuning::Tuning;

#[derive(Debug, Clone)]
enum Release {
    InFlight(String),
    Recent(String),
}

/// In-flight and recently-resolved collision keys
#[derive(Debug, Clone)]
pub struct IdempotencyGuard {
    in_flight: HashSet<String>,
    recent: HashSet<String>,
    timers: Scheduler<Release>,
    in_flight_window_ms: f64,
    recent_window_ms: f64,
}

impl IdempotencyGuard {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            in_flight: HashSet::new(),
            recent: HashSet::new(),
            timers: Scheduler::new(),
            in_flight_window_ms: tuning.in_flight_window_ms,
            recent_window_ms: tuning.recent_window_ms,
        }
    }

    pub fn is_blocked(&self, key: &str) -> bool {
        self.in_flight.contains(key) || self.recent.contains(key)
    }

    /// Claim a key; false if it is already in flight or debounced
    pub fn try_begin(&mut self, key: &str) -> bool {
        if self.is_blocked(key) {
            return false;
        }
        self.in_flight.insert(key.to_owned());
        true
    }

    /// The mutation for `key` was issued at `now`
    pub fn settle(&mut self, key: &str, now: f64) {
        self.recent.insert(key.to_owned());
        self.timers
            .schedule(now, self.in_flight_window_ms, Release::InFlight(key.to_owned()));
        self.timers
            .schedule(now, self.recent_window_ms, Release::Recent(key.to_owned()));
    }

    /// The resolver declined; release the key immediately
    pub fn abandon(&mut self, key: &str) {
        self.in_flight.remove(key);
    }

    /// Release every key whose window has passed
    pub fn advance(&mut self, now: f64) {
        for release in self.timers.drain_due(now) {
            match release {
                Release::InFlight(key) => {
                    self.in_flight.remove(&key);
                }
                Release::Recent(key) => {
                    self.recent.remove(&key);
                }
            }
        }
    }

    /// Cancel outstanding timers and forget all keys
    pub fn teardown(&mut self) {
        let dropped = self.timers.cancel_all();
        if dropped > 0 {
            log::debug!("Guard teardown cancelled {} timers", dropped);
        }
        self.in_flight.clear();
        self.recent.clear();
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }
}
