//! Cancellable delayed actions driven by the frame clock
//!
//! Nothing fires on its own: the owner calls [`Scheduler::drain_due`] once per
//! frame with the current time and applies whatever came due.

use std::collections::BTreeMap;

/// Handle to a scheduled action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(u64);

#[derive(Debug, Clone)]
struct Scheduled<T> {
    due: f64,
    payload: T,
}

/// Pending actions keyed by token
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    next_token: u64,
    tasks: BTreeMap<Token, Scheduled<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            next_token: 0,
            tasks: BTreeMap::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `payload` to come due `delay_ms` after `now`
    pub fn schedule(&mut self, now: f64, delay_ms: f64, payload: T) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        self.tasks.insert(
            token,
            Scheduled {
                due: now + delay_ms,
                payload,
            },
        );
        token
    }

    /// Cancel a pending action, returning its payload if it had not fired
    pub fn cancel(&mut self, token: Token) -> Option<T> {
        self.tasks.remove(&token).map(|s| s.payload)
    }

    /// Remove and return every action due at `now`, earliest first
    pub fn drain_due(&mut self, now: f64) -> Vec<T> {
        let mut due: Vec<(f64, Token)> = self
            .tasks
            .iter()
            .filter(|(_, s)| s.due <= now)
            .map(|(token, s)| (s.due, *token))
            .collect();
        due.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        due.into_iter()
            .filter_map(|(_, token)| self.tasks.remove(&token))
            .map(|s| s.payload)
            .collect()
    }

    /// Cancel everything; returns how many actions were dropped
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.tasks.len();
        self.tasks.clear();
        dropped
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_in_due_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0.0, 300.0, "late");
        scheduler.schedule(0.0, 100.0, "early");
        scheduler.schedule(50.0, 50.0, "same-as-early");
        assert!(scheduler.drain_due(99.0).is_empty());
        assert_eq!(scheduler.drain_due(100.0), vec!["early", "same-as-early"]);
        assert_eq!(scheduler.drain_due(1000.0), vec!["late"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_cancel() {
        let mut scheduler = Scheduler::new();
        let token = scheduler.schedule(0.0, 10.0, 1);
        assert_eq!(scheduler.cancel(token), Some(1));
        assert_eq!(scheduler.cancel(token), None);
        assert!(scheduler.drain_due(100.0).is_empty());
    }

    #[test]
    fn test_cancel_all() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0.0, 10.0, 'a');
        scheduler.schedule(0.0, 20.0, 'b');
        assert_eq!(scheduler.cancel_all(), 2);
        assert!(scheduler.drain_due(100.0).is_empty());
    }
}
