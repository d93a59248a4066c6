//! Insertion-ordered timestamp log for one event kind.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Recent occurrences of one event kind.
///
/// The sequence is kept non-decreasing: [`push`](Self::push) never lets
/// an entry land before the current tail, so eviction only ever has to
/// trim the head.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    times: VecDeque<DateTime<Utc>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `at`, raised to the current tail if it is older.
    ///
    /// Returns the timestamp actually stored.
    pub fn push(&mut self, at: DateTime<Utc>) -> DateTime<Utc> {
        let at = match self.times.back() {
            Some(last) if *last > at => *last,
            _ => at,
        };
        self.times.push_back(at);
        at
    }

    /// Drops every entry older than or equal to `cutoff` from the head.
    ///
    /// Stops at the first live entry; returns how many were removed.
    pub fn evict_through(&mut self, cutoff: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        while self.times.front().is_some_and(|t| *t <= cutoff) {
            self.times.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn clear(&mut self) {
        self.times.clear();
    }

    #[cfg(test)]
    pub fn oldest(&self) -> Option<DateTime<Utc>> {
        self.times.front().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_evict_trims_prefix_only() {
        let mut log = EventLog::new();
        for secs in [0, 10, 50, 70] {
            log.push(at(secs));
        }

        let evicted = log.evict_through(at(10));
        assert_eq!(evicted, 2);
        assert_eq!(log.len(), 2);
        assert_eq!(log.oldest(), Some(at(50)));
    }

    #[test]
    fn test_evict_on_empty_log() {
        let mut log = EventLog::new();
        assert_eq!(log.evict_through(at(100)), 0);
        assert!(log.is_empty());
    }

    #[test]
    fn test_evict_keeps_entries_after_cutoff() {
        let mut log = EventLog::new();
        log.push(at(5));
        log.push(at(5) + Duration::milliseconds(1));

        assert_eq!(log.evict_through(at(5)), 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_push_never_goes_behind_tail() {
        let mut log = EventLog::new();
        assert_eq!(log.push(at(20)), at(20));
        assert_eq!(log.push(at(5)), at(20));
        assert_eq!(log.push(at(30)), at(30));

        // The late entry is trimmed together with its predecessor
        assert_eq!(log.evict_through(at(20)), 2);
        assert_eq!(log.oldest(), Some(at(30)));
    }

    #[test]
    fn test_clear() {
        let mut log = EventLog::new();
        log.push(at(1));
        log.push(at(2));
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.oldest(), None);
    }
}
