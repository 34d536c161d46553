//! Bounded Ring: fixed-capacity history that never grows without limit
//!
//! Items pushed past capacity evict the oldest entry. Received and dropped
//! totals are tracked so callers can report how much history was lost.
//!
//! # Example
//!
//! ```
//! use lifeline_core_resilience::ring::BoundedRing;
//!
//! let mut ring = BoundedRing::new(2);
//! ring.push("a");
//! ring.push("b");
//! ring.push("c"); // evicts "a"
//!
//! assert_eq!(ring.len(), 2);
//! assert_eq!(ring.stats().total_dropped, 1);
//! assert_eq!(ring.drain(), vec!["b", "c"]);
//! ```

use std::collections::VecDeque;

/// In-memory ring buffer with bounded capacity.
#[derive(Debug, Clone)]
pub struct BoundedRing<T> {
    entries: VecDeque<T>,
    max_capacity: usize,
    total_received: u64,
    total_dropped: u64,
}

impl<T> BoundedRing<T> {
    /// Create a ring holding at most `max_capacity` entries.
    ///
    /// A capacity of zero is clamped to one.
    pub fn new(max_capacity: usize) -> Self {
        let max_capacity = max_capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(max_capacity.min(1024)),
            max_capacity,
            total_received: 0,
            total_dropped: 0,
        }
    }

    /// Push an entry, dropping the oldest one when full.
    pub fn push(&mut self, entry: T) {
        self.total_received += 1;

        if self.entries.len() >= self.max_capacity {
            self.entries.pop_front();
            self.total_dropped += 1;
        }

        self.entries.push_back(entry);
    }

    /// Remove and return every entry, oldest first.
    pub fn drain(&mut self) -> Vec<T> {
        self.entries.drain(..).collect()
    }

    /// Iterate entries oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Drop all entries. Lifetime totals are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_capacity
    }

    pub fn stats(&self) -> RingStats {
        RingStats {
            current_count: self.entries.len(),
            max_capacity: self.max_capacity,
            total_received: self.total_received,
            total_dropped: self.total_dropped,
        }
    }
}

impl<T: Clone> BoundedRing<T> {
    /// Clone the newest `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<T> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }
}

/// Occupancy counters for a [`BoundedRing`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingStats {
    /// Current number of entries
    pub current_count: usize,
    /// Maximum capacity
    pub max_capacity: usize,
    /// Total entries ever received
    pub total_received: u64,
    /// Total entries evicted due to capacity overflow
    pub total_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_drain() {
        let mut ring = BoundedRing::new(100);

        ring.push(1);
        ring.push(2);
        assert_eq!(ring.len(), 2);

        let entries = ring.drain();
        assert_eq!(entries, vec![1, 2]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_capacity_overflow_drops_oldest() {
        let mut ring = BoundedRing::new(2);

        ring.push("event-1");
        ring.push("event-2");
        ring.push("event-3"); // Drops event-1

        assert_eq!(ring.len(), 2);
        let entries = ring.drain();
        assert_eq!(entries[0], "event-2");
        assert_eq!(entries[1], "event-3");
    }

    #[test]
    fn test_recent_returns_newest_in_order() {
        let mut ring = BoundedRing::new(10);
        for i in 0..6 {
            ring.push(i);
        }

        assert_eq!(ring.recent(3), vec![3, 4, 5]);
        assert_eq!(ring.recent(50), vec![0, 1, 2, 3, 4, 5]);
        assert!(ring.recent(0).is_empty());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut ring = BoundedRing::new(0);
        ring.push('x');
        ring.push('y');

        assert_eq!(ring.capacity(), 1);
        assert_eq!(ring.drain(), vec!['y']);
    }

    #[test]
    fn test_stats() {
        let mut ring = BoundedRing::new(2);

        ring.push("a");
        ring.push("b");
        ring.push("c"); // Overflow
        ring.clear();

        let stats = ring.stats();
        assert_eq!(stats.current_count, 0);
        assert_eq!(stats.max_capacity, 2);
        assert_eq!(stats.total_received, 3);
        assert_eq!(stats.total_dropped, 1);
    }
}
