//! Rolling buffer index arithmetic
//!
//! The observer side of the simulator stores each signal in a
//! fixed-capacity circular array. All channels share one write cursor so
//! a row across every channel corresponds to a single tick; this module
//! owns the cursor arithmetic, the channel storage stays with the
//! recorder.
//!
//! The producer advances the cursor once per tick; readers use `begin`,
//! `count`, and `back` to walk the valid region in chronological order.
//! Single-threaded by design (the producer is quiescent whenever a reader
//! looks), so there is no synchronization.

use serde::{Deserialize, Serialize};

/// Shared write cursor for a set of fixed-capacity rolling channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingContext {
    capacity: usize,
    next_idx: usize,
    /// Total writes, saturating at capacity once the buffer has wrapped
    filled: usize,
}

impl RollingContext {
    /// Create a context for channels of `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_idx: 0,
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slot to write this tick's samples into; advances the cursor.
    pub fn advance(&mut self) -> usize {
        let idx = self.next_idx;
        self.next_idx = (self.next_idx + 1) % self.capacity;
        if self.filled < self.capacity {
            self.filled += 1;
        }
        idx
    }

    /// Number of valid entries: min(total writes, capacity).
    pub fn count(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Index of the oldest valid entry.
    pub fn begin(&self) -> usize {
        if self.filled < self.capacity {
            0
        } else {
            self.next_idx
        }
    }

    /// Index of the newest valid entry. Meaningless while empty.
    pub fn back(&self) -> usize {
        (self.next_idx + self.capacity - 1) % self.capacity
    }

    /// Iterate the valid slot indices oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        let begin = self.begin();
        (0..self.filled).map(move |k| (begin + k) % self.capacity)
    }

    /// Forget all entries, keeping the capacity.
    pub fn clear(&mut self) {
        self.next_idx = 0;
        self.filled = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let ctx = RollingContext::new(4);
        assert_eq!(ctx.count(), 0);
        assert!(ctx.is_empty());
        assert_eq!(ctx.begin(), 0);
    }

    #[test]
    fn test_fill_without_wrap() {
        let mut ctx = RollingContext::new(4);
        assert_eq!(ctx.advance(), 0);
        assert_eq!(ctx.advance(), 1);
        assert_eq!(ctx.advance(), 2);
        assert_eq!(ctx.count(), 3);
        assert_eq!(ctx.begin(), 0);
        assert_eq!(ctx.back(), 2);
    }

    #[test]
    fn test_wrap() {
        let mut ctx = RollingContext::new(4);
        for _ in 0..6 {
            ctx.advance();
        }
        // Two past capacity: slots 0 and 1 were overwritten.
        assert_eq!(ctx.count(), 4);
        assert_eq!(ctx.begin(), 2);
        assert_eq!(ctx.back(), 1);
        assert_eq!(ctx.advance(), 2);
    }

    #[test]
    fn test_iter_chronological() {
        let mut ctx = RollingContext::new(4);
        for _ in 0..6 {
            ctx.advance();
        }
        let order: Vec<usize> = ctx.iter().collect();
        assert_eq!(order, vec![2, 3, 0, 1]);
    }

    #[test]
    fn test_clear() {
        let mut ctx = RollingContext::new(4);
        ctx.advance();
        ctx.advance();
        ctx.clear();
        assert!(ctx.is_empty());
        assert_eq!(ctx.advance(), 0);
    }

    #[test]
    fn test_min_capacity() {
        let mut ctx = RollingContext::new(0);
        assert_eq!(ctx.capacity(), 1);
        ctx.advance();
        ctx.advance();
        assert_eq!(ctx.count(), 1);
        assert_eq!(ctx.begin(), ctx.back());
    }
}
