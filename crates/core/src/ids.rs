//! Placer and filler order numbers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of placer or filler order numbers. Called once per number assigned.
pub trait IdGenerator {
    fn new_id(&self) -> String;
}

/// Thread-safe increasing counter.
#[derive(Debug)]
pub struct SequenceIdGenerator {
    next: AtomicU64,
}

impl SequenceIdGenerator {
    /// Creates a generator whose first ID is `start`.
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl Default for SequenceIdGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn new_id(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}
