//! Shared completion counter

use std::sync::{Arc, Mutex, PoisonError};

/// Number of successfully classified items
///
/// Cloned handles share the same value. Every increment and every read goes
/// through the same mutex, so the monitor never observes a torn update.
#[derive(Debug, Clone, Default)]
pub struct ThroughputCounter {
    inner: Arc<Mutex<u64>>,
}

impl ThroughputCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed item
    pub fn increment(&self) {
        let mut count = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *count += 1;
    }

    /// Current value
    pub fn get(&self) -> u64 {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
