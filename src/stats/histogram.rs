//! Per-category counters

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ValidationError;

/// Fixed-size category histogram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: Vec<u64>,
}

impl Histogram {
    /// All-zero histogram over `num_classes` categories
    pub fn new(num_classes: usize) -> Self {
        Self {
            counts: vec![0; num_classes],
        }
    }

    pub fn num_classes(&self) -> usize {
        self.counts.len()
    }

    /// Count one occurrence of `category`
    ///
    /// Out-of-range categories are rejected and leave the histogram untouched.
    pub fn record(&mut self, category: i64) -> Result<(), ValidationError> {
        let slot = usize::try_from(category)
            .ok()
            .filter(|&slot| slot < self.counts.len())
            .ok_or(ValidationError::OutOfRange {
                category,
                num_classes: self.counts.len(),
            })?;

        self.counts[slot] += 1;
        Ok(())
    }

    /// Count for one category (0 when out of range)
    pub fn get(&self, category: usize) -> u64 {
        self.counts.get(category).copied().unwrap_or(0)
    }

    /// Sum over all categories
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Non-zero slots in ascending category order
    pub fn nonzero(&self) -> Vec<(usize, u64)> {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(category, &count)| (category, count))
            .collect()
    }

    /// Zero every slot
    pub fn reset(&mut self) {
        self.counts.iter_mut().for_each(|count| *count = 0);
    }

    /// Read-and-clear: return the non-zero slots, then reset
    pub fn take_window(&mut self) -> Vec<(usize, u64)> {
        let counts = self.nonzero();
        self.reset();
        counts
    }
}

/// Histogram shared between the receive loop and the window reporter
#[derive(Debug, Clone)]
pub struct SharedHistogram {
    inner: Arc<Mutex<Histogram>>,
}

impl SharedHistogram {
    pub fn new(num_classes: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Histogram::new(num_classes))),
        }
    }

    /// Lock the histogram; released when the guard goes out of scope
    pub fn lock(&self) -> MutexGuard<'_, Histogram> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current counts
    pub fn snapshot(&self) -> Histogram {
        self.lock().clone()
    }
}

/// Counts accumulated during one reporting window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowReport {
    /// 1-based window number (0 for a final partial window)
    pub window: u64,
    /// Non-zero categories in ascending order
    pub counts: Vec<(usize, u64)>,
}

impl WindowReport {
    /// Messages counted in this window
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl fmt::Display for WindowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.window == 0 {
            write!(f, "final window: {} results", self.total())?;
        } else {
            write!(f, "window {}: {} results", self.window, self.total())?;
        }
        for (category, count) in &self.counts {
            write!(f, "\n  class {:>4}: {}", category, count)?;
        }
        Ok(())
    }
}
