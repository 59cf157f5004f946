//! Worker pool configuration

use std::time::Duration;

/// Default number of known categories
pub const DEFAULT_NUM_CLASSES: usize = 1000;

/// Classification pool options
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of items classified concurrently
    pub workers: usize,

    /// Throughput sampling period
    pub report_interval: Duration,

    /// Number of known categories; results must fall in `[0, num_classes)`
    pub num_classes: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            report_interval: Duration::from_secs(1),
            num_classes: DEFAULT_NUM_CLASSES,
        }
    }
}

impl PoolConfig {
    /// Set the worker count
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the throughput sampling period
    pub fn report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Set the number of known categories
    pub fn num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = num_classes;
        self
    }
}

/// One worker per available core
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
