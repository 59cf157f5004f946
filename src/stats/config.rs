//! Stats aggregator configuration

use std::time::Duration;

use crate::pool::config::DEFAULT_NUM_CLASSES;

/// What to do with a data message whose category is out of range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidCategoryPolicy {
    /// Stop the aggregator with a validation error
    #[default]
    FailFast,
    /// Log the message, count it as rejected and keep going
    SkipAndLog,
}

/// Stats aggregator options
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Number of known categories (histogram size)
    pub num_classes: usize,

    /// Reporter wake-up period
    pub tick: Duration,

    /// Wake-ups per reported window
    pub ticks_per_window: u32,

    /// Handling of out-of-range categories
    pub on_invalid_category: InvalidCategoryPolicy,

    /// Emit the partial window left over at termination
    pub final_report: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            num_classes: DEFAULT_NUM_CLASSES,
            tick: Duration::from_secs(1),
            ticks_per_window: 10,
            on_invalid_category: InvalidCategoryPolicy::FailFast,
            final_report: false,
        }
    }
}

impl StatsConfig {
    /// Set the number of known categories
    pub fn num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = num_classes;
        self
    }

    /// Set the reporter wake-up period
    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Set the number of wake-ups per window
    pub fn ticks_per_window(mut self, ticks: u32) -> Self {
        self.ticks_per_window = ticks.max(1);
        self
    }

    /// Skip and log out-of-range categories instead of failing
    pub fn skip_invalid(mut self) -> Self {
        self.on_invalid_category = InvalidCategoryPolicy::SkipAndLog;
        self
    }

    /// Emit a last report on termination
    pub fn final_report(mut self, enabled: bool) -> Self {
        self.final_report = enabled;
        self
    }

    /// Length of one reporting window
    pub fn window(&self) -> Duration {
        self.tick * self.ticks_per_window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StatsConfig::default();

        assert_eq!(config.num_classes, 1000);
        assert_eq!(config.window(), Duration::from_secs(10));
        assert_eq!(config.on_invalid_category, InvalidCategoryPolicy::FailFast);
        assert!(!config.final_report);
    }

    #[test]
    fn test_builder_chaining() {
        let config = StatsConfig::default()
            .num_classes(10)
            .tick(Duration::from_millis(100))
            .ticks_per_window(0)
            .skip_invalid()
            .final_report(true);

        assert_eq!(config.num_classes, 10);
        assert_eq!(config.ticks_per_window, 1);
        assert_eq!(config.window(), Duration::from_millis(100));
        assert_eq!(config.on_invalid_category, InvalidCategoryPolicy::SkipAndLog);
        assert!(config.final_report);
    }
}
