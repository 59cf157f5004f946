//! Windowed category statistics
//!
//! ```text
//!   Subscriber ──► Aggregator::handle ──► SharedHistogram ◄── WindowReporter
//!                  (Running → Terminated      (mutex)          every 10 ticks:
//!                   on sentinel)                               take_window → sink
//! ```

pub mod aggregator;
pub mod config;
pub mod histogram;
pub mod reporter;

pub use aggregator::{Aggregator, AggregatorState, AggregatorSummary, MessageSource};
pub use config::{InvalidCategoryPolicy, StatsConfig};
pub use histogram::{Histogram, SharedHistogram, WindowReport};
pub use reporter::WindowReporter;
