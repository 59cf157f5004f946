//! framecast: a three-stage frame classification pipeline
//!
//! ```text
//!  producer (ffmpeg) ──► PNG frames ──► ClassifierPool ──► Publisher ══► Subscriber ──► Aggregator
//!                                        │                   (TCP fan-out,   (join barrier)   (windowed
//!                                        ▼                    sentinel)                        histogram)
//!                                   ThroughputMonitor
//! ```
//!
//! - [`channel`]: one-to-many, in-order, at-most-once broadcast over TCP with a
//!   join barrier that holds the publisher until its subscribers are attached
//! - [`pool`]: bounded worker pool yielding classification results in
//!   completion order, plus the per-second throughput monitor
//! - [`stats`]: the aggregator that tallies categories and reports windows
//! - [`producer`]: frame extraction through an external ffmpeg

pub mod channel;
pub mod error;
pub mod pool;
pub mod producer;
pub mod stats;

pub use channel::{BroadcastMessage, ChannelConfig, ClassificationResult, Publisher, Subscriber};
pub use error::{Error, Result};
pub use pool::{ClassifierPool, PoolConfig, ThroughputMonitor};
pub use stats::{Aggregator, StatsConfig};
