//! Classification worker pool and throughput reporting
//!
//! ```text
//!   items ──► driver ──► [permit] spawn_blocking(load + classify) ──┐
//!                                                                   │ completion order
//!   ThroughputMonitor ◄── counter (mutex) ◄── increment on success  ▼
//!      (every 1s)                                        Completions::next()
//! ```

pub mod classifier;
pub mod config;
pub mod counter;
pub mod monitor;
pub mod workers;

pub use classifier::{load_image, Classifier, ColorBucketClassifier};
pub use config::PoolConfig;
pub use counter::ThroughputCounter;
pub use monitor::{ThroughputMonitor, ThroughputSample};
pub use workers::{ClassifierPool, Completion, Completions, PoolSummary};
