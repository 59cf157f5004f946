//! Bounded classification worker pool
//!
//! Every work item becomes an independent blocking task. A driver task hands
//! items to tokio's blocking pool, holding a semaphore permit per running
//! task, so at most `workers` items are classified at once. Finished items are
//! pushed into a channel as they complete, which makes [`Completions`] yield
//! them in completion order rather than submission order.
//!
//! Failures stay local to their item: they are yielded as errors, do not count
//! towards throughput and do not affect sibling tasks.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use super::classifier::Classifier;
use super::config::PoolConfig;
use super::counter::ThroughputCounter;
use crate::channel::ClassificationResult;
use crate::error::{ClassificationError, Error, Result};

/// One finished work item
pub type Completion = (PathBuf, std::result::Result<ClassificationResult, ClassificationError>);

/// Classifies a fixed list of image files concurrently
pub struct ClassifierPool<C> {
    items: Vec<PathBuf>,
    classifier: Arc<C>,
    config: PoolConfig,
    counter: ThroughputCounter,
}

impl<C: Classifier> ClassifierPool<C> {
    /// Create a pool over `items`
    pub fn new(items: Vec<PathBuf>, classifier: C, config: PoolConfig) -> Result<Self> {
        if config.workers == 0 {
            return Err(Error::Config("worker pool needs at least one worker".into()));
        }
        if config.num_classes == 0 {
            return Err(Error::Config("num_classes must be positive".into()));
        }

        Ok(Self {
            items,
            classifier: Arc::new(classifier),
            config,
            counter: ThroughputCounter::new(),
        })
    }

    /// Completion counter shared with the throughput monitor
    pub fn counter(&self) -> ThroughputCounter {
        self.counter.clone()
    }

    /// Number of work items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Submit every item and return the completion sequence
    pub fn run(self) -> Completions {
        let (tx, rx) = mpsc::unbounded_channel();
        let total = self.items.len();

        tracing::info!(
            items = total,
            workers = self.config.workers,
            "Classification started"
        );

        let driver = tokio::spawn(drive(
            self.items,
            self.classifier,
            self.counter,
            self.config,
            tx,
        ));

        Completions {
            rx,
            driver: Some(driver),
            started: Instant::now(),
            total,
            processed: 0,
            failed: 0,
        }
    }
}

async fn drive<C: Classifier>(
    items: Vec<PathBuf>,
    classifier: Arc<C>,
    counter: ThroughputCounter,
    config: PoolConfig,
    tx: mpsc::UnboundedSender<Completion>,
) {
    let permits = Arc::new(Semaphore::new(config.workers));
    let num_classes = config.num_classes;

    for item in items {
        // The semaphore is never closed
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let classifier = Arc::clone(&classifier);
        let counter = counter.clone();
        let tx = tx.clone();

        tokio::task::spawn_blocking(move || {
            let outcome = classify_item(classifier.as_ref(), &item, num_classes);
            if outcome.is_ok() {
                counter.increment();
            }
            drop(permit);
            // Receiver gone means the caller stopped draining; nothing to do
            let _ = tx.send((item, outcome));
        });
    }
}

/// Load and classify one item; a panic anywhere fails only this item
fn classify_item<C: Classifier>(
    classifier: &C,
    item: &Path,
    num_classes: usize,
) -> std::result::Result<ClassificationResult, ClassificationError> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        classify_unguarded(classifier, item, num_classes)
    }))
    .unwrap_or_else(|_| Err(ClassificationError::new(item, "classification panicked")))
}

fn classify_unguarded<C: Classifier>(
    classifier: &C,
    item: &Path,
    num_classes: usize,
) -> std::result::Result<ClassificationResult, ClassificationError> {
    let image = classifier.load(item)?;
    let category = classifier
        .classify(&image)
        .map_err(|reason| ClassificationError::new(item, reason))?;

    if category as usize >= num_classes {
        return Err(ClassificationError::new(
            item,
            format!("category {} outside [0, {})", category, num_classes),
        ));
    }

    Ok(ClassificationResult::new(item, category))
}

/// Lazy sequence of finished items, in completion order
pub struct Completions {
    rx: mpsc::UnboundedReceiver<Completion>,
    driver: Option<JoinHandle<()>>,
    started: Instant,
    total: usize,
    processed: usize,
    failed: usize,
}

impl Completions {
    /// Wait for the next item to finish
    ///
    /// Returns `None` once every item has been yielded.
    pub async fn next(&mut self) -> Option<Completion> {
        let completion = self.rx.recv().await?;

        match &completion.1 {
            Ok(_) => self.processed += 1,
            Err(e) => {
                self.failed += 1;
                tracing::warn!(item = %e.item.display(), reason = %e.reason, "Classification failed");
            }
        }

        Some(completion)
    }

    /// Drain the remaining items, then report the totals
    pub async fn finish(mut self) -> PoolSummary {
        while self.next().await.is_some() {}

        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                tracing::warn!(error = %e, "Pool driver task failed");
            }
        }

        let summary = self.summary();
        tracing::info!(
            processed = summary.processed,
            failed = summary.failed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Classification finished"
        );
        summary
    }

    /// Totals so far
    pub fn summary(&self) -> PoolSummary {
        PoolSummary {
            total: self.total,
            processed: self.processed,
            failed: self.failed,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Totals for one pool run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolSummary {
    /// Items submitted
    pub total: usize,
    /// Items classified successfully
    pub processed: usize,
    /// Items that failed
    pub failed: usize,
    /// Time since the pool started
    pub elapsed: Duration,
}

impl PoolSummary {
    /// Successful items per second over the whole run
    pub fn average_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }
}
