//! Throughput monitor
//!
//! Background task that samples the completion counter once per interval and
//! reports the difference to the previous sample as the current rate.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::counter::ThroughputCounter;

/// One periodic observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputSample {
    /// Items completed since the previous sample
    pub delta: u64,
    /// Items completed overall
    pub total: u64,
}

/// Handle to a running throughput monitor
pub struct ThroughputMonitor {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<u64>,
}

impl ThroughputMonitor {
    /// Start sampling `counter` every `interval`
    ///
    /// `on_sample` runs on the monitor task for every sample.
    pub fn start<F>(counter: ThroughputCounter, interval: Duration, mut on_sample: F) -> Self
    where
        F: FnMut(ThroughputSample) + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let mut previous = counter.get();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut samples = 0u64;

            loop {
                tokio::select! {
                    biased;
                    // Fires on stop() and when the handle is dropped
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let current = counter.get();
                        let sample = ThroughputSample {
                            delta: current - previous,
                            total: current,
                        };
                        previous = current;
                        samples += 1;

                        tracing::debug!(delta = sample.delta, total = sample.total, "Throughput sample");
                        on_sample(sample);
                    }
                }
            }

            samples
        });

        Self { stop_tx, handle }
    }

    /// Signal the monitor to stop and wait for it to exit
    ///
    /// Returns the number of samples reported.
    pub async fn stop(self) -> u64 {
        let _ = self.stop_tx.send(());

        match self.handle.await {
            Ok(samples) => samples,
            Err(e) => {
                tracing::warn!(error = %e, "Throughput monitor task failed");
                0
            }
        }
    }
}
