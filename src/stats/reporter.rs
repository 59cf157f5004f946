//! Windowed reporter
//!
//! Wakes up every tick; every `ticks_per_window` wake-ups it takes the
//! histogram's window (read-and-clear under the histogram lock) and hands it
//! to the sink. Each report therefore only covers activity since the previous
//! one.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::histogram::{SharedHistogram, WindowReport};

/// Handle to a running window reporter
pub struct WindowReporter {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<u64>,
}

impl WindowReporter {
    pub fn spawn<F>(
        histogram: SharedHistogram,
        tick: Duration,
        ticks_per_window: u32,
        mut sink: F,
    ) -> Self
    where
        F: FnMut(WindowReport) + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let ticks_per_window = u64::from(ticks_per_window.max(1));

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + tick, tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut wakeups = 0u64;
            let mut windows = 0u64;

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        wakeups += 1;
                        if wakeups % ticks_per_window != 0 {
                            continue;
                        }

                        windows += 1;
                        let counts = histogram.lock().take_window();
                        let report = WindowReport { window: windows, counts };

                        tracing::debug!(window = windows, results = report.total(), "Window closed");
                        sink(report);
                    }
                }
            }

            windows
        });

        Self { stop_tx, handle }
    }

    /// Signal the reporter to stop and wait for it to exit
    ///
    /// Returns the number of windows reported.
    pub async fn stop(self) -> u64 {
        let _ = self.stop_tx.send(());

        match self.handle.await {
            Ok(windows) => windows,
            Err(e) => {
                tracing::warn!(error = %e, "Window reporter task failed");
                0
            }
        }
    }
}
