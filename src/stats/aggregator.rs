//! Stats aggregator
//!
//! Consumes broadcast messages, tallies categories into the shared histogram
//! and runs a [`WindowReporter`] alongside. The sentinel moves the aggregator
//! from `Running` to `Terminated`; the reporter is then stopped and joined.

use tokio::sync::mpsc;

use super::config::{InvalidCategoryPolicy, StatsConfig};
use super::histogram::{SharedHistogram, WindowReport};
use super::reporter::WindowReporter;
use crate::channel::{BroadcastMessage, Subscriber};
use crate::error::{Error, Result, TransportError, ValidationError};

/// Anything the aggregator can pull messages from
#[allow(async_fn_in_trait)]
pub trait MessageSource {
    /// Block until the next message is available
    async fn receive(&mut self) -> std::result::Result<BroadcastMessage, TransportError>;
}

impl MessageSource for Subscriber {
    async fn receive(&mut self) -> std::result::Result<BroadcastMessage, TransportError> {
        Subscriber::receive(self).await
    }
}

/// In-process source, mainly for wiring stages together without sockets
impl MessageSource for mpsc::Receiver<BroadcastMessage> {
    async fn receive(&mut self) -> std::result::Result<BroadcastMessage, TransportError> {
        self.recv().await.ok_or(TransportError::ConnectionClosed)
    }
}

/// Aggregator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    /// Accepting messages
    Running,
    /// Sentinel received
    Terminated,
}

/// Outcome of a completed aggregation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorSummary {
    /// Data messages counted
    pub received: u64,
    /// Data messages skipped for an invalid category
    pub rejected: u64,
    /// Windows reported while running
    pub windows: u64,
    /// Partial window at termination, when requested
    pub final_report: Option<WindowReport>,
}

/// Windowed category aggregator
pub struct Aggregator {
    config: StatsConfig,
    histogram: SharedHistogram,
    state: AggregatorState,
    received: u64,
    rejected: u64,
}

impl Aggregator {
    pub fn new(config: StatsConfig) -> Result<Self> {
        if config.num_classes == 0 {
            return Err(Error::Config("num_classes must be positive".into()));
        }

        Ok(Self {
            histogram: SharedHistogram::new(config.num_classes),
            config,
            state: AggregatorState::Running,
            received: 0,
            rejected: 0,
        })
    }

    pub fn state(&self) -> AggregatorState {
        self.state
    }

    /// Histogram shared with the reporter
    pub fn histogram(&self) -> &SharedHistogram {
        &self.histogram
    }

    /// Apply one message
    ///
    /// A malformed or out-of-range category either fails (the default) or is
    /// skipped, depending on the configured policy.
    pub fn handle(&mut self, msg: BroadcastMessage) -> Result<AggregatorState> {
        if self.state == AggregatorState::Terminated {
            tracing::debug!("Message after sentinel ignored");
            return Ok(self.state);
        }

        match msg {
            BroadcastMessage::Data { file, category } => {
                let recorded = self.histogram.lock().record(category);
                self.apply_policy(&file, recorded)?;
            }
            BroadcastMessage::InvalidCategory { file, raw } => {
                self.apply_policy(&file, Err(ValidationError::NotAnInteger { raw }))?;
            }
            BroadcastMessage::Sentinel => {
                self.state = AggregatorState::Terminated;
                tracing::info!(received = self.received, "End of stream");
            }
        }

        Ok(self.state)
    }

    fn apply_policy(
        &mut self,
        file: &str,
        recorded: std::result::Result<(), ValidationError>,
    ) -> Result<()> {
        match recorded {
            Ok(()) => self.received += 1,
            Err(e) => match self.config.on_invalid_category {
                InvalidCategoryPolicy::FailFast => return Err(e.into()),
                InvalidCategoryPolicy::SkipAndLog => {
                    self.rejected += 1;
                    tracing::warn!(file = %file, error = %e, "Skipping invalid category");
                }
            },
        }
        Ok(())
    }

    /// Receive until the sentinel, reporting every window through `sink`
    ///
    /// The reporter is stopped and joined on every exit path. Nothing is read
    /// from `source` after the sentinel.
    pub async fn run<S, F>(mut self, source: &mut S, sink: F) -> Result<AggregatorSummary>
    where
        S: MessageSource,
        F: FnMut(WindowReport) + Send + 'static,
    {
        let reporter = WindowReporter::spawn(
            self.histogram.clone(),
            self.config.tick,
            self.config.ticks_per_window,
            sink,
        );

        let outcome = loop {
            let msg = match source.receive().await {
                Ok(msg) => msg,
                Err(e) => break Err(Error::from(e)),
            };

            match self.handle(msg) {
                Ok(AggregatorState::Running) => continue,
                Ok(AggregatorState::Terminated) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        let windows = reporter.stop().await;
        outcome?;

        let final_report = self.config.final_report.then(|| WindowReport {
            window: 0,
            counts: self.histogram.lock().take_window(),
        });

        Ok(AggregatorSummary {
            received: self.received,
            rejected: self.rejected,
            windows,
            final_report,
        })
    }
}
