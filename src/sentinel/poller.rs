//! Registry poller: fetches the feed and offers new names to the pipeline.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::sentinel::pipeline::AnalysisPipeline;
use crate::traits::{FetchError, RegistryFeed};

/// Default period between poll cycles in continuous mode.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Shortest period accepted by [`RegistryPoller::with_interval`].
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Poll immediately, then every interval, until the process is killed.
    Continuous,
    /// One cycle, then wait for the queued analyses and return.
    Once,
}

pub struct RegistryPoller<F>
where
    F: RegistryFeed,
{
    feed: F,
    pipeline: Arc<AnalysisPipeline>,
    poll_interval: Duration,
}

impl<F> RegistryPoller<F>
where
    F: RegistryFeed,
{
    pub fn new(feed: F, pipeline: Arc<AnalysisPipeline>) -> Self {
        Self {
            feed,
            pipeline,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the period between cycles, raised to [`MIN_POLL_INTERVAL`] if shorter.
    pub fn with_interval(mut self, poll_interval: Duration) -> Self {
        if poll_interval < MIN_POLL_INTERVAL {
            warn!(
                requested_ms = poll_interval.as_millis() as u64,
                "Poll interval too short, using the minimum"
            );
        }
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn pipeline(&self) -> &Arc<AnalysisPipeline> {
        &self.pipeline
    }

    /// Fetches one page and offers every name in feed order.
    ///
    /// Returns how many names were new. Analysis happens asynchronously.
    pub async fn poll_cycle(&self) -> Result<usize, FetchError> {
        info!(feed = self.feed.feed_id(), "Fetching new packages");

        let names = self.feed.fetch_names().await?;
        let fetched = names.len();
        let enqueued = names
            .iter()
            .filter_map(|name| self.pipeline.offer(name))
            .count();

        info!(fetched, enqueued, "Poll cycle complete");
        Ok(enqueued)
    }

    /// Like [`poll_cycle`](Self::poll_cycle), but a failed fetch is logged and
    /// counted as zero new names.
    async fn poll_logged(&self) -> usize {
        self.poll_cycle().await.unwrap_or_else(|e| {
            error!(feed = self.feed.feed_id(), error = %e, "Polling failed");
            0
        })
    }

    /// Runs in the given mode. `Continuous` never returns.
    pub async fn run(&self, mode: PollMode) {
        match mode {
            PollMode::Once => {
                self.poll_logged().await;
                self.pipeline.shutdown().await;
            }
            PollMode::Continuous => {
                info!(
                    interval_secs = self.poll_interval.as_secs(),
                    "Continuous polling started"
                );
                let mut ticker = interval(self.poll_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    // First tick completes immediately.
                    ticker.tick().await;
                    self.poll_logged().await;
                }
            }
        }
    }
}
