//! Typosquat analysis pipeline.
//!
//! This module provides the [`AnalysisPipeline`] coordinator that takes
//! candidate names off the registry feed and runs them, one at a time, through:
//! - Deduplication against the process-wide [`SeenSet`]
//! - Edit-distance matching via [`SimilarityMatcher`]
//! - Alert delivery through an [`AlertSink`], bounded by a timeout
//!
//! Failures of a single candidate are logged by the executor and never stop
//! the queue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::executor::{QueueStats, SerialExecutor, Submission};
use crate::model::MatchResult;
use crate::sentinel::matcher::SimilarityMatcher;
use crate::sentinel::seen::SeenSet;
use crate::traits::{AlertSink, AnalysisError, Analyzer};

/// Hashtags appended to every alert.
pub const ALERT_HASHTAGS: &str = "#CyberSecurity #NPM #SupplyChainAttack #OpenSource #InfoSec";

/// Default upper bound on one alert delivery.
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(10);

/// Renders the broadcast text for a detection.
pub fn format_alert(found: &MatchResult) -> String {
    format!(
        "\u{26a0}\u{fe0f} Typo Sentinel Alert \u{26a0}\u{fe0f}\n\
         \n\
         Potential Typosquatting Attack Detected:\n\
         - Package: `{}`\n\
         - Impersonating: `{}`\n\
         - Confidence Level: HIGH (Distance: {})\n\
         \n\
         {}",
        found.candidate, found.matched_reference, found.distance, ALERT_HASHTAGS
    )
}

// ============================================================================
// Analyzer
// ============================================================================

/// Matches one candidate and, on a hit, broadcasts an alert.
pub struct TyposquatAnalyzer<S>
where
    S: AlertSink,
{
    matcher: SimilarityMatcher,
    sink: S,
    sink_timeout: Duration,
}

impl<S> TyposquatAnalyzer<S>
where
    S: AlertSink,
{
    /// Creates an analyzer with the default 10 second delivery timeout.
    pub fn new(matcher: SimilarityMatcher, sink: S) -> Self {
        Self {
            matcher,
            sink,
            sink_timeout: DEFAULT_SINK_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, sink_timeout: Duration) -> Self {
        self.sink_timeout = sink_timeout;
        self
    }

    pub fn matcher(&self) -> &SimilarityMatcher {
        &self.matcher
    }
}

#[async_trait]
impl<S> Analyzer for TyposquatAnalyzer<S>
where
    S: AlertSink,
{
    async fn analyze(&self, candidate: &str) -> Result<Option<MatchResult>, AnalysisError> {
        if candidate.trim().is_empty() {
            return Err(AnalysisError::InvalidCandidate(candidate.to_string()));
        }

        let Some(found) = self.matcher.find_match(candidate) else {
            return Ok(None);
        };

        warn!(
            package = %found.candidate,
            impersonating = %found.matched_reference,
            distance = found.distance,
            "Potential typosquat detected"
        );

        let message = format_alert(&found);
        timeout(self.sink_timeout, self.sink.deliver(&message))
            .await
            .map_err(|_| AnalysisError::DeliveryTimeout {
                candidate: found.candidate.clone(),
                timeout_secs: self.sink_timeout.as_secs(),
            })?
            .map_err(|source| AnalysisError::Delivery {
                candidate: found.candidate.clone(),
                source,
            })?;

        info!(
            package = %found.candidate,
            sink = self.sink.sink_id(),
            "Alert broadcast"
        );

        Ok(Some(found))
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Counters for the whole pipeline.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    /// Distinct names seen so far
    pub seen: usize,

    /// Executor counters (submitted, completed, matched, delivered, failed)
    pub queue: QueueStats,
}

/// Process-wide detection state: the seen-set and the serial analysis queue.
///
/// Constructed once at startup and shared with the poller.
pub struct AnalysisPipeline {
    seen: SeenSet,
    executor: SerialExecutor,
}

impl AnalysisPipeline {
    /// Spawns the analysis worker. Must be called inside a tokio runtime.
    pub fn new<A>(analyzer: A) -> Self
    where
        A: Analyzer + 'static,
    {
        Self {
            seen: SeenSet::new(),
            executor: SerialExecutor::spawn(Arc::new(analyzer)),
        }
    }

    /// Enqueues `name` unless it has been offered before.
    ///
    /// Returns `None` for repeats.
    pub fn offer(&self, name: &str) -> Option<Submission> {
        if !self.seen.insert_if_new(name) {
            debug!(package = name, "Already seen, skipping");
            return None;
        }
        info!(package = name, "New package queued for analysis");
        Some(self.executor.submit(name))
    }

    /// Enqueues `candidate` without consulting the seen-set.
    pub fn submit(&self, candidate: impl Into<String>) -> Submission {
        self.executor.submit(candidate)
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            seen: self.seen.len(),
            queue: self.executor.stats(),
        }
    }

    /// Stops accepting work and waits for everything already queued.
    pub async fn shutdown(&self) {
        self.executor.shutdown().await;
        let stats = self.stats();
        info!(
            seen = stats.seen,
            analyzed = stats.queue.completed,
            matches = stats.queue.matched,
            delivered = stats.queue.delivered,
            failures = stats.queue.failed,
            "Analysis pipeline drained"
        );
    }
}

// ============================================================================
// Tests
// ============================================================================
