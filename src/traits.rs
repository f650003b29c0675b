use crate::model::MatchResult;
use async_trait::async_trait;
use thiserror::Error;

/// Failure to obtain or decode a page of the registry feed.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Registry request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Registry returned HTTP {status}")]
    Status { status: u16 },
    #[error("Failed to decode registry page: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure to deliver an alert to the broadcast service.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Missing credentials: set {0}")]
    MissingCredentials(&'static str),
    #[error("Failed to sign request: {0}")]
    Signing(String),
    #[error("Broadcast request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Broadcast rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Failure while analysing a single candidate.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid candidate name: {0:?}")]
    InvalidCandidate(String),
    #[error("Alert for '{candidate}' not delivered: {source}")]
    Delivery {
        candidate: String,
        #[source]
        source: SinkError,
    },
    #[error("Alert for '{candidate}' timed out after {timeout_secs}s")]
    DeliveryTimeout { candidate: String, timeout_secs: u64 },
    #[error("Analysis task for '{candidate}' aborted: {reason}")]
    Aborted { candidate: String, reason: String },
    #[error("Analysis queue is closed")]
    QueueClosed,
}

impl AnalysisError {
    /// True when a typosquat was detected but its alert never went out.
    pub fn is_undelivered_match(&self) -> bool {
        matches!(
            self,
            AnalysisError::Delivery { .. } | AnalysisError::DeliveryTimeout { .. }
        )
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Reference list is empty")]
    Empty,
    #[error("Duplicate reference name: {0}")]
    Duplicate(String),
    #[error("Reference name must be a lowercase ASCII identifier: {0:?}")]
    InvalidName(String),
    #[error("Similarity threshold must be at least 1")]
    ZeroThreshold,
}

#[async_trait]
pub trait RegistryFeed: Send + Sync {
    /// Identifier used in logs (e.g., "npm").
    fn feed_id(&self) -> &str;

    /// Fetches the current page of recently published package names, in feed order.
    async fn fetch_names(&self) -> Result<Vec<String>, FetchError>;
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Identifier used in logs (e.g., "x", "log").
    fn sink_id(&self) -> &str;

    /// Delivers one formatted message. No retry is attempted.
    async fn deliver(&self, message: &str) -> Result<(), SinkError>;
}

/// Work performed for every candidate taken off the serial queue.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, candidate: &str) -> Result<Option<MatchResult>, AnalysisError>;
}
