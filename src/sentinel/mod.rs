//! Sentinel module - typosquat detection over a registry feed.
//!
//! This module wires the detection stages together:
//! - **Matcher**: edit-distance comparison via [`SimilarityMatcher`]
//! - **Seen-set**: per-process deduplication via [`SeenSet`]
//! - **Pipeline**: serial analysis and alerting via [`AnalysisPipeline`]
//! - **Poller**: continuous or single-shot polling via [`RegistryPoller`]
//! - **Collaborators**: the npm search feed and alert sinks

pub mod alert;
pub mod matcher;
pub mod pipeline;
pub mod poller;
pub mod registry;
pub mod seen;

// Re-export commonly used types
pub use alert::{LogAlertSink, OAuth1Credentials, XAlertSink, XCredentials};
pub use matcher::{bounded_levenshtein, find_match, levenshtein, SimilarityMatcher};
pub use pipeline::{format_alert, AnalysisPipeline, PipelineStats, TyposquatAnalyzer};
pub use poller::{PollMode, RegistryPoller};
pub use registry::NpmSearchFeed;
pub use seen::SeenSet;
