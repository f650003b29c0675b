use crate::model::MatchResult;
use crate::traits::{AnalysisError, Analyzer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

pub type AnalysisOutcome = Result<Option<MatchResult>, AnalysisError>;

struct Job {
    candidate: String,
    reply: oneshot::Sender<AnalysisOutcome>,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    matched: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn record(&self, outcome: &AnalysisOutcome) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        match outcome {
            Ok(Some(_)) => {
                self.matched.fetch_add(1, Ordering::Relaxed);
                self.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Ok(None) => {}
            Err(e) => {
                if e.is_undelivered_match() {
                    self.matched.fetch_add(1, Ordering::Relaxed);
                }
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Point-in-time view of the executor's counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub submitted: u64,
    pub completed: u64,
    /// Candidates detected as typosquats, whether or not the alert went out
    pub matched: u64,
    /// Alerts the sink accepted
    pub delivered: u64,
    pub failed: u64,
}

impl QueueStats {
    pub fn pending(&self) -> u64 {
        self.submitted.saturating_sub(self.completed)
    }
}

/// Handle to one queued analysis.
///
/// Dropping it is fine: the worker logs failures itself.
#[derive(Debug)]
pub struct Submission {
    rx: oneshot::Receiver<AnalysisOutcome>,
}

impl Submission {
    /// Waits for the analysis to run and returns its outcome.
    pub async fn outcome(self) -> AnalysisOutcome {
        self.rx.await.unwrap_or(Err(AnalysisError::QueueClosed))
    }
}

/// FIFO queue drained by exactly one worker task.
///
/// At most one analysis is in flight at any time. Every job runs in its own
/// task so a panicking analyzer only loses that job.
pub struct SerialExecutor {
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl SerialExecutor {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn<A>(analyzer: Arc<A>) -> Self
    where
        A: Analyzer + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let worker = tokio::spawn(run_worker(analyzer, rx, Arc::clone(&counters)));

        Self {
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            counters,
        }
    }

    /// Appends a candidate to the queue. Never blocks.
    pub fn submit(&self, candidate: impl Into<String>) -> Submission {
        let (reply, rx) = oneshot::channel();
        let job = Job {
            candidate: candidate.into(),
            reply,
        };

        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) => match tx.send(job) {
                Ok(()) => {
                    self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                }
                Err(rejected) => {
                    warn!(package = %rejected.0.candidate, "Analysis worker is gone, dropping candidate");
                }
            },
            None => {
                warn!(package = %job.candidate, "Analysis queue is shut down, dropping candidate");
            }
        }

        Submission { rx }
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            matched: self.counters.matched.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Closes the queue and waits until every job already queued has run.
    pub async fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "Analysis worker terminated abnormally");
            }
        }
    }
}

async fn run_worker<A>(
    analyzer: Arc<A>,
    mut rx: mpsc::UnboundedReceiver<Job>,
    counters: Arc<Counters>,
) where
    A: Analyzer + 'static,
{
    debug!("Analysis worker started");

    while let Some(job) = rx.recv().await {
        let outcome = process(Arc::clone(&analyzer), job.candidate).await;

        counters.record(&outcome);

        // The submitter may have dropped its handle.
        let _ = job.reply.send(outcome);
    }

    debug!("Analysis worker stopped");
}

#[instrument(skip(analyzer))]
async fn process<A>(analyzer: Arc<A>, candidate: String) -> AnalysisOutcome
where
    A: Analyzer + 'static,
{
    let name = candidate.clone();
    let outcome = tokio::spawn(async move { analyzer.analyze(&name).await })
        .await
        .unwrap_or_else(|e| {
            Err(AnalysisError::Aborted {
                candidate: candidate.clone(),
                reason: e.to_string(),
            })
        });

    match &outcome {
        Ok(Some(found)) => info!(
            impersonating = %found.matched_reference,
            distance = found.distance,
            "Analysis finished with a match"
        ),
        Ok(None) => debug!("Analysis finished, no match"),
        Err(e) => error!(error = %e, "Analysis failed"),
    }

    outcome
}
