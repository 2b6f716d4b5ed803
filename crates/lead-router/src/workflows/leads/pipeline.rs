use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::dispatch::{
    DedupLedger, DedupPolicy, DispatchCoordinator, DispatchStatus, LeadOutcome, LeadStore,
    MemoryLedger, NotificationSender, NotificationTemplate,
};
use super::domain::{Disposition, RawRecord, RoutedLead};
use super::intake::{self, LeadSource, MalformedRecord};
use super::routing::RoutingPolicy;
use super::scoring::{RubricError, ScoringEngine, ScoringRubric};
use crate::config::PipelineConfig;

/// Batch-level failure: a required collaborator could not be reached, so no
/// lead was processed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{collaborator} unavailable: {reason}")]
    CollaboratorUnavailable {
        collaborator: &'static str,
        reason: String,
    },
    #[error(transparent)]
    Rubric(#[from] RubricError),
}

/// Shared flag checked between leads; once set no further lead is started.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Diagnostic for a record that failed intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub index: usize,
    pub reason: String,
}

/// Per-record results of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<LeadOutcome>,
    pub skipped: Vec<SkippedRecord>,
    pub interrupted: bool,
    /// Records never started because the batch was cancelled.
    pub not_started: usize,
}

impl BatchReport {
    fn started() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            outcomes: Vec::new(),
            skipped: Vec::new(),
            interrupted: false,
            not_started: 0,
        }
    }

    pub fn summary(&self) -> BatchSummary {
        let count_status = |status: DispatchStatus| {
            self.outcomes
                .iter()
                .filter(|outcome| outcome.status == status)
                .count()
        };
        let count_disposition = |disposition: Disposition| {
            self.outcomes
                .iter()
                .filter(|outcome| outcome.disposition == disposition)
                .count()
        };

        BatchSummary {
            processed: self.outcomes.len(),
            engaged: count_disposition(Disposition::Engage),
            nurtured: count_disposition(Disposition::Nurture),
            succeeded: count_status(DispatchStatus::Success),
            partial: count_status(DispatchStatus::Partial),
            failed: count_status(DispatchStatus::Failed),
            skipped: self.skipped.len(),
            not_started: self.not_started,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub engaged: usize,
    pub nurtured: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    pub skipped: usize,
    pub not_started: usize,
}

/// Normalize → score → route → dispatch over a batch of raw records.
pub struct QualificationPipeline<N, S> {
    engine: ScoringEngine,
    routing: RoutingPolicy,
    coordinator: Arc<DispatchCoordinator<N, S>>,
    concurrency: usize,
}

impl<N, S> QualificationPipeline<N, S>
where
    N: NotificationSender + 'static,
    S: LeadStore + 'static,
{
    pub fn new(
        engine: ScoringEngine,
        routing: RoutingPolicy,
        coordinator: DispatchCoordinator<N, S>,
    ) -> Self {
        Self {
            engine,
            routing,
            coordinator: Arc::new(coordinator),
            concurrency: 1,
        }
    }

    /// Build from configuration. `ledger` overrides the in-memory ledger used
    /// when identity dedup is enabled.
    pub fn from_config(
        config: &PipelineConfig,
        notifier: Arc<N>,
        store: Arc<S>,
        ledger: Option<Arc<dyn DedupLedger>>,
    ) -> Result<Self, PipelineError> {
        let rubric = match &config.score_tables {
            Some(path) => ScoringRubric::from_path(path)?,
            None => ScoringRubric::standard(),
        };

        let mut coordinator = DispatchCoordinator::new(
            notifier,
            store,
            NotificationTemplate::welcome(config.company_name.clone()),
            config.retry,
        );
        if config.dedup == DedupPolicy::IdentityHash {
            let ledger = ledger.unwrap_or_else(|| Arc::new(MemoryLedger::default()));
            coordinator = coordinator.with_ledger(ledger);
        }

        Ok(Self::new(
            ScoringEngine::new(rubric),
            RoutingPolicy::new(config.engage_threshold),
            coordinator,
        )
        .with_concurrency(config.concurrency))
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub fn routing(&self) -> RoutingPolicy {
        self.routing
    }

    /// The pure stages for one record; nothing external is touched.
    pub fn qualify(&self, record: &RawRecord) -> Result<RoutedLead, MalformedRecord> {
        let lead = intake::normalize(record)?;
        let scored = self.engine.score_lead(lead);
        let routed = self.routing.route(scored);
        debug!(
            score = routed.score(),
            disposition = routed.disposition().label(),
            "lead qualified"
        );
        Ok(routed)
    }

    /// Run a batch. Per-record failures land in the report; only an
    /// unavailable collaborator fails the call.
    pub async fn run<L: LeadSource>(
        &self,
        mut source: L,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, PipelineError> {
        self.coordinator
            .probe_notifier()
            .map_err(|err| PipelineError::CollaboratorUnavailable {
                collaborator: "notification sender",
                reason: err.to_string(),
            })?;
        self.coordinator
            .probe_store()
            .map_err(|err| PipelineError::CollaboratorUnavailable {
                collaborator: "lead store",
                reason: err.to_string(),
            })?;
        let records =
            source
                .read_records()
                .map_err(|err| PipelineError::CollaboratorUnavailable {
                    collaborator: "lead source",
                    reason: err.to_string(),
                })?;

        let mut report = BatchReport::started();
        if records.is_empty() {
            info!("no leads found");
            report.finished_at = Utc::now();
            return Ok(report);
        }

        info!(
            records = records.len(),
            threshold = self.routing.threshold(),
            concurrency = self.concurrency,
            "starting lead batch"
        );

        if self.concurrency == 1 {
            self.run_sequential(records, cancel, &mut report).await;
        } else {
            self.run_concurrent(records, cancel, &mut report).await;
        }

        report.finished_at = Utc::now();
        let summary = report.summary();
        info!(
            processed = summary.processed,
            engaged = summary.engaged,
            nurtured = summary.nurtured,
            partial = summary.partial,
            failed = summary.failed,
            skipped = summary.skipped,
            interrupted = report.interrupted,
            "lead batch finished"
        );
        Ok(report)
    }

    async fn run_sequential(
        &self,
        records: Vec<RawRecord>,
        cancel: &CancellationToken,
        report: &mut BatchReport,
    ) {
        let total = records.len();
        for (index, record) in records.into_iter().enumerate() {
            if cancel.is_cancelled() {
                interrupt(report, total - index);
                break;
            }

            match self.qualify(&record) {
                Ok(routed) => {
                    let outcome = self.coordinator.dispatch(index, routed).await;
                    report.outcomes.push(outcome);
                }
                Err(reason) => skip(report, index, &record, reason),
            }
        }
    }

    async fn run_concurrent(
        &self,
        records: Vec<RawRecord>,
        cancel: &CancellationToken,
        report: &mut BatchReport,
    ) {
        let total = records.len();
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, record) in records.into_iter().enumerate() {
            let permit = match Arc::clone(&permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    interrupt(report, total - index);
                    break;
                }
            };
            if cancel.is_cancelled() {
                interrupt(report, total - index);
                break;
            }

            match self.qualify(&record) {
                Ok(routed) => {
                    let coordinator = Arc::clone(&self.coordinator);
                    tasks.spawn(async move {
                        let _permit = permit;
                        coordinator.dispatch(index, routed).await
                    });
                }
                Err(reason) => skip(report, index, &record, reason),
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(err) => error!(error = %err, "dispatch task aborted"),
            }
        }
        report.outcomes.sort_by_key(|outcome| outcome.index);
    }
}

fn interrupt(report: &mut BatchReport, remaining: usize) {
    warn!(remaining, "lead batch cancelled");
    report.interrupted = true;
    report.not_started = remaining;
}

fn skip(report: &mut BatchReport, index: usize, record: &RawRecord, reason: MalformedRecord) {
    warn!(
        index,
        fields = record.field_count(),
        reason = %reason,
        "skipping incomplete lead"
    );
    report.skipped.push(SkippedRecord {
        index,
        reason: reason.to_string(),
    });
}
