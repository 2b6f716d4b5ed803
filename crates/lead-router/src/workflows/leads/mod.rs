//! Lead qualification: intake, scoring, routing and dispatch.
//!
//! Every stage is a plain function or value type so it can be exercised on its
//! own; [`QualificationPipeline`] wires them together for a batch run.

pub mod adapters;
pub mod dispatch;
pub mod domain;
pub mod intake;
pub mod pipeline;
pub mod router;
pub mod routing;
pub mod scoring;

#[cfg(test)]
mod tests;

pub use adapters::{CsvLeadStore, OutboxNotifier};
pub use dispatch::{
    identity_key, DedupLedger, DedupPolicy, DispatchCoordinator, DispatchStatus, EffectError,
    EffectOutcome, FileLedger, LeadOutcome, LeadStore, MemoryLedger, Notification,
    NotificationSender, NotificationTemplate, RetryPolicy,
};
pub use domain::{
    Bucket, ContactIdentity, Disposition, Lead, QualificationDimension, QualificationProfile,
    RawRecord, RoutedLead, ScoredLead,
};
pub use intake::{normalize, CsvLeadSource, LeadSource, MalformedRecord, SourceError};
pub use pipeline::{
    BatchReport, BatchSummary, CancellationToken, PipelineError, QualificationPipeline,
    SkippedRecord,
};
pub use router::{qualification_router, QualifyRequest, ScorePreview, ScoreResponse};
pub use routing::{route, RoutingPolicy};
pub use scoring::{RubricError, ScoreCard, ScoreComponent, ScoreTable, ScoringEngine, ScoringRubric};
