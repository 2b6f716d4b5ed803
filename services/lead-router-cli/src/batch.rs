use crate::report::{render_batch_report, render_score_card, ReportDocument};
use clap::Args;
use lead_router::config::{AppConfig, PipelineConfig};
use lead_router::error::AppError;
use lead_router::telemetry;
use lead_router::workflows::leads::{
    CancellationToken, ContactIdentity, CsvLeadSource, CsvLeadStore, DedupLedger, DedupPolicy,
    FileLedger, Lead, OutboxNotifier, PipelineError, QualificationPipeline, QualificationProfile,
    RoutingPolicy, ScoringEngine, ScoringRubric,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) const OUTBOX_FILE: &str = "outbox.jsonl";
pub(crate) const LEDGER_FILE: &str = "dispatched.keys";

#[derive(Args, Debug)]
pub(crate) struct QualifyArgs {
    /// CSV export of inbound leads
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Directory receiving bucket CSVs, the notification outbox and the dedup ledger
    #[arg(long, default_value = "lead-output")]
    pub(crate) output_dir: PathBuf,
    /// Treat the first row as column names instead of the positional layout
    #[arg(long)]
    pub(crate) headers: bool,
    /// Override the engage threshold (score must be strictly greater)
    #[arg(long)]
    pub(crate) threshold: Option<u32>,
    /// Duplicate handling across runs: off or identity
    #[arg(long, value_parser = parse_dedup)]
    pub(crate) dedup: Option<DedupPolicy>,
    /// Number of leads dispatched concurrently
    #[arg(long)]
    pub(crate) concurrency: Option<usize>,
    /// JSON score tables replacing the built-in rubric
    #[arg(long)]
    pub(crate) score_tables: Option<PathBuf>,
    /// Print the full report as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    #[arg(long)]
    pub(crate) company_size: String,
    #[arg(long)]
    pub(crate) budget: String,
    #[arg(long)]
    pub(crate) industry: String,
    #[arg(long)]
    pub(crate) urgency: String,
    /// Override the engage threshold
    #[arg(long)]
    pub(crate) threshold: Option<u32>,
    /// JSON score tables replacing the built-in rubric
    #[arg(long)]
    pub(crate) score_tables: Option<PathBuf>,
}

fn parse_dedup(raw: &str) -> Result<DedupPolicy, String> {
    DedupPolicy::parse(raw).ok_or_else(|| format!("unknown dedup mode '{raw}' (use off or identity)"))
}

pub(crate) fn apply_overrides(config: &mut PipelineConfig, args: &QualifyArgs) {
    if let Some(threshold) = args.threshold {
        config.engage_threshold = threshold;
    }
    if let Some(dedup) = args.dedup {
        config.dedup = dedup;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency.max(1);
    }
    if let Some(path) = &args.score_tables {
        config.score_tables = Some(path.clone());
    }
}

pub(crate) async fn run_qualify(args: QualifyArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    apply_overrides(&mut config.pipeline, &args);
    telemetry::init(&config.telemetry)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight leads");
            on_interrupt.cancel();
        }
    });

    let document = qualify_file(&config.pipeline, &args, &cancel).await?;
    if args.json {
        let rendered = serde_json::to_string_pretty(&document).map_err(std::io::Error::from)?;
        println!("{rendered}");
    } else {
        render_batch_report(&document);
    }
    Ok(())
}

/// Runs one CSV batch into `args.output_dir`.
pub(crate) async fn qualify_file(
    config: &PipelineConfig,
    args: &QualifyArgs,
    cancel: &CancellationToken,
) -> Result<ReportDocument, AppError> {
    let store = Arc::new(CsvLeadStore::open(&args.output_dir)?);
    let notifier = Arc::new(OutboxNotifier::open(args.output_dir.join(OUTBOX_FILE))?);
    let ledger = open_ledger(config.dedup, &args.output_dir)?;

    let pipeline = QualificationPipeline::from_config(config, notifier, store, ledger)?;
    let source = CsvLeadSource::from_path(&args.input, args.headers)?;

    info!(input = %args.input.display(), output = %args.output_dir.display(), "qualifying lead file");
    let report = pipeline.run(source, cancel).await?;
    Ok(ReportDocument::new(report, config.engage_threshold, &args.output_dir))
}

fn open_ledger(
    policy: DedupPolicy,
    output_dir: &Path,
) -> Result<Option<Arc<dyn DedupLedger>>, AppError> {
    match policy {
        DedupPolicy::Disabled => Ok(None),
        DedupPolicy::IdentityHash => {
            let ledger: Arc<dyn DedupLedger> =
                Arc::new(FileLedger::open(output_dir.join(LEDGER_FILE))?);
            Ok(Some(ledger))
        }
    }
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let rubric = match args.score_tables.as_ref().or(config.pipeline.score_tables.as_ref()) {
        Some(path) => ScoringRubric::from_path(path).map_err(PipelineError::from)?,
        None => ScoringRubric::standard(),
    };
    let threshold = args.threshold.unwrap_or(config.pipeline.engage_threshold);

    let lead = Lead {
        identity: ContactIdentity {
            name: String::new(),
            email: String::new(),
            phone: String::new(),
        },
        qualification: QualificationProfile {
            company_size: args.company_size,
            budget: args.budget,
            industry: args.industry,
            urgency: args.urgency,
        },
        extra: Vec::new(),
    };

    let engine = ScoringEngine::new(rubric);
    let routed = RoutingPolicy::new(threshold).route(engine.score_lead(lead));
    render_score_card(&routed, threshold);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_router::workflows::leads::{Bucket, RetryPolicy};
    use std::fs;

    const CSV: &str = "Name,Email,Phone,Company Size,Budget,Industry,Urgency\n\
Ada Byron,ada@example.com,555-0199,1000+,>100000,Technology,Immediate\n\
Bo Lin,bo@example.com,,1-50,<10000,Retail,Long-term\n";

    fn args(workdir: &Path, dedup: Option<DedupPolicy>) -> QualifyArgs {
        let input = workdir.join("leads.csv");
        fs::write(&input, CSV).expect("write input");
        QualifyArgs {
            input,
            output_dir: workdir.join("out"),
            headers: true,
            threshold: None,
            dedup,
            concurrency: None,
            score_tables: None,
            json: false,
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            retry: RetryPolicy::immediate(),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn overrides_replace_configured_values() {
        let workdir = tempfile::tempdir().expect("tempdir");
        let mut args = args(workdir.path(), Some(DedupPolicy::IdentityHash));
        args.threshold = Some(40);
        args.concurrency = Some(0);

        let mut config = config();
        apply_overrides(&mut config, &args);

        assert_eq!(config.engage_threshold, 40);
        assert_eq!(config.dedup, DedupPolicy::IdentityHash);
        assert_eq!(config.concurrency, 1);
    }

    #[tokio::test]
    async fn qualify_file_writes_buckets_and_outbox() {
        let workdir = tempfile::tempdir().expect("tempdir");
        let args = args(workdir.path(), None);

        let document = qualify_file(&config(), &args, &CancellationToken::new())
            .await
            .expect("batch runs");

        assert_eq!(document.summary.engaged, 1);
        assert_eq!(document.summary.nurtured, 1);
        let store = CsvLeadStore::open(&args.output_dir).expect("store");
        assert!(store.path_for(Bucket::HighPriority).exists());
        assert!(store.path_for(Bucket::Nurture).exists());
        let outbox = fs::read_to_string(args.output_dir.join(OUTBOX_FILE)).expect("outbox");
        assert_eq!(outbox.lines().count(), 1);
    }

    #[tokio::test]
    async fn identity_dedup_persists_between_invocations() {
        let workdir = tempfile::tempdir().expect("tempdir");
        let args = args(workdir.path(), Some(DedupPolicy::IdentityHash));
        let mut config = config();
        apply_overrides(&mut config, &args);

        for _ in 0..2 {
            qualify_file(&config, &args, &CancellationToken::new())
                .await
                .expect("batch runs");
        }

        let ledger = fs::read_to_string(args.output_dir.join(LEDGER_FILE)).expect("ledger");
        assert_eq!(ledger.lines().count(), 2);
        let outbox = fs::read_to_string(args.output_dir.join(OUTBOX_FILE)).expect("outbox");
        assert_eq!(outbox.lines().count(), 1);
    }

    #[tokio::test]
    async fn missing_input_is_a_source_error() {
        let workdir = tempfile::tempdir().expect("tempdir");
        let mut args = args(workdir.path(), None);
        args.input = workdir.path().join("absent.csv");

        let error = qualify_file(&config(), &args, &CancellationToken::new())
            .await
            .expect_err("input is missing");
        assert!(matches!(error, AppError::Source(_)));
    }
}
