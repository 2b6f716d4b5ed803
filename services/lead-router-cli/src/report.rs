use chrono::{DateTime, Utc};
use lead_router::workflows::leads::{
    BatchReport, BatchSummary, DispatchStatus, EffectOutcome, RoutedLead,
};
use serde::Serialize;
use std::path::Path;

/// Batch report plus the context needed to read it.
#[derive(Debug, Serialize)]
pub(crate) struct ReportDocument {
    pub(crate) threshold: u32,
    pub(crate) output_dir: String,
    pub(crate) summary: BatchSummary,
    pub(crate) report: BatchReport,
}

impl ReportDocument {
    pub(crate) fn new(report: BatchReport, threshold: u32, output_dir: &Path) -> Self {
        Self {
            threshold,
            output_dir: output_dir.display().to_string(),
            summary: report.summary(),
            report,
        }
    }
}

pub(crate) fn render_batch_report(document: &ReportDocument) {
    let ReportDocument {
        threshold,
        output_dir,
        summary,
        report,
    } = document;

    println!("Lead qualification run");
    println!(
        "  Started {} | took {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        elapsed(report.started_at, report.finished_at)
    );
    println!("  Engage threshold: score > {threshold}");
    println!("  Output: {output_dir}");
    println!(
        "  Processed {} | engaged {} | nurtured {} | skipped {}",
        summary.processed, summary.engaged, summary.nurtured, summary.skipped
    );
    println!(
        "  Dispatch: {} success, {} partial, {} failed",
        summary.succeeded, summary.partial, summary.failed
    );
    if report.interrupted {
        println!(
            "  Interrupted: {} lead(s) were not started",
            summary.not_started
        );
    }

    if !report.outcomes.is_empty() {
        println!("\nLeads:");
    }
    for outcome in &report.outcomes {
        println!(
            "  #{:<4} {:<24} score {:>3}  {:<8} {}",
            outcome.index,
            display_name(&outcome.name),
            outcome.score,
            outcome.disposition.label(),
            outcome.status.label()
        );
        if outcome.status != DispatchStatus::Success {
            describe_effect("notification", &outcome.notification);
            describe_effect("persistence", &outcome.persistence);
        }
    }

    if !report.skipped.is_empty() {
        println!("\nSkipped records:");
        for skipped in &report.skipped {
            println!("  #{:<4} {}", skipped.index, skipped.reason);
        }
    }
}

fn describe_effect(effect: &str, outcome: &EffectOutcome) {
    match outcome {
        EffectOutcome::Failed {
            reason,
            attempts,
            permanent,
        } => {
            let kind = if *permanent { "permanent" } else { "transient" };
            println!("         {effect} failed after {attempts} attempt(s) ({kind}): {reason}");
        }
        EffectOutcome::TimedOut { attempts, after_ms } => {
            println!(
                "         {effect} timed out after {after_ms}ms on attempt {attempts}, outcome unknown"
            );
        }
        EffectOutcome::Succeeded { .. } | EffectOutcome::Skipped { .. } => {}
    }
}

fn display_name(name: &str) -> &str {
    if name.is_empty() {
        "(no name)"
    } else {
        name
    }
}

fn elapsed(started: DateTime<Utc>, finished: DateTime<Utc>) -> String {
    let millis = (finished - started).num_milliseconds().max(0);
    format!("{}.{:03}s", millis / 1000, millis % 1000)
}

pub(crate) fn render_score_card(routed: &RoutedLead, threshold: u32) {
    println!("Lead score: {}", routed.score());
    for component in &routed.card().components {
        let note = if component.recognized {
            ""
        } else {
            "  (unrecognized label)"
        };
        println!(
            "  {:<13} {:<16} {:>3}{note}",
            component.dimension.key(),
            component.label,
            component.points
        );
    }
    println!(
        "Disposition: {} (threshold {threshold})",
        routed.disposition().label()
    );
}
