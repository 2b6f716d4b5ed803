use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use serde_json::Value;

use crate::workflows::leads::dispatch::{
    DispatchCoordinator, EffectError, LeadStore, Notification, NotificationSender,
    NotificationTemplate, RetryPolicy,
};
use crate::workflows::leads::domain::{
    Bucket, ContactIdentity, Lead, QualificationProfile, RawRecord,
};
use crate::workflows::leads::pipeline::QualificationPipeline;
use crate::workflows::leads::routing::RoutingPolicy;
use crate::workflows::leads::scoring::{ScoringEngine, ScoringRubric};

pub(super) fn lead(company_size: &str, budget: &str, industry: &str, urgency: &str) -> Lead {
    Lead {
        identity: ContactIdentity {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: "555-0100".to_string(),
        },
        qualification: QualificationProfile {
            company_size: company_size.to_string(),
            budget: budget.to_string(),
            industry: industry.to_string(),
            urgency: urgency.to_string(),
        },
        extra: Vec::new(),
    }
}

/// Scores 70 under the standard rubric.
pub(super) fn seventy_point_lead() -> Lead {
    lead("201-1000", "50001-100000", "Technology", "Immediate")
}

pub(super) fn row(name: &str, email: &str, labels: [&str; 4]) -> RawRecord {
    let [company_size, budget, industry, urgency] = labels;
    RawRecord::positional([
        name,
        email,
        "555-0100",
        company_size,
        budget,
        industry,
        urgency,
    ])
}

/// 80 points: engages at the standard threshold.
pub(super) fn hot_row(name: &str) -> RawRecord {
    row(
        name,
        &format!("{}@example.com", name.to_ascii_lowercase()),
        ["1000+", ">100000", "Technology", "Immediate"],
    )
}

/// 20 points: nurtured at the standard threshold.
pub(super) fn cold_row(name: &str) -> RawRecord {
    row(
        name,
        &format!("{}@example.com", name.to_ascii_lowercase()),
        ["1-50", "<10000", "Retail", "Long-term"],
    )
}

pub(super) fn quick_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        effect_timeout: Duration::from_secs(2),
    }
}

/// How a test double answers its calls.
#[derive(Debug, Clone)]
pub(super) enum FailureMode {
    Never,
    Always(EffectError),
    FirstN(u32, EffectError),
    /// Succeeds after blocking for the given time.
    Slow(Duration),
}

impl FailureMode {
    fn check(&self, calls: u32) -> Result<(), EffectError> {
        match self {
            FailureMode::Never => Ok(()),
            FailureMode::Always(error) => Err(error.clone()),
            FailureMode::FirstN(limit, error) if calls <= *limit => Err(error.clone()),
            FailureMode::FirstN(..) => Ok(()),
            FailureMode::Slow(delay) => {
                std::thread::sleep(*delay);
                Ok(())
            }
        }
    }
}

pub(super) struct MemoryStore {
    rows: Mutex<BTreeMap<Bucket, Vec<Vec<String>>>>,
    calls: AtomicU32,
    failure: FailureMode,
    probe_error: Option<EffectError>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::failing(FailureMode::Never)
    }
}

impl MemoryStore {
    pub(super) fn failing(failure: FailureMode) -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            calls: AtomicU32::new(0),
            failure,
            probe_error: None,
        }
    }

    pub(super) fn unreachable() -> Self {
        Self {
            probe_error: Some(EffectError::Permanent("sheet offline".to_string())),
            ..Self::default()
        }
    }

    pub(super) fn rows(&self, bucket: Bucket) -> Vec<Vec<String>> {
        self.rows
            .lock()
            .expect("store mutex poisoned")
            .get(&bucket)
            .cloned()
            .unwrap_or_default()
    }

    pub(super) fn total_rows(&self) -> usize {
        self.rows
            .lock()
            .expect("store mutex poisoned")
            .values()
            .map(Vec::len)
            .sum()
    }

    pub(super) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LeadStore for MemoryStore {
    fn append(&self, bucket: Bucket, row: &[String]) -> Result<(), EffectError> {
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.failure.check(calls)?;
        self.rows
            .lock()
            .expect("store mutex poisoned")
            .entry(bucket)
            .or_default()
            .push(row.to_vec());
        Ok(())
    }

    fn probe(&self) -> Result<(), EffectError> {
        match &self.probe_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

pub(super) struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
    calls: AtomicU32,
    failure: FailureMode,
}

impl Default for MemoryNotifier {
    fn default() -> Self {
        Self::failing(FailureMode::Never)
    }
}

impl MemoryNotifier {
    pub(super) fn failing(failure: FailureMode) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
            failure,
        }
    }

    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NotificationSender for MemoryNotifier {
    fn send(&self, notification: &Notification) -> Result<(), EffectError> {
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.failure.check(calls)?;
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification.clone());
        Ok(())
    }
}

pub(super) fn coordinator(
    notifier: &Arc<MemoryNotifier>,
    store: &Arc<MemoryStore>,
    retry: RetryPolicy,
) -> DispatchCoordinator<MemoryNotifier, MemoryStore> {
    DispatchCoordinator::new(
        Arc::clone(notifier),
        Arc::clone(store),
        NotificationTemplate::default(),
        retry,
    )
}

pub(super) fn pipeline(
    notifier: &Arc<MemoryNotifier>,
    store: &Arc<MemoryStore>,
    threshold: u32,
) -> QualificationPipeline<MemoryNotifier, MemoryStore> {
    QualificationPipeline::new(
        ScoringEngine::new(ScoringRubric::standard()),
        RoutingPolicy::new(threshold),
        coordinator(notifier, store, quick_retry(2)),
    )
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
