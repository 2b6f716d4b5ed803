mod dedup;
mod effects;
mod outcome;
mod retry;
mod template;

pub use dedup::{identity_key, DedupLedger, DedupPolicy, FileLedger, MemoryLedger};
pub use effects::{EffectError, LeadStore, Notification, NotificationSender};
pub use outcome::{DispatchStatus, EffectOutcome, LeadOutcome};
pub use retry::RetryPolicy;
pub use template::NotificationTemplate;

use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{Disposition, RoutedLead};

/// Performs the external effects a disposition calls for and records how each went.
pub struct DispatchCoordinator<N, S> {
    notifier: Arc<N>,
    store: Arc<S>,
    template: NotificationTemplate,
    retry: RetryPolicy,
    ledger: Option<Arc<dyn DedupLedger>>,
}

impl<N, S> DispatchCoordinator<N, S>
where
    N: NotificationSender + 'static,
    S: LeadStore + 'static,
{
    pub fn new(
        notifier: Arc<N>,
        store: Arc<S>,
        template: NotificationTemplate,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            notifier,
            store,
            template,
            retry,
            ledger: None,
        }
    }

    /// Gate dispatch on identity keys recorded in `ledger`.
    pub fn with_ledger(mut self, ledger: Arc<dyn DedupLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub(crate) fn probe_notifier(&self) -> Result<(), EffectError> {
        self.notifier.probe()
    }

    pub(crate) fn probe_store(&self) -> Result<(), EffectError> {
        self.store.probe()
    }

    /// Engage leads are notified and persisted as two independent effects;
    /// nurture leads are only persisted.
    pub async fn dispatch(&self, index: usize, routed: RoutedLead) -> LeadOutcome {
        let dedup_key = self
            .ledger
            .as_ref()
            .and_then(|_| identity_key(routed.lead()));

        if let (Some(ledger), Some(key)) = (&self.ledger, &dedup_key) {
            if !ledger.reserve(key) {
                info!(index, score = routed.score(), "lead already dispatched, skipping");
                let reason = "duplicate identity already dispatched";
                return LeadOutcome::new(
                    index,
                    &routed,
                    EffectOutcome::skipped(reason),
                    EffectOutcome::skipped(reason),
                    dedup_key,
                );
            }
        }

        let notification = match routed.disposition() {
            Disposition::Engage => self.notify(&routed).await,
            Disposition::Nurture => EffectOutcome::skipped("nurture track sends no notification"),
        };
        let persistence = self.persist(&routed).await;

        if let (Some(ledger), Some(key)) = (&self.ledger, &dedup_key) {
            if persistence.succeeded() || persistence.in_doubt() {
                if let Err(error) = ledger.commit(key) {
                    warn!(index, error = %error, "failed to record dedup key");
                }
            } else {
                ledger.release(key);
            }
        }

        let outcome = LeadOutcome::new(index, &routed, notification, persistence, dedup_key);
        info!(
            index,
            score = outcome.score,
            disposition = outcome.disposition.label(),
            status = outcome.status.label(),
            "lead dispatched"
        );
        outcome
    }

    async fn notify(&self, routed: &RoutedLead) -> EffectOutcome {
        let notification = self.template.render(routed.lead());
        if !template::is_deliverable(&notification.recipient) {
            warn!(recipient = %notification.recipient, "undeliverable notification address");
            return EffectOutcome::Failed {
                reason: format!(
                    "recipient address '{}' is not deliverable",
                    notification.recipient
                ),
                attempts: 0,
                permanent: true,
            };
        }

        let notifier = Arc::clone(&self.notifier);
        self.retry
            .run("notification", move || notifier.send(&notification))
            .await
    }

    async fn persist(&self, routed: &RoutedLead) -> EffectOutcome {
        let bucket = routed.disposition().bucket();
        let row = routed.storage_row();
        let store = Arc::clone(&self.store);
        self.retry
            .run("persistence", move || store.append(bucket, &row))
            .await
    }
}
