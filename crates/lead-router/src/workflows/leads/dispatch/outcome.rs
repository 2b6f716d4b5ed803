use serde::Serialize;

use crate::workflows::leads::domain::{Disposition, RoutedLead};

/// Result of one external effect for one lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum EffectOutcome {
    Succeeded {
        attempts: u32,
    },
    Failed {
        reason: String,
        attempts: u32,
        permanent: bool,
    },
    /// The call outlived its timeout and may still complete, so the effect is in doubt.
    TimedOut {
        attempts: u32,
        after_ms: u64,
    },
    /// The effect was deliberately not attempted.
    Skipped {
        reason: String,
    },
}

impl EffectOutcome {
    pub(crate) fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, EffectOutcome::Succeeded { .. })
    }

    pub fn failed(&self) -> bool {
        matches!(
            self,
            EffectOutcome::Failed { .. } | EffectOutcome::TimedOut { .. }
        )
    }

    /// Whether the effect may have been applied even though it was not confirmed.
    pub fn in_doubt(&self) -> bool {
        matches!(self, EffectOutcome::TimedOut { .. })
    }

    pub fn attempted(&self) -> bool {
        !matches!(self, EffectOutcome::Skipped { .. })
    }
}

/// Terminal per-lead state after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Success,
    Partial,
    Failed,
}

impl DispatchStatus {
    pub fn from_effects(effects: &[&EffectOutcome]) -> Self {
        let attempted: Vec<_> = effects.iter().filter(|effect| effect.attempted()).collect();
        let failures = attempted.iter().filter(|effect| effect.failed()).count();

        if failures == 0 {
            DispatchStatus::Success
        } else if failures == attempted.len() {
            DispatchStatus::Failed
        } else {
            DispatchStatus::Partial
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DispatchStatus::Success => "success",
            DispatchStatus::Partial => "partial",
            DispatchStatus::Failed => "failed",
        }
    }
}

/// Everything recorded about a lead once the pipeline is done with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadOutcome {
    /// Zero-based position of the record in the source batch.
    pub index: usize,
    pub name: String,
    pub email: String,
    pub score: u32,
    pub disposition: Disposition,
    pub notification: EffectOutcome,
    pub persistence: EffectOutcome,
    pub status: DispatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<String>,
}

impl LeadOutcome {
    pub(crate) fn new(
        index: usize,
        routed: &RoutedLead,
        notification: EffectOutcome,
        persistence: EffectOutcome,
        dedup_key: Option<String>,
    ) -> Self {
        let status = DispatchStatus::from_effects(&[&notification, &persistence]);
        let identity = &routed.lead().identity;
        Self {
            index,
            name: identity.name.clone(),
            email: identity.email.clone(),
            score: routed.score(),
            disposition: routed.disposition(),
            notification,
            persistence,
            status,
            dedup_key,
        }
    }

    pub fn notified(&self) -> bool {
        self.notification.succeeded()
    }

    pub fn persisted(&self) -> bool {
        self.persistence.succeeded()
    }
}
