use serde::{Deserialize, Serialize};

use crate::workflows::leads::domain::Bucket;

/// Plain-text message addressed to a single lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EffectError {
    /// May succeed if attempted again (timeouts, throttling, 5xx responses).
    #[error("transient failure: {0}")]
    Transient(String),
    /// The request itself was rejected; retrying cannot help.
    #[error("permanent failure: {0}")]
    Permanent(String),
}

impl EffectError {
    pub fn is_transient(&self) -> bool {
        matches!(self, EffectError::Transient(_))
    }

    pub fn reason(&self) -> &str {
        match self {
            EffectError::Transient(reason) | EffectError::Permanent(reason) => reason,
        }
    }
}

/// Outbound notification hook (e-mail gateway, outbox, test recorder).
pub trait NotificationSender: Send + Sync {
    fn send(&self, notification: &Notification) -> Result<(), EffectError>;

    /// Checked once before a batch starts; an error aborts the batch.
    fn probe(&self) -> Result<(), EffectError> {
        Ok(())
    }
}

/// Append-only destination for routed leads.
pub trait LeadStore: Send + Sync {
    fn append(&self, bucket: Bucket, row: &[String]) -> Result<(), EffectError>;

    /// Checked once before a batch starts; an error aborts the batch.
    fn probe(&self) -> Result<(), EffectError> {
        Ok(())
    }
}
