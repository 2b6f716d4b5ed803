use lead_router::workflows::leads::{
    Bucket, EffectError, LeadStore, Notification, NotificationSender,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryLeadStore {
    rows: Arc<Mutex<BTreeMap<Bucket, Vec<Vec<String>>>>>,
}

impl LeadStore for InMemoryLeadStore {
    fn append(&self, bucket: Bucket, row: &[String]) -> Result<(), EffectError> {
        let mut guard = self
            .rows
            .lock()
            .map_err(|_| EffectError::Permanent("lead store mutex poisoned".to_string()))?;
        guard.entry(bucket).or_default().push(row.to_vec());
        Ok(())
    }
}

impl InMemoryLeadStore {
    #[cfg(test)]
    pub(crate) fn rows(&self, bucket: Bucket) -> Vec<Vec<String>> {
        self.rows
            .lock()
            .expect("lead store mutex poisoned")
            .get(&bucket)
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationSender for InMemoryNotifier {
    fn send(&self, notification: &Notification) -> Result<(), EffectError> {
        let mut guard = self
            .sent
            .lock()
            .map_err(|_| EffectError::Permanent("notifier mutex poisoned".to_string()))?;
        guard.push(notification.clone());
        Ok(())
    }
}

impl InMemoryNotifier {
    #[cfg(test)]
    pub(crate) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}
