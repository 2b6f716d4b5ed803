//! File-backed collaborators for running batches without third-party services.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::dispatch::{EffectError, LeadStore, Notification, NotificationSender};
use super::domain::{Bucket, STORAGE_HEADER};

/// One CSV file per bucket under `root`; rows are only ever appended.
#[derive(Debug)]
pub struct CsvLeadStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl CsvLeadStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, std::io::Error> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    pub fn path_for(&self, bucket: Bucket) -> PathBuf {
        self.root.join(format!("{}.csv", bucket.label()))
    }
}

impl LeadStore for CsvLeadStore {
    fn append(&self, bucket: Bucket, row: &[String]) -> Result<(), EffectError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| EffectError::Permanent("lead store lock poisoned".to_string()))?;

        let path = self.path_for(bucket);
        let is_new = !path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| EffectError::Transient(format!("open {}: {err}", path.display())))?;

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(file);
        if is_new {
            writer
                .write_record(STORAGE_HEADER)
                .map_err(|err| EffectError::Transient(err.to_string()))?;
        }
        writer
            .write_record(row)
            .map_err(|err| EffectError::Transient(err.to_string()))?;
        writer
            .flush()
            .map_err(|err| EffectError::Transient(err.to_string()))
    }

    fn probe(&self) -> Result<(), EffectError> {
        let metadata = fs::metadata(&self.root)
            .map_err(|err| EffectError::Permanent(format!("{}: {err}", self.root.display())))?;
        if metadata.permissions().readonly() {
            return Err(EffectError::Permanent(format!(
                "{} is read-only",
                self.root.display()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct OutboxEntry<'a> {
    queued_at: DateTime<Utc>,
    #[serde(flatten)]
    notification: &'a Notification,
}

/// Appends notifications as JSON lines for a mail relay to pick up.
#[derive(Debug)]
pub struct OutboxNotifier {
    path: PathBuf,
    writer: Mutex<File>,
}

impl OutboxNotifier {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let writer = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NotificationSender for OutboxNotifier {
    fn send(&self, notification: &Notification) -> Result<(), EffectError> {
        let entry = OutboxEntry {
            queued_at: Utc::now(),
            notification,
        };
        let line = serde_json::to_string(&entry)
            .map_err(|err| EffectError::Permanent(format!("unencodable notification: {err}")))?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| EffectError::Permanent("outbox lock poisoned".to_string()))?;
        writeln!(writer, "{line}")
            .and_then(|_| writer.flush())
            .map_err(|err| EffectError::Transient(format!("outbox write failed: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str) -> Vec<String> {
        [name, "a@b.test", "", "1-50", "<10000", "Retail", "Long-term", "20"]
            .iter()
            .map(|cell| cell.to_string())
            .collect()
    }

    #[test]
    fn store_writes_header_once_per_bucket() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CsvLeadStore::open(dir.path()).expect("open store");
        store.probe().expect("store writable");

        store.append(Bucket::Nurture, &row("One")).expect("append");
        store.append(Bucket::Nurture, &row("Two")).expect("append");

        let contents =
            fs::read_to_string(store.path_for(Bucket::Nurture)).expect("read nurture file");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Name,Email,Phone"));
        assert!(lines[2].starts_with("Two,"));
        assert!(!store.path_for(Bucket::HighPriority).exists());
    }

    #[test]
    fn outbox_appends_json_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outbox = OutboxNotifier::open(dir.path().join("mail/outbox.jsonl")).expect("open");

        outbox
            .send(&Notification {
                recipient: "jane@example.com".to_string(),
                subject: "Welcome".to_string(),
                body: "Hi Jane".to_string(),
            })
            .expect("send");

        let contents = fs::read_to_string(outbox.path()).expect("read outbox");
        let entry: serde_json::Value =
            serde_json::from_str(contents.trim()).expect("json line");
        assert_eq!(entry["recipient"], "jane@example.com");
        assert!(entry["queued_at"].is_string());
    }
}
