use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use super::effects::EffectError;
use crate::workflows::leads::domain::Lead;
use crate::workflows::leads::intake::normalizer::normalize_label;

/// Whether repeated submissions of the same contact are suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// Every run appends; re-running a batch duplicates its rows.
    #[default]
    Disabled,
    /// A hash of the identity attributes gates dispatch.
    IdentityHash,
}

impl DedupPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "off" | "none" | "disabled" => Some(Self::Disabled),
            "identity" | "identity_hash" | "on" => Some(Self::IdentityHash),
            _ => None,
        }
    }
}

/// Stable key over normalized name, e-mail and phone. Anonymous leads (all three
/// blank) have no identity to compare, so they get no key and are never suppressed.
pub fn identity_key(lead: &Lead) -> Option<String> {
    let identity = &lead.identity;
    let parts =
        [&identity.name, &identity.email, &identity.phone].map(|part| normalize_label(part));
    if parts.iter().all(String::is_empty) {
        return None;
    }

    let mut hasher = Sha256::new();
    for part in &parts {
        hasher.update(part.as_bytes());
        hasher.update([0x1f_u8]);
    }
    Some(hex::encode(hasher.finalize()))
}

/// Record of identity keys that have already been dispatched.
///
/// `reserve` must be atomic so two copies of a lead in one concurrent batch
/// cannot both pass.
pub trait DedupLedger: Send + Sync {
    /// Returns `false` when the key is already known.
    fn reserve(&self, key: &str) -> bool;
    /// Forget a reservation whose dispatch did not persist.
    fn release(&self, key: &str);
    /// Make a reservation durable once the lead is persisted.
    fn commit(&self, key: &str) -> Result<(), EffectError>;
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    keys: Mutex<HashSet<String>>,
}

impl MemoryLedger {
    pub fn len(&self) -> usize {
        self.keys.lock().map(|keys| keys.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DedupLedger for MemoryLedger {
    fn reserve(&self, key: &str) -> bool {
        match self.keys.lock() {
            Ok(mut keys) => keys.insert(key.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(key.to_string()),
        }
    }

    fn release(&self, key: &str) {
        match self.keys.lock() {
            Ok(mut keys) => keys.remove(key),
            Err(poisoned) => poisoned.into_inner().remove(key),
        };
    }

    fn commit(&self, _key: &str) -> Result<(), EffectError> {
        Ok(())
    }
}

/// Ledger persisted as one key per line so dedup survives restarts.
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    keys: MemoryLedger,
    writer: Mutex<File>,
}

impl FileLedger {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let path = path.as_ref().to_path_buf();
        let keys = MemoryLedger::default();

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for line in reader.lines() {
                let line = line?;
                let key = line.trim();
                if !key.is_empty() {
                    keys.reserve(key);
                }
            }
        }

        let writer = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            keys,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl DedupLedger for FileLedger {
    fn reserve(&self, key: &str) -> bool {
        self.keys.reserve(key)
    }

    fn release(&self, key: &str) {
        self.keys.release(key)
    }

    fn commit(&self, key: &str) -> Result<(), EffectError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| EffectError::Permanent("dedup ledger lock poisoned".to_string()))?;
        writeln!(writer, "{key}")
            .and_then(|_| writer.flush())
            .map_err(|err| EffectError::Transient(format!("dedup ledger write failed: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::leads::domain::{ContactIdentity, QualificationProfile};

    fn lead(name: &str, email: &str, industry: &str) -> Lead {
        contact(name, email, "555-0100", industry)
    }

    fn contact(name: &str, email: &str, phone: &str, industry: &str) -> Lead {
        Lead {
            identity: ContactIdentity {
                name: name.to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
            },
            qualification: QualificationProfile {
                company_size: "1-50".to_string(),
                budget: "<10000".to_string(),
                industry: industry.to_string(),
                urgency: "Immediate".to_string(),
            },
            extra: Vec::new(),
        }
    }

    #[test]
    fn identity_key_ignores_qualification_and_case() {
        let first = identity_key(&lead("Jane Doe", "Jane@Example.com", "Retail"));
        let second = identity_key(&lead("jane  doe", "jane@example.com", "Technology"));
        let other = identity_key(&lead("John Doe", "jane@example.com", "Retail"));

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(first.map(|key| key.len()), Some(64));
    }

    #[test]
    fn anonymous_leads_have_no_identity_key() {
        assert_eq!(identity_key(&contact("", " ", "", "Retail")), None);
        assert!(identity_key(&contact("", "", "555-0100", "Retail")).is_some());
    }

    #[test]
    fn parse_accepts_known_modes() {
        assert_eq!(DedupPolicy::parse("off"), Some(DedupPolicy::Disabled));
        assert_eq!(DedupPolicy::parse(" Identity "), Some(DedupPolicy::IdentityHash));
        assert_eq!(DedupPolicy::parse("maybe"), None);
    }

    #[test]
    fn memory_ledger_reserves_once() {
        let ledger = MemoryLedger::default();
        assert!(ledger.reserve("abc"));
        assert!(!ledger.reserve("abc"));
        ledger.release("abc");
        assert!(ledger.reserve("abc"));
    }

    #[test]
    fn file_ledger_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dedup.keys");

        let ledger = FileLedger::open(&path).expect("open ledger");
        assert!(ledger.reserve("k1"));
        ledger.commit("k1").expect("commit");
        assert!(ledger.reserve("k2"));
        ledger.release("k2");
        drop(ledger);

        let reopened = FileLedger::open(&path).expect("reopen ledger");
        assert_eq!(reopened.len(), 1);
        assert!(!reopened.reserve("k1"));
        assert!(reopened.reserve("k2"));
    }
}
