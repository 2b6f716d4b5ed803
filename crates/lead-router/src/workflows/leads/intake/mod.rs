//! Intake turns raw source rows into validated [`Lead`] values.
//!
//! Validation never panics and never aborts a batch: a record that cannot be
//! normalized comes back as a [`MalformedRecord`] which the pipeline logs and skips.

pub(crate) mod normalizer;
mod parser;

use std::collections::BTreeMap;

use super::domain::{ContactIdentity, Lead, QualificationProfile, RawRecord};
use normalizer::{clean_text, normalize_key};

pub use parser::{CsvLeadSource, SourceError};

/// Column order expected from positional (header-less) sources.
pub const POSITIONAL_SCHEMA: [&str; 7] = [
    "name",
    "email",
    "phone",
    "company_size",
    "budget",
    "industry",
    "urgency",
];

/// Reason a raw record was rejected during intake.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedRecord {
    #[error("record has {found} field(s); at least {expected} are required")]
    MissingFields { expected: usize, found: usize },
    #[error("record is missing required field '{0}'")]
    MissingField(&'static str),
    #[error("record is blank")]
    Blank,
}

/// Anything able to hand the pipeline an ordered batch of raw records.
pub trait LeadSource {
    fn read_records(&mut self) -> Result<Vec<RawRecord>, SourceError>;
}

impl LeadSource for Vec<RawRecord> {
    fn read_records(&mut self) -> Result<Vec<RawRecord>, SourceError> {
        Ok(std::mem::take(self))
    }
}

/// Normalize a single raw record into a [`Lead`].
pub fn normalize(record: &RawRecord) -> Result<Lead, MalformedRecord> {
    match record {
        RawRecord::Positional(fields) => normalize_positional(fields),
        RawRecord::Named(fields) => normalize_named(fields),
    }
}

fn normalize_positional(fields: &[String]) -> Result<Lead, MalformedRecord> {
    let cleaned: Vec<String> = fields.iter().map(|value| clean_text(value)).collect();
    if cleaned.iter().all(String::is_empty) {
        return Err(MalformedRecord::Blank);
    }
    if cleaned.len() < POSITIONAL_SCHEMA.len() {
        return Err(MalformedRecord::MissingFields {
            expected: POSITIONAL_SCHEMA.len(),
            found: cleaned.len(),
        });
    }

    let mut cells = cleaned.into_iter();
    let mut next = || cells.next().unwrap_or_default();

    let identity = ContactIdentity {
        name: next(),
        email: next(),
        phone: next(),
    };
    let qualification = QualificationProfile {
        company_size: next(),
        budget: next(),
        industry: next(),
        urgency: next(),
    };

    Ok(Lead {
        identity,
        qualification,
        extra: cells.collect(),
    })
}

const NAME_KEYS: &[&str] = &["name", "full_name", "contact_name"];
const FIRST_NAME_KEYS: &[&str] = &["first_name", "firstname"];
const LAST_NAME_KEYS: &[&str] = &["last_name", "lastname"];
const EMAIL_KEYS: &[&str] = &["email", "email_address"];
const PHONE_KEYS: &[&str] = &["phone", "phone_number"];
const COMPANY_SIZE_KEYS: &[&str] = &["company_size"];
const BUDGET_KEYS: &[&str] = &["budget", "annual_budget"];
const INDUSTRY_KEYS: &[&str] = &["industry"];
const URGENCY_KEYS: &[&str] = &["urgency"];

const KNOWN_KEYS: &[&[&str]] = &[
    NAME_KEYS,
    FIRST_NAME_KEYS,
    LAST_NAME_KEYS,
    EMAIL_KEYS,
    PHONE_KEYS,
    COMPANY_SIZE_KEYS,
    BUDGET_KEYS,
    INDUSTRY_KEYS,
    URGENCY_KEYS,
];

fn normalize_named(fields: &BTreeMap<String, String>) -> Result<Lead, MalformedRecord> {
    let cleaned: BTreeMap<String, String> = fields
        .iter()
        .map(|(key, value)| (normalize_key(key), clean_text(value)))
        .collect();
    if cleaned.values().all(String::is_empty) {
        return Err(MalformedRecord::Blank);
    }

    let lookup = |aliases: &[&str]| -> Option<String> {
        aliases
            .iter()
            .find_map(|alias| cleaned.get(*alias))
            .cloned()
    };
    let require = |aliases: &[&str], field: &'static str| -> Result<String, MalformedRecord> {
        lookup(aliases).ok_or(MalformedRecord::MissingField(field))
    };

    let joined = lookup(FIRST_NAME_KEYS).map(|first| {
        let last = lookup(LAST_NAME_KEYS).unwrap_or_default();
        clean_text(&format!("{first} {last}"))
    });
    // A blank name column defers to first/last when those are filled in.
    let name = match (lookup(NAME_KEYS), joined) {
        (Some(name), Some(joined)) if name.is_empty() => joined,
        (Some(name), _) => name,
        (None, Some(joined)) => joined,
        (None, None) => return Err(MalformedRecord::MissingField("name")),
    };

    let identity = ContactIdentity {
        name,
        email: require(EMAIL_KEYS, "email")?,
        phone: require(PHONE_KEYS, "phone")?,
    };
    let qualification = QualificationProfile {
        company_size: require(COMPANY_SIZE_KEYS, "company_size")?,
        budget: require(BUDGET_KEYS, "budget")?,
        industry: require(INDUSTRY_KEYS, "industry")?,
        urgency: require(URGENCY_KEYS, "urgency")?,
    };

    let extra = cleaned
        .iter()
        .filter(|(key, _)| {
            !KNOWN_KEYS
                .iter()
                .any(|aliases| aliases.contains(&key.as_str()))
        })
        .map(|(_, value)| value.clone())
        .collect();

    Ok(Lead {
        identity,
        qualification,
        extra,
    })
}
