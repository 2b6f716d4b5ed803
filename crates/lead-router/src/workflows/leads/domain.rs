use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::scoring::ScoreCard;

/// One row as delivered by a lead source, before any validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRecord {
    /// Ordered cells, e.g. a spreadsheet row without a header.
    Positional(Vec<String>),
    /// Header-keyed cells, e.g. a contacts export.
    Named(BTreeMap<String, String>),
}

impl RawRecord {
    pub fn positional<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Positional(fields.into_iter().map(Into::into).collect())
    }

    pub fn named<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Named(
            fields
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn field_count(&self) -> usize {
        match self {
            RawRecord::Positional(fields) => fields.len(),
            RawRecord::Named(fields) => fields.len(),
        }
    }
}

/// Categorical dimensions the scoring rubric knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationDimension {
    CompanySize,
    Budget,
    Industry,
    Urgency,
}

impl QualificationDimension {
    pub const ALL: [QualificationDimension; 4] = [
        QualificationDimension::CompanySize,
        QualificationDimension::Budget,
        QualificationDimension::Industry,
        QualificationDimension::Urgency,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            QualificationDimension::CompanySize => "company_size",
            QualificationDimension::Budget => "budget",
            QualificationDimension::Industry => "industry",
            QualificationDimension::Urgency => "urgency",
        }
    }
}

impl fmt::Display for QualificationDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Contact details used for outreach and persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactIdentity {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Label chosen for each qualification dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationProfile {
    pub company_size: String,
    pub budget: String,
    pub industry: String,
    pub urgency: String,
}

impl QualificationProfile {
    pub fn label(&self, dimension: QualificationDimension) -> &str {
        match dimension {
            QualificationDimension::CompanySize => &self.company_size,
            QualificationDimension::Budget => &self.budget,
            QualificationDimension::Industry => &self.industry,
            QualificationDimension::Urgency => &self.urgency,
        }
    }
}

/// A prospective contact that passed intake validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub identity: ContactIdentity,
    pub qualification: QualificationProfile,
    /// Source cells beyond the known schema, carried through to persistence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<String>,
}

/// Lead with its computed score attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredLead {
    pub lead: Lead,
    pub card: ScoreCard,
}

impl ScoredLead {
    pub fn score(&self) -> u32 {
        self.card.total
    }
}

/// Routing outcome assigned to a scored lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Engage,
    Nurture,
}

impl Disposition {
    pub fn label(&self) -> &'static str {
        match self {
            Disposition::Engage => "Engage",
            Disposition::Nurture => "Nurture",
        }
    }

    pub fn bucket(&self) -> Bucket {
        match self {
            Disposition::Engage => Bucket::HighPriority,
            Disposition::Nurture => Bucket::Nurture,
        }
    }
}

/// Fully routed lead; nothing on it changes once dispatch begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutedLead {
    lead: Lead,
    card: ScoreCard,
    disposition: Disposition,
}

impl RoutedLead {
    pub(crate) fn new(scored: ScoredLead, disposition: Disposition) -> Self {
        Self {
            lead: scored.lead,
            card: scored.card,
            disposition,
        }
    }

    pub fn lead(&self) -> &Lead {
        &self.lead
    }

    pub fn card(&self) -> &ScoreCard {
        &self.card
    }

    pub fn score(&self) -> u32 {
        self.card.total
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    /// Row appended to the store: identity, qualification labels and score in the
    /// [`STORAGE_HEADER`] columns, followed by any extra source fields.
    pub fn storage_row(&self) -> Vec<String> {
        let Lead {
            identity,
            qualification,
            extra,
        } = &self.lead;

        let mut row = vec![
            identity.name.clone(),
            identity.email.clone(),
            identity.phone.clone(),
            qualification.company_size.clone(),
            qualification.budget.clone(),
            qualification.industry.clone(),
            qualification.urgency.clone(),
            self.card.total.to_string(),
        ];
        row.extend(extra.iter().cloned());
        row
    }
}

/// Destination selected in the persistence store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    HighPriority,
    Nurture,
}

impl Bucket {
    pub fn label(&self) -> &'static str {
        match self {
            Bucket::HighPriority => "high_priority",
            Bucket::Nurture => "nurture",
        }
    }
}

/// Fixed leading columns of [`RoutedLead::storage_row`]; extras trail unlabeled.
pub const STORAGE_HEADER: [&str; 8] = [
    "Name",
    "Email",
    "Phone",
    "Company Size",
    "Budget",
    "Industry",
    "Urgency",
    "Score",
];
