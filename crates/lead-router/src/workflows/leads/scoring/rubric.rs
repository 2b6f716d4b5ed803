use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::workflows::leads::domain::QualificationDimension;
use crate::workflows::leads::intake::normalizer::normalize_label;

/// Immutable label → weight lookup for one qualification dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreTable {
    name: String,
    weights: BTreeMap<String, u32>,
}

impl ScoreTable {
    pub fn new<I, S>(name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        let weights = entries
            .into_iter()
            .map(|(label, weight)| (normalize_label(label.as_ref()), weight))
            .collect();
        Self {
            name: name.into(),
            weights,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, std::iter::empty::<(&str, u32)>())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Weight for `label`, or `None` when the table has never heard of it.
    pub fn weight(&self, label: &str) -> Option<u32> {
        self.weights.get(&normalize_label(label)).copied()
    }

    pub fn max_weight(&self) -> u32 {
        self.weights.values().copied().max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// One score table per qualification dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringRubric {
    tables: BTreeMap<QualificationDimension, ScoreTable>,
}

#[derive(Debug, thiserror::Error)]
pub enum RubricError {
    #[error("failed to read score tables: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid score table definition: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct RubricDocument(BTreeMap<QualificationDimension, BTreeMap<String, u32>>);

impl ScoringRubric {
    /// Dimensions without a table score zero for every label.
    pub fn new(tables: impl IntoIterator<Item = (QualificationDimension, ScoreTable)>) -> Self {
        Self {
            tables: tables.into_iter().collect(),
        }
    }

    /// Weights from the sales team's qualification sheet.
    pub fn standard() -> Self {
        Self::new([
            (
                QualificationDimension::CompanySize,
                ScoreTable::new(
                    "company_size",
                    [("1-50", 5), ("51-200", 10), ("201-1000", 15), ("1000+", 20)],
                ),
            ),
            (
                QualificationDimension::Budget,
                ScoreTable::new(
                    "budget",
                    [
                        ("<10000", 5),
                        ("10000-50000", 10),
                        ("50001-100000", 15),
                        (">100000", 20),
                    ],
                ),
            ),
            (
                QualificationDimension::Industry,
                ScoreTable::new(
                    "industry",
                    [
                        ("Technology", 20),
                        ("Finance", 15),
                        ("Healthcare", 10),
                        ("Retail", 5),
                        ("Other", 0),
                    ],
                ),
            ),
            (
                QualificationDimension::Urgency,
                ScoreTable::new(
                    "urgency",
                    [
                        ("Immediate", 20),
                        ("Short-term", 15),
                        ("Medium-term", 10),
                        ("Long-term", 5),
                    ],
                ),
            ),
        ])
    }

    pub fn from_json(raw: &str) -> Result<Self, RubricError> {
        let RubricDocument(document) = serde_json::from_str(raw)?;
        Ok(Self::new(document.into_iter().map(|(dimension, entries)| {
            (dimension, ScoreTable::new(dimension.key(), entries))
        })))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RubricError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn table(&self, dimension: QualificationDimension) -> Option<&ScoreTable> {
        self.tables.get(&dimension)
    }

    /// Upper bound on any score this rubric can produce.
    pub fn max_score(&self) -> u32 {
        self.tables
            .values()
            .fold(0u32, |acc, table| acc.saturating_add(table.max_weight()))
    }
}

impl Default for ScoringRubric {
    fn default() -> Self {
        Self::standard()
    }
}
