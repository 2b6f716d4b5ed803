mod rubric;

pub use rubric::{RubricError, ScoreTable, ScoringRubric};

use serde::Serialize;

use super::domain::{Lead, QualificationDimension, ScoredLead};

/// Stateless scorer applying a rubric to a lead's qualification labels.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    rubric: ScoringRubric,
}

impl ScoringEngine {
    pub fn new(rubric: ScoringRubric) -> Self {
        Self { rubric }
    }

    pub fn rubric(&self) -> &ScoringRubric {
        &self.rubric
    }

    /// Sum of per-dimension weights; unknown labels contribute nothing.
    pub fn score(&self, lead: &Lead) -> ScoreCard {
        let components: Vec<ScoreComponent> = QualificationDimension::ALL
            .iter()
            .map(|&dimension| {
                let label = lead.qualification.label(dimension);
                let weight = self
                    .rubric
                    .table(dimension)
                    .and_then(|table| table.weight(label));
                ScoreComponent {
                    dimension,
                    label: label.to_string(),
                    points: weight.unwrap_or(0),
                    recognized: weight.is_some(),
                }
            })
            .collect();

        let total = components
            .iter()
            .fold(0u32, |acc, component| acc.saturating_add(component.points));

        ScoreCard { total, components }
    }

    pub fn score_lead(&self, lead: Lead) -> ScoredLead {
        let card = self.score(&lead);
        ScoredLead { lead, card }
    }
}

/// Contribution of one dimension, kept so outcomes can be audited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreComponent {
    pub dimension: QualificationDimension,
    pub label: String,
    pub points: u32,
    pub recognized: bool,
}

/// Total score with its per-dimension breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreCard {
    pub total: u32,
    pub components: Vec<ScoreComponent>,
}

impl ScoreCard {
    pub fn unrecognized(&self) -> impl Iterator<Item = &ScoreComponent> {
        self.components
            .iter()
            .filter(|component| !component.recognized)
    }
}
