use super::common::*;
use crate::workflows::leads::domain::QualificationDimension;
use crate::workflows::leads::scoring::{ScoreTable, ScoringEngine, ScoringRubric};

fn engine() -> ScoringEngine {
    ScoringEngine::new(ScoringRubric::standard())
}

#[test]
fn reference_lead_scores_seventy() {
    let card = engine().score(&seventy_point_lead());
    assert_eq!(card.total, 70);
    assert_eq!(
        card.components
            .iter()
            .map(|component| component.points)
            .collect::<Vec<_>>(),
        vec![15, 15, 20, 20]
    );
    assert!(card.components.iter().all(|component| component.recognized));
}

#[test]
fn unknown_industry_contributes_zero() {
    let card = engine().score(&lead("201-1000", "50001-100000", "Aerospace", "Immediate"));
    assert_eq!(card.total, 50);

    let unrecognized: Vec<_> = card.unrecognized().collect();
    assert_eq!(unrecognized.len(), 1);
    assert_eq!(unrecognized[0].dimension, QualificationDimension::Industry);
    assert_eq!(unrecognized[0].label, "Aerospace");
    assert_eq!(unrecognized[0].points, 0);
}

#[test]
fn known_zero_weight_label_is_still_recognized() {
    let card = engine().score(&lead("1-50", "<10000", "Other", "Long-term"));
    assert_eq!(card.total, 15);
    assert!(card.unrecognized().next().is_none());
}

#[test]
fn all_unknown_labels_score_zero() {
    let card = engine().score(&lead("", "n/a", "Aerospace", "someday"));
    assert_eq!(card.total, 0);
    assert_eq!(card.unrecognized().count(), 4);
}

#[test]
fn identical_attributes_score_identically() {
    let engine = engine();
    let mut other = seventy_point_lead();
    other.identity.name = "Somebody Else".to_string();
    other.identity.email = "else@example.com".to_string();

    assert_eq!(engine.score(&seventy_point_lead()), engine.score(&seventy_point_lead()));
    assert_eq!(
        engine.score(&seventy_point_lead()).total,
        engine.score(&other).total
    );
}

#[test]
fn total_is_sum_of_recognized_weights_across_combinations() {
    let engine = engine();
    let rubric = engine.rubric();
    let sizes = ["1-50", "51-200", "201-1000", "1000+", "mystery"];
    let budgets = ["<10000", "10000-50000", "50001-100000", ">100000", ""];
    let industries = ["Technology", "Finance", "Healthcare", "Retail", "Other", "Aerospace"];
    let urgencies = ["Immediate", "Short-term", "Medium-term", "Long-term", "later"];

    for size in sizes {
        for budget in budgets {
            for industry in industries {
                for urgency in urgencies {
                    let candidate = lead(size, budget, industry, urgency);
                    let expected: u32 = QualificationDimension::ALL
                        .iter()
                        .map(|&dimension| {
                            let label = candidate.qualification.label(dimension);
                            rubric
                                .table(dimension)
                                .and_then(|table| table.weight(label))
                                .unwrap_or(0)
                        })
                        .sum();
                    let total = engine.score(&candidate).total;
                    assert_eq!(total, expected);
                    assert!(total <= rubric.max_score());
                }
            }
        }
    }
}

#[test]
fn substituted_rubric_changes_weights_without_engine_changes() {
    let rubric = ScoringRubric::new([
        (
            QualificationDimension::Industry,
            ScoreTable::new("industry", [("Aerospace", 40)]),
        ),
        (
            QualificationDimension::Urgency,
            ScoreTable::empty("urgency"),
        ),
    ]);
    let engine = ScoringEngine::new(rubric);

    let card = engine.score(&lead("201-1000", "50001-100000", "Aerospace", "Immediate"));
    assert_eq!(card.total, 40);
    assert_eq!(card.unrecognized().count(), 3);
}

#[test]
fn score_lead_attaches_card() {
    let scored = engine().score_lead(seventy_point_lead());
    assert_eq!(scored.score(), 70);
    assert_eq!(scored.lead, seventy_point_lead());
}
