use crate::diagnostics::{Diagnostics, Stage};
use crate::error::{ConfigError, DecisionError, ScoringError, ShapeError};
use crate::model::DecisionConfig;
use crate::scorers::{InputKind, Scorer};
use crate::sources::SourceTable;
use crate::table::Table;
use std::collections::BTreeMap;

/// Scorer of one measure, validated up front.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureScorer {
    pub measure: String,
    pub source: String,
    pub scorer: Scorer,
}

pub fn build_scorers(config: &DecisionConfig) -> Result<Vec<MeasureScorer>, ScoringError> {
    config
        .measures
        .iter()
        .map(|measure| {
            Ok(MeasureScorer {
                measure: measure.name.clone(),
                source: measure.source.clone(),
                scorer: Scorer::from_config(&measure.name, &measure.scoring)?,
            })
        })
        .collect()
}

/// Sources the scorers consume, each with the datatype its scorers require.
pub fn required_sources(
    scorers: &[MeasureScorer],
) -> Result<BTreeMap<String, InputKind>, ConfigError> {
    let mut required = BTreeMap::new();
    for entry in scorers {
        let kind = entry.scorer.input_kind();
        match required.get(&entry.source) {
            Some(&first) if first != kind => {
                return Err(ConfigError::ConflictingInputKinds {
                    source_name: entry.source.clone(),
                    first,
                    second: kind,
                });
            }
            Some(_) => {}
            None => {
                required.insert(entry.source.clone(), kind);
            }
        }
    }
    Ok(required)
}

/// Apply every measure's scorer to its source column; one output column per measure.
pub fn score_measures(
    scorers: &[MeasureScorer],
    sources: &SourceTable,
    diagnostics: &mut Diagnostics,
) -> Result<Table, DecisionError> {
    let mut columns = Vec::with_capacity(scorers.len());
    for entry in scorers {
        let column = sources
            .column(&entry.source)
            .ok_or_else(|| ShapeError::MissingColumn {
                table: "sources".to_string(),
                column: entry.source.clone(),
            })?;
        let scores = entry
            .scorer
            .score(&entry.measure, sources.choices(), column)?;
        diagnostics.info(
            Stage::Scoring,
            entry.measure.as_str(),
            format!(
                "scored '{}' with {} scorer",
                entry.source,
                entry.scorer.code()
            ),
        );
        columns.push((entry.measure.clone(), scores));
    }

    let table = Table::from_columns(sources.choices().to_vec(), columns)?;
    tracing::debug!("measure scores:\n{table}");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Measure, Metric};
    use crate::scorers::ScorerConfig;

    fn config(measures: Vec<(&str, &str, ScorerConfig)>) -> DecisionConfig {
        DecisionConfig {
            measures: measures
                .into_iter()
                .map(|(name, source, scoring)| Measure {
                    name: name.to_string(),
                    source: source.to_string(),
                    scoring,
                    doc: None,
                })
                .collect(),
            metrics: Vec::<Metric>::new(),
            final_metric: "final".to_string(),
            fetchers: Default::default(),
        }
    }

    #[test]
    fn shared_source_with_matching_kinds_is_required_once() {
        let scorers = build_scorers(&config(vec![
            ("cost", "price", ScorerConfig::Range { worst: 10.0, best: 0.0 }),
            ("value", "price", ScorerConfig::Relative { invert: true }),
            ("looks", "rating", ScorerConfig::Star { min: 1, max: 5 }),
        ]))
        .expect("valid scorers");

        let required = required_sources(&scorers).expect("consistent kinds");
        assert_eq!(
            required.into_iter().collect::<Vec<_>>(),
            vec![
                ("price".to_string(), InputKind::Float),
                ("rating".to_string(), InputKind::Integer),
            ]
        );
    }

    #[test]
    fn conflicting_kinds_for_one_source_are_rejected() {
        let scorers = build_scorers(&config(vec![
            ("looks", "rating", ScorerConfig::Star { min: 1, max: 5 }),
            ("style", "rating", ScorerConfig::Bool { good: true }),
        ]))
        .expect("valid scorers");

        assert_eq!(
            required_sources(&scorers),
            Err(ConfigError::ConflictingInputKinds {
                source_name: "rating".to_string(),
                first: InputKind::Integer,
                second: InputKind::Boolean,
            })
        );
    }

    #[test]
    fn invalid_scorer_parameters_fail_before_scoring() {
        let error = build_scorers(&config(vec![(
            "looks",
            "rating",
            ScorerConfig::Star { min: 5, max: 1 },
        )]))
        .expect_err("min above max");
        assert!(matches!(error, ScoringError::InvalidScorer { ref measure, .. } if measure == "looks"));
    }
}
