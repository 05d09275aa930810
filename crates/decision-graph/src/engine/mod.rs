//! Evaluation pipeline: validate the configuration, resolve sources, score measures and
//! aggregate metrics in dependency order.

mod aggregation;
mod ranking;
mod scoring;

pub use aggregation::aggregate;
pub use ranking::{RankEntry, Ranking};
pub use scoring::{build_scorers, required_sources, score_measures, MeasureScorer};

use crate::diagnostics::{Diagnostics, Stage};
use crate::error::DecisionError;
use crate::graph::EvaluationGraph;
use crate::model::DecisionConfig;
use crate::scorers::InputKind;
use crate::sources::{self, FetcherRegistry, RawTable, ResolveOptions, SourceTable};
use crate::table::Table;
use crate::weights::WeightMatrix;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Evaluate arithmetic in text cells before coercion.
    pub evaluate_expressions: bool,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            evaluate_expressions: true,
        }
    }
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub sources: SourceTable,
    pub scores: Table,
    pub weights: WeightMatrix,
    pub results: Table,
    pub ranking: Ranking,
    pub evaluation_order: Vec<String>,
    pub print_order: Vec<String>,
    pub ignored_metrics: Vec<String>,
    pub ignored_measures: Vec<String>,
    /// Measures with zero weight in every metric.
    pub unused_measures: Vec<String>,
    pub diagnostics: Diagnostics,
}

impl Evaluation {
    pub fn winner(&self) -> Option<&RankEntry> {
        self.ranking.winner()
    }
}

/// A decision configuration validated once and evaluated against raw tables.
///
/// Construction checks the graph, weights and scorer parameters, so configuration errors
/// surface before any data is read or scored.
#[derive(Debug)]
pub struct DecisionEngine {
    config: DecisionConfig,
    graph: EvaluationGraph,
    weights: WeightMatrix,
    scorers: Vec<MeasureScorer>,
    required: BTreeMap<String, InputKind>,
    fetchers: FetcherRegistry,
    options: EvaluationOptions,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig) -> Result<Self, DecisionError> {
        let graph = EvaluationGraph::build(&config)?;
        let weights = WeightMatrix::build(&config)?;
        weights.cross_check(&graph)?;
        let scorers = build_scorers(&config)?;
        let required = required_sources(&scorers)?;

        Ok(Self {
            config,
            graph,
            weights,
            scorers,
            required,
            fetchers: FetcherRegistry::new(),
            options: EvaluationOptions::default(),
        })
    }

    pub fn with_fetchers(mut self, fetchers: FetcherRegistry) -> Self {
        self.fetchers = fetchers;
        self
    }

    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    pub fn graph(&self) -> &EvaluationGraph {
        &self.graph
    }

    pub fn weights(&self) -> &WeightMatrix {
        &self.weights
    }

    pub fn scorers(&self) -> &[MeasureScorer] {
        &self.scorers
    }

    /// Sources the configuration consumes and the datatype each must be coerced to.
    pub fn required_sources(&self) -> &BTreeMap<String, InputKind> {
        &self.required
    }

    pub fn evaluate(&self, raw: &RawTable) -> Result<Evaluation, DecisionError> {
        let mut diagnostics = Diagnostics::new();
        let ignored_metrics = to_owned(self.graph.ignored_metrics());
        let ignored_measures = to_owned(self.graph.ignored_measures());
        for name in ignored_metrics.iter().chain(&ignored_measures) {
            diagnostics.warn(
                Stage::Graph,
                name.as_str(),
                format!("has no path to final metric '{}'", self.graph.final_metric()),
            );
        }
        let unused_measures = self.unused_measures();
        for name in &unused_measures {
            diagnostics.warn(
                Stage::Weighting,
                name.as_str(),
                "carries zero weight in every metric",
            );
        }

        let sources = sources::resolve(
            raw,
            &self.required,
            &self.fetchers,
            ResolveOptions {
                evaluate_expressions: self.options.evaluate_expressions,
            },
            &mut diagnostics,
        )?;
        let scores = score_measures(&self.scorers, &sources, &mut diagnostics)?;

        let order = self.graph.evaluation_order();
        let results = aggregate(&scores, &self.weights, &order, &mut diagnostics)?;
        let ranking = Ranking::from_results(&results, self.graph.final_metric())?;

        if let Some(winner) = ranking.winner() {
            tracing::info!(
                final_metric = ranking.metric(),
                winner = %winner.choice,
                score = winner.score,
                choices = ranking.entries().len(),
                "decision evaluated"
            );
        }

        Ok(Evaluation {
            sources,
            scores,
            weights: self.weights.clone(),
            results,
            ranking,
            evaluation_order: to_owned(order),
            print_order: to_owned(self.graph.print_order()),
            ignored_metrics,
            ignored_measures,
            unused_measures,
            diagnostics,
        })
    }

    fn unused_measures(&self) -> Vec<String> {
        self.weights
            .unused_columns()
            .into_iter()
            .filter(|name| self.config.measure(name).is_some())
            .map(str::to_string)
            .collect()
    }
}

/// Validate `config` and evaluate it against `raw` in one call.
pub fn evaluate(
    config: &DecisionConfig,
    raw: &RawTable,
    fetchers: FetcherRegistry,
    options: EvaluationOptions,
) -> Result<Evaluation, DecisionError> {
    DecisionEngine::new(config.clone())?
        .with_fetchers(fetchers)
        .with_options(options)
        .evaluate(raw)
}

fn to_owned(names: Vec<&str>) -> Vec<String> {
    names.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, SchemaMismatch};
    use crate::model::{Factor, Measure, Metric};
    use crate::scorers::ScorerConfig;
    use crate::sources::{RawValue, StaticFetcher};

    fn config() -> DecisionConfig {
        DecisionConfig {
            measures: vec![
                Measure {
                    name: "looks".to_string(),
                    source: "rating".to_string(),
                    scoring: ScorerConfig::Star { min: 1, max: 5 },
                    doc: None,
                },
                Measure {
                    name: "garage".to_string(),
                    source: "has_garage".to_string(),
                    scoring: ScorerConfig::Bool { good: true },
                    doc: None,
                },
            ],
            metrics: vec![Metric {
                name: "final".to_string(),
                factors: vec![Factor::new("looks", 3.0), Factor::new("garage", 1.0)],
            }],
            final_metric: "final".to_string(),
            fetchers: Default::default(),
        }
    }

    fn raw() -> RawTable {
        RawTable::new(vec!["a".to_string(), "b".to_string()])
            .and_then(|table| {
                table.with_column("rating", vec![RawValue::Integer(5), RawValue::Integer(3)])
            })
            .and_then(|table| {
                table.with_column(
                    "has_garage",
                    vec![RawValue::Boolean(false), RawValue::Boolean(true)],
                )
            })
            .expect("valid raw table")
    }

    #[test]
    fn evaluates_and_ranks() {
        let engine = DecisionEngine::new(config()).expect("valid config");
        let evaluation = engine.evaluate(&raw()).expect("evaluates");

        assert_eq!(evaluation.results.value("a", "final"), Some(0.75));
        assert_eq!(evaluation.results.value("b", "final"), Some(0.625));
        assert_eq!(evaluation.winner().map(|entry| entry.choice.as_str()), Some("a"));
        assert_eq!(evaluation.evaluation_order, vec!["final"]);
        assert_eq!(evaluation.print_order, vec!["final"]);
        assert!(evaluation.ignored_metrics.is_empty());
    }

    #[test]
    fn fetchers_fill_missing_sources() {
        let table = RawTable::new(vec!["a".to_string(), "b".to_string()])
            .and_then(|table| {
                table.with_column("rating", vec![RawValue::Integer(5), RawValue::Integer(3)])
            })
            .expect("valid raw table");
        let mut fetchers = FetcherRegistry::new();
        fetchers.register(
            "has_garage",
            StaticFetcher::new(
                InputKind::Boolean,
                [("a", RawValue::Boolean(false)), ("b", RawValue::Boolean(true))],
            ),
        );

        let evaluation = evaluate(&config(), &table, fetchers, EvaluationOptions::default())
            .expect("evaluates");
        let supplied = DecisionEngine::new(config())
            .expect("valid config")
            .evaluate(&raw())
            .expect("evaluates");
        assert_eq!(evaluation.sources, supplied.sources);
        assert_eq!(evaluation.results, supplied.results);
        assert_eq!(evaluation.ranking, supplied.ranking);
    }

    #[test]
    fn configuration_errors_surface_at_construction() {
        let mut broken = config();
        broken.metrics[0].factors.push(Factor::new("speed", 1.0));
        assert_eq!(
            DecisionEngine::new(broken).map(|_| ()),
            Err(DecisionError::Config(ConfigError::UnknownFactor {
                metric: "final".to_string(),
                factor: "speed".to_string(),
            }))
        );
    }

    #[test]
    fn missing_source_without_fetcher_is_a_schema_mismatch() {
        let table = RawTable::new(vec!["a".to_string()])
            .and_then(|table| table.with_column("rating", vec![RawValue::Integer(5)]))
            .expect("valid raw table");
        let error = DecisionEngine::new(config())
            .expect("valid config")
            .evaluate(&table)
            .expect_err("has_garage missing");
        assert_eq!(
            error,
            DecisionError::Schema(SchemaMismatch::MissingSources(vec!["has_garage".to_string()]))
        );
    }

    #[test]
    fn unreachable_nodes_are_reported_as_warnings() {
        let mut config = config();
        config.metrics.push(Metric {
            name: "side".to_string(),
            factors: vec![Factor::new("garage", 1.0)],
        });
        let evaluation = DecisionEngine::new(config)
            .expect("valid config")
            .evaluate(&raw())
            .expect("evaluates");

        assert_eq!(evaluation.ignored_metrics, vec!["side"]);
        assert_eq!(evaluation.results.columns(), ["final".to_string(), "side".to_string()]);
        assert!(evaluation
            .diagnostics
            .warnings()
            .any(|entry| entry.subject == "side"));
    }

    #[test]
    fn zero_weight_measure_is_reported_by_the_weighting_stage() {
        let mut config = config();
        config.metrics[0].factors[1].weight = 0.0;
        let evaluation = DecisionEngine::new(config)
            .expect("valid config")
            .evaluate(&raw())
            .expect("evaluates");

        assert_eq!(evaluation.unused_measures, vec!["garage"]);
        assert_eq!(evaluation.results.value("b", "final"), Some(0.5));
        let warning = evaluation
            .diagnostics
            .warnings()
            .find(|entry| entry.subject == "garage")
            .expect("garage flagged");
        assert_eq!(warning.stage, Stage::Weighting);
    }
}
