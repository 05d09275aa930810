use super::views::{
    percent, FactorShare, MeasureView, MetricBreakdown, RankingRow, SourceGrid,
};
use crate::diagnostics::Diagnostic;
use crate::engine::{DecisionEngine, Evaluation, MeasureScorer};
use crate::graph::NodeKind;
use crate::model::DecisionConfig;
use crate::table::Table;
use crate::weights::WeightMatrix;
use serde::Serialize;
use std::fmt::Write;

/// Display-ready outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionReport {
    pub final_metric: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    pub ranking: Vec<RankingRow>,
    /// Metrics feeding the final metric, final first.
    pub metrics: Vec<MetricBreakdown>,
    pub measures: Vec<MeasureView>,
    pub sources: SourceGrid,
    pub scores: Table,
    pub results: Table,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored_metrics: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored_measures: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unused_factors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl DecisionReport {
    /// `engine` must be the one that produced `evaluation`.
    pub fn from_evaluation(evaluation: &Evaluation, engine: &DecisionEngine) -> Self {
        let ranking = evaluation
            .ranking
            .entries()
            .iter()
            .map(|entry| RankingRow {
                rank: entry.rank,
                choice: entry.choice.clone(),
                score: entry.score,
                percent: percent(entry.score),
            })
            .collect();

        Self {
            final_metric: evaluation.ranking.metric().to_string(),
            winner: evaluation.winner().map(|entry| entry.choice.clone()),
            ranking,
            metrics: breakdowns(
                &evaluation.weights,
                &evaluation.print_order,
                engine.config(),
            ),
            measures: engine
                .scorers()
                .iter()
                .map(|entry| measure_view(entry, engine.config()))
                .collect(),
            sources: SourceGrid::from_sources(&evaluation.sources),
            scores: evaluation.scores.clone(),
            results: evaluation.results.clone(),
            ignored_metrics: evaluation.ignored_metrics.clone(),
            ignored_measures: evaluation.ignored_measures.clone(),
            unused_factors: evaluation.unused_measures.clone(),
            diagnostics: evaluation.diagnostics.entries().to_vec(),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Decision: {}", self.final_metric);
        if let Some(row) = self.ranking.first() {
            let _ = writeln!(out, "Winner: {} ({})", row.choice, row.percent);
        }

        section(&mut out, "Ranking");
        let width = self
            .ranking
            .iter()
            .map(|row| row.choice.len())
            .max()
            .unwrap_or(0);
        for row in &self.ranking {
            let _ = writeln!(
                out,
                "{:>3}. {:<width$}  {:>6}",
                row.rank, row.choice, row.percent
            );
        }

        section(&mut out, "Sources");
        let _ = write!(out, "{}", self.sources);
        section(&mut out, "Scores");
        let _ = write!(out, "{}", self.scores);
        section(&mut out, "Results");
        let _ = write!(out, "{}", self.results);

        section(&mut out, "Metrics");
        for breakdown in &self.metrics {
            let _ = writeln!(out, "{}", breakdown.formula());
        }

        render_measures(&mut out, &self.measures);
        render_list(&mut out, "Ignored metrics", &self.ignored_metrics);
        render_list(&mut out, "Ignored measures", &self.ignored_measures);
        render_list(&mut out, "Unused factors", &self.unused_factors);

        if !self.diagnostics.is_empty() {
            section(&mut out, "Diagnostics");
            for diagnostic in &self.diagnostics {
                let _ = writeln!(out, "{diagnostic}");
            }
        }
        out
    }
}

/// Structure of a configuration without any data: what would be evaluated and how.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSummary {
    pub final_metric: String,
    pub evaluation_order: Vec<String>,
    pub print_order: Vec<String>,
    pub metrics: Vec<MetricBreakdown>,
    pub measures: Vec<MeasureView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored_metrics: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored_measures: Vec<String>,
}

impl ConfigSummary {
    pub fn from_engine(engine: &DecisionEngine) -> Self {
        let graph = engine.graph();
        let print_order = owned(graph.print_order());
        Self {
            final_metric: graph.final_metric().to_string(),
            evaluation_order: owned(graph.evaluation_order()),
            metrics: breakdowns(engine.weights(), &print_order, engine.config()),
            print_order,
            measures: engine
                .scorers()
                .iter()
                .map(|entry| measure_view(entry, engine.config()))
                .collect(),
            ignored_metrics: owned(graph.ignored_metrics()),
            ignored_measures: owned(graph.ignored_measures()),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Final metric: {}", self.final_metric);
        let _ = writeln!(
            out,
            "Evaluation order: {}",
            self.evaluation_order.join(", ")
        );
        let _ = writeln!(out, "Print order: {}", self.print_order.join(", "));

        section(&mut out, "Metrics");
        for breakdown in &self.metrics {
            let _ = writeln!(out, "{}", breakdown.formula());
        }
        render_measures(&mut out, &self.measures);
        render_list(&mut out, "Ignored metrics", &self.ignored_metrics);
        render_list(&mut out, "Ignored measures", &self.ignored_measures);
        out
    }
}

fn breakdowns(
    weights: &WeightMatrix,
    order: &[String],
    config: &DecisionConfig,
) -> Vec<MetricBreakdown> {
    order
        .iter()
        .map(|metric| MetricBreakdown {
            metric: metric.clone(),
            factors: weights
                .active_factors(metric)
                .into_iter()
                .map(|(name, weight)| FactorShare {
                    name: name.to_string(),
                    kind: if config.measure(name).is_some() {
                        NodeKind::Measure
                    } else {
                        NodeKind::Metric
                    },
                    weight,
                })
                .collect(),
        })
        .collect()
}

fn measure_view(entry: &MeasureScorer, config: &DecisionConfig) -> MeasureView {
    MeasureView {
        name: entry.measure.clone(),
        source: entry.source.clone(),
        scorer: entry.scorer.code(),
        description: entry.scorer.describe(),
        doc: config
            .measure(&entry.measure)
            .and_then(|measure| measure.doc.clone()),
    }
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{title}\n{}", "-".repeat(title.len()));
}

fn render_measures(out: &mut String, measures: &[MeasureView]) {
    section(out, "Measures");
    for measure in measures {
        let _ = writeln!(
            out,
            "{} (source '{}', {} scorer)",
            measure.name, measure.source, measure.scorer
        );
        if let Some(doc) = &measure.doc {
            let _ = writeln!(out, "  {doc}");
        }
        for line in measure.description.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }
}

fn render_list(out: &mut String, title: &str, names: &[String]) {
    if !names.is_empty() {
        let _ = writeln!(out, "\n{title}: {}", names.join(", "));
    }
}

fn owned(names: Vec<&str>) -> Vec<String> {
    names.into_iter().map(str::to_string).collect()
}
