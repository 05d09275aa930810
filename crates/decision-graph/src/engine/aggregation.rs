use crate::diagnostics::{Diagnostics, Stage};
use crate::error::ShapeError;
use crate::table::Table;
use crate::weights::WeightMatrix;

/// Evaluate metrics in `order`, each as the dot product of its weight row with the working row.
///
/// The working table holds measure scores followed by metric values; metric cells start unset
/// and are filled as their metric is evaluated. Reading an unset cell with non-zero weight is a
/// [`ShapeError::Unevaluated`]. Returns one column per metric, in weight-matrix order.
pub fn aggregate(
    scores: &Table,
    weights: &WeightMatrix,
    order: &[&str],
    diagnostics: &mut Diagnostics,
) -> Result<Table, ShapeError> {
    let metrics = weights.metrics();
    let expected: Vec<String> = scores.columns().iter().chain(metrics).cloned().collect();
    if expected.as_slice() != weights.columns() {
        return Err(ShapeError::ColumnMismatch {
            weights: weights.columns().to_vec(),
            scores: expected,
        });
    }

    let width = expected.len();
    let measure_count = scores.columns().len();
    let mut working = Vec::with_capacity(scores.choices().len());
    for (choice, row) in scores.rows() {
        if row.len() != measure_count {
            return Err(ShapeError::RowLength {
                choice: choice.to_string(),
                expected: measure_count,
                found: row.len(),
            });
        }
        let mut cells: Vec<Option<f64>> = row.iter().copied().map(Some).collect();
        cells.resize(width, None);
        working.push(cells);
    }

    for metric in order {
        let missing = || ShapeError::MissingColumn {
            table: "weights".to_string(),
            column: metric.to_string(),
        };
        let row_weights = weights.row(metric).ok_or_else(missing)?;
        let target = weights
            .columns()
            .iter()
            .position(|column| column == metric)
            .ok_or_else(missing)?;

        for cells in &mut working {
            let mut value = 0.0;
            for (col, &weight) in row_weights.iter().enumerate() {
                if weight == 0.0 {
                    continue;
                }
                let cell = cells[col].ok_or_else(|| ShapeError::Unevaluated {
                    metric: metric.to_string(),
                    factor: expected[col].clone(),
                })?;
                value += weight * cell;
            }
            cells[target] = Some(value);
        }
        diagnostics.info(
            Stage::Aggregation,
            *metric,
            format!("evaluated for {} choice(s)", working.len()),
        );
    }

    let mut results = Table::zeros(scores.choices().to_vec(), metrics.to_vec());
    for (row, cells) in working.iter().enumerate() {
        for (col, metric) in metrics.iter().enumerate() {
            let value = cells[measure_count + col].ok_or_else(|| ShapeError::Unevaluated {
                metric: metric.clone(),
                factor: metric.clone(),
            })?;
            results.set(row, col, value);
        }
    }

    tracing::debug!("metric results:\n{results}");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DecisionConfig, Factor, Measure, Metric};
    use crate::scorers::ScorerConfig;

    fn choices() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    fn scores() -> Table {
        Table::from_columns(
            choices(),
            vec![
                ("x".to_string(), vec![0.0, 1.0]),
                ("y".to_string(), vec![1.0, 0.5]),
            ],
        )
        .expect("aligned columns")
    }

    fn weights() -> WeightMatrix {
        let measure = |name: &str| Measure {
            name: name.to_string(),
            source: format!("{name}_raw"),
            scoring: ScorerConfig::Relative { invert: false },
            doc: None,
        };
        WeightMatrix::build(&DecisionConfig {
            measures: vec![measure("x"), measure("y")],
            metrics: vec![
                Metric {
                    name: "final".to_string(),
                    factors: vec![Factor::new("inner", 1.0), Factor::new("y", 1.0)],
                },
                Metric {
                    name: "inner".to_string(),
                    factors: vec![Factor::new("x", 3.0), Factor::new("y", 1.0)],
                },
            ],
            final_metric: "final".to_string(),
            fetchers: Default::default(),
        })
        .expect("valid weights")
    }

    #[test]
    fn metrics_read_previously_evaluated_metrics() {
        let mut diagnostics = Diagnostics::new();
        let results = aggregate(&scores(), &weights(), &["inner", "final"], &mut diagnostics)
            .expect("dependency order");

        assert_eq!(results.columns(), ["final".to_string(), "inner".to_string()]);
        assert_eq!(results.value("a", "inner"), Some(0.25));
        assert_eq!(results.value("b", "inner"), Some(0.875));
        assert_eq!(results.value("a", "final"), Some(0.625));
        assert_eq!(results.value("b", "final"), Some(0.6875));
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn reading_an_unset_metric_is_a_shape_error() {
        let mut diagnostics = Diagnostics::new();
        let error = aggregate(&scores(), &weights(), &["final", "inner"], &mut diagnostics)
            .expect_err("final needs inner first");
        assert_eq!(
            error,
            ShapeError::Unevaluated {
                metric: "final".to_string(),
                factor: "inner".to_string(),
            }
        );
    }

    #[test]
    fn skipped_metric_leaves_results_incomplete() {
        let mut diagnostics = Diagnostics::new();
        let error = aggregate(&scores(), &weights(), &["inner"], &mut diagnostics)
            .expect_err("final never evaluated");
        assert!(matches!(error, ShapeError::Unevaluated { ref metric, .. } if metric == "final"));
    }

    #[test]
    fn score_columns_must_match_weight_columns() {
        let misaligned = Table::from_columns(
            choices(),
            vec![
                ("y".to_string(), vec![1.0, 0.5]),
                ("x".to_string(), vec![0.0, 1.0]),
            ],
        )
        .expect("aligned columns");
        let mut diagnostics = Diagnostics::new();
        let error = aggregate(&misaligned, &weights(), &["inner", "final"], &mut diagnostics)
            .expect_err("column order differs");
        assert!(matches!(error, ShapeError::ColumnMismatch { .. }));
    }
}
