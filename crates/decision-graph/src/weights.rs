use crate::error::{ConfigError, ShapeError};
use crate::graph::EvaluationGraph;
use crate::model::DecisionConfig;
use serde::Serialize;
use std::fmt;

const TOLERANCE: f64 = 1e-9;

/// Row-stochastic weights: one row per metric over every measure and metric column.
///
/// Columns are measures in declaration order followed by metrics in declaration order. A factor
/// a metric does not reference holds zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightMatrix {
    metrics: Vec<String>,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl WeightMatrix {
    pub fn build(config: &DecisionConfig) -> Result<Self, ConfigError> {
        let metrics: Vec<String> = config
            .metrics
            .iter()
            .map(|metric| metric.name.clone())
            .collect();
        let columns: Vec<String> = config
            .measures
            .iter()
            .map(|measure| measure.name.clone())
            .chain(metrics.iter().cloned())
            .collect();

        let mut rows = Vec::with_capacity(metrics.len());
        for metric in &config.metrics {
            let mut row = vec![0.0; columns.len()];
            for factor in &metric.factors {
                let index = columns
                    .iter()
                    .position(|column| *column == factor.name)
                    .ok_or_else(|| ConfigError::UnknownFactor {
                        metric: metric.name.clone(),
                        factor: factor.name.clone(),
                    })?;
                row[index] += factor.weight;
            }

            let total: f64 = row.iter().sum();
            if !total.is_finite() {
                return Err(ConfigError::WeightOverflow {
                    metric: metric.name.clone(),
                });
            }
            if total <= 0.0 {
                return Err(ConfigError::ZeroWeight {
                    metric: metric.name.clone(),
                });
            }
            for weight in &mut row {
                *weight /= total;
            }
            rows.push(row);
        }

        Ok(Self {
            metrics,
            columns,
            rows,
        })
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row(&self, metric: &str) -> Option<&[f64]> {
        let index = self.metrics.iter().position(|name| name == metric)?;
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn weight(&self, metric: &str, factor: &str) -> Option<f64> {
        let col = self.columns.iter().position(|name| name == factor)?;
        self.row(metric).map(|row| row[col])
    }

    /// Non-zero `(factor, weight)` pairs of `metric`, in column order.
    pub fn active_factors(&self, metric: &str) -> Vec<(&str, f64)> {
        self.row(metric)
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .filter(|(_, weight)| **weight > 0.0)
                    .map(|(name, weight)| (name.as_str(), *weight))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Columns no metric gives any weight to.
    pub fn unused_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(col, _)| self.rows.iter().all(|row| row[*col] == 0.0))
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// Check every row against the graph's edge weights, renormalized per metric.
    pub fn cross_check(&self, graph: &EvaluationGraph) -> Result<(), ShapeError> {
        for (metric, row) in self.metrics.iter().zip(&self.rows) {
            let factors = graph.factors(metric);
            let total: f64 = factors.iter().map(|(_, weight)| weight).sum();

            for (column, &matrix) in self.columns.iter().zip(row) {
                let declared = factors
                    .iter()
                    .find(|(name, _)| *name == column.as_str())
                    .map_or(0.0, |(_, weight)| *weight);
                let expected = if total.is_finite() && total > 0.0 {
                    declared / total
                } else {
                    0.0
                };
                if (matrix - expected).abs() > TOLERANCE {
                    return Err(ShapeError::WeightDisagreement {
                        metric: metric.clone(),
                        factor: column.clone(),
                        matrix,
                        graph: expected,
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for WeightMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_width = self
            .metrics
            .iter()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max("metric".len());

        write!(f, "{:<label_width$}", "metric")?;
        for column in &self.columns {
            write!(f, "  {column:>6}")?;
        }
        writeln!(f)?;
        for (metric, row) in self.metrics.iter().zip(&self.rows) {
            write!(f, "{metric:<label_width$}")?;
            for (column, weight) in self.columns.iter().zip(row) {
                let width = column.len().max(6);
                write!(f, "  {weight:>width$.4}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
