use crate::graph::NodeKind;
use crate::sources::SourceTable;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRow {
    pub rank: usize,
    pub choice: String,
    pub score: f64,
    pub percent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorShare {
    pub name: String,
    pub kind: NodeKind,
    /// Normalized weight in `[0, 1]`.
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricBreakdown {
    pub metric: String,
    pub factors: Vec<FactorShare>,
}

impl MetricBreakdown {
    /// `final = 67% smart + 33% fun`
    pub fn formula(&self) -> String {
        let terms: Vec<String> = self
            .factors
            .iter()
            .map(|factor| format!("{} {}", percent(factor.weight), factor.name))
            .collect();
        format!("{} = {}", self.metric, terms.join(" + "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureView {
    pub name: String,
    pub source: String,
    pub scorer: &'static str,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// Resolved source values as display strings, one row per choice, columns sorted by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceGrid {
    pub columns: Vec<String>,
    pub rows: Vec<SourceRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRow {
    pub choice: String,
    pub cells: Vec<String>,
}

impl SourceGrid {
    pub fn from_sources(sources: &SourceTable) -> Self {
        let columns: Vec<String> = sources.column_names().map(str::to_string).collect();
        let rows = sources
            .choices()
            .iter()
            .enumerate()
            .map(|(index, choice)| SourceRow {
                choice: choice.clone(),
                cells: sources
                    .columns()
                    .map(|(_, column)| column.display_cell(index).unwrap_or_default())
                    .collect(),
            })
            .collect();
        Self { columns, rows }
    }
}

impl fmt::Display for SourceGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_width = self
            .rows
            .iter()
            .map(|row| row.choice.len())
            .max()
            .unwrap_or(0)
            .max("choice".len());
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(col, name)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.cells.get(col))
                    .map(String::len)
                    .fold(name.len(), usize::max)
            })
            .collect();

        write!(f, "{:<label_width$}", "choice")?;
        for (column, width) in self.columns.iter().zip(&widths) {
            write!(f, "  {column:>width$}")?;
        }
        writeln!(f)?;
        for row in &self.rows {
            write!(f, "{:<label_width$}", row.choice)?;
            for (cell, width) in row.cells.iter().zip(&widths) {
                write!(f, "  {cell:>width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

pub(crate) fn percent(value: f64) -> String {
    let scaled = value * 100.0;
    if (scaled - scaled.round()).abs() < 1e-9 {
        format!("{scaled:.0}%")
    } else {
        format!("{scaled:.1}%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_lists_normalized_shares() {
        let breakdown = MetricBreakdown {
            metric: "final".to_string(),
            factors: vec![
                FactorShare {
                    name: "smart".to_string(),
                    kind: NodeKind::Metric,
                    weight: 0.67,
                },
                FactorShare {
                    name: "fun".to_string(),
                    kind: NodeKind::Metric,
                    weight: 0.33,
                },
            ],
        };
        assert_eq!(breakdown.formula(), "final = 67% smart + 33% fun");
        assert_eq!(percent(1.0 / 3.0), "33.3%");
    }

    #[test]
    fn source_grid_aligns_resolved_values() {
        let grid = SourceGrid {
            columns: vec!["price".to_string(), "rating".to_string()],
            rows: vec![
                SourceRow {
                    choice: "north".to_string(),
                    cells: vec!["39999.5".to_string(), "5".to_string()],
                },
                SourceRow {
                    choice: "south".to_string(),
                    cells: vec!["100".to_string(), "1".to_string()],
                },
            ],
        };
        assert_eq!(
            grid.to_string(),
            "choice    price  rating\nnorth   39999.5       5\nsouth       100       1\n"
        );
    }
}
