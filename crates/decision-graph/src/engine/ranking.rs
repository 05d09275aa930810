use crate::error::ShapeError;
use crate::table::Table;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    /// 1-based position.
    pub rank: usize,
    pub choice: String,
    pub score: f64,
}

/// Choices sorted by one metric, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    metric: String,
    entries: Vec<RankEntry>,
}

impl Ranking {
    /// Rank by `metric`, descending; equal scores keep input choice order.
    pub fn from_results(results: &Table, metric: &str) -> Result<Self, ShapeError> {
        let scores = results
            .column(metric)
            .ok_or_else(|| ShapeError::MissingColumn {
                table: "results".to_string(),
                column: metric.to_string(),
            })?;

        let mut ranked: Vec<(&String, f64)> = results.choices().iter().zip(scores).collect();
        ranked.sort_by(|left, right| right.1.total_cmp(&left.1));

        Ok(Self {
            metric: metric.to_string(),
            entries: ranked
                .into_iter()
                .enumerate()
                .map(|(index, (choice, score))| RankEntry {
                    rank: index + 1,
                    choice: choice.clone(),
                    score,
                })
                .collect(),
        })
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn entries(&self) -> &[RankEntry] {
        &self.entries
    }

    /// The answer: the top-ranked choice.
    pub fn winner(&self) -> Option<&RankEntry> {
        self.entries.first()
    }

    pub fn choices(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.choice.as_str())
            .collect()
    }
}
