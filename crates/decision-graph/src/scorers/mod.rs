//! Closed catalog of scorers mapping a raw column onto scores in `[0, 1]`.
//!
//! Each scorer is built once from its [`ScorerConfig`], validating its parameters, and then
//! applied to a typed [`Column`]. Inputs outside a scorer's domain are rejected, never clamped.

mod config;
mod discrete;
mod linear;

pub use config::{BucketConfig, Knot, ScorerConfig};
pub use discrete::{Bucket, BoolScorer};
pub use linear::{Interpolate, Relative, Star};

use crate::error::ScoringError;
use crate::table::Column;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Datatype a scorer requires from its source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Integer,
    Float,
    Boolean,
}

impl InputKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a scorer refused a column; mapped onto [`ScoringError`] with names attached.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Rejection {
    OutOfDomain {
        index: usize,
        value: f64,
        domain: String,
    },
    Degenerate {
        value: f64,
    },
}

/// A validated scorer ready to be applied to columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Scorer {
    Star(Star),
    Bucket(Bucket),
    Relative(Relative),
    Interpolate(Interpolate),
    Range {
        worst: f64,
        best: f64,
        curve: Interpolate,
    },
    Bool(BoolScorer),
}

impl Scorer {
    /// Validate `config` and build the scorer for `measure`.
    pub fn from_config(measure: &str, config: &ScorerConfig) -> Result<Self, ScoringError> {
        let invalid = |reason: String| ScoringError::InvalidScorer {
            measure: measure.to_string(),
            reason,
        };

        let scorer = match config {
            ScorerConfig::Star { min, max } => Scorer::Star(Star::new(*min, *max).map_err(invalid)?),
            ScorerConfig::Bucket { buckets } => {
                Scorer::Bucket(Bucket::new(buckets.clone()).map_err(invalid)?)
            }
            ScorerConfig::Relative { invert } => Scorer::Relative(Relative::new(*invert)),
            ScorerConfig::Interpolate { knots } => {
                Scorer::Interpolate(Interpolate::new(knots.clone()).map_err(invalid)?)
            }
            ScorerConfig::Range { worst, best } => {
                let curve = Interpolate::range(*worst, *best).map_err(invalid)?;
                Scorer::Range {
                    worst: *worst,
                    best: *best,
                    curve,
                }
            }
            ScorerConfig::Bool { good } => Scorer::Bool(BoolScorer::new(*good)),
        };

        Ok(scorer)
    }

    pub const fn input_kind(&self) -> InputKind {
        match self {
            Scorer::Star(_) => InputKind::Integer,
            Scorer::Bool(_) => InputKind::Boolean,
            Scorer::Bucket(_)
            | Scorer::Relative(_)
            | Scorer::Interpolate(_)
            | Scorer::Range { .. } => InputKind::Float,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Scorer::Star(_) => "star",
            Scorer::Bucket(_) => "bucket",
            Scorer::Relative(_) => "relative",
            Scorer::Interpolate(_) => "interpolate",
            Scorer::Range { .. } => "range",
            Scorer::Bool(_) => "bool",
        }
    }

    /// Score `column` for `measure`; `choices` name the rows for error reporting.
    ///
    /// The column must already hold this scorer's [`InputKind`]. Every returned value is checked
    /// to lie in `[0, 1]`.
    pub fn score(
        &self,
        measure: &str,
        choices: &[String],
        column: &Column,
    ) -> Result<Vec<f64>, ScoringError> {
        let wrong_input = || ScoringError::WrongInput {
            measure: measure.to_string(),
            expected: self.input_kind().label().to_string(),
            found: column.kind_label().to_string(),
        };

        let scored = match (self, column) {
            (Scorer::Star(star), Column::Integer(values)) => star.score(values),
            (Scorer::Bucket(bucket), Column::Float(values)) => bucket.score(values),
            (Scorer::Relative(relative), Column::Float(values)) => relative.score(values),
            (Scorer::Interpolate(curve), Column::Float(values)) => curve.score(values),
            (Scorer::Range { curve, .. }, Column::Float(values)) => curve.score(values),
            (Scorer::Bool(flag), Column::Boolean(values)) => Ok(flag.score(values)),
            _ => return Err(wrong_input()),
        };

        let scores = scored.map_err(|rejection| match rejection {
            Rejection::OutOfDomain {
                index,
                value,
                domain,
            } => ScoringError::OutOfDomain {
                measure: measure.to_string(),
                choice: choice_name(choices, index),
                value,
                domain,
            },
            Rejection::Degenerate { value } => ScoringError::Degenerate {
                measure: measure.to_string(),
                value,
            },
        })?;

        if let Some(index) = scores
            .iter()
            .position(|score| !(0.0..=1.0).contains(score))
        {
            return Err(ScoringError::OutOfUnitRange {
                measure: measure.to_string(),
                choice: choice_name(choices, index),
                value: scores[index],
            });
        }

        Ok(scores)
    }

    /// Human-readable description of how raw values become scores.
    pub fn describe(&self) -> String {
        match self {
            Scorer::Star(star) => star.describe(),
            Scorer::Bucket(bucket) => bucket.describe(),
            Scorer::Relative(relative) => relative.describe(),
            Scorer::Interpolate(curve) => curve.describe(),
            Scorer::Range { worst, best, .. } => format!(
                "Linearly interpolated with {worst} mapped to 0% and {best} mapped to 100%."
            ),
            Scorer::Bool(flag) => flag.describe(),
        }
    }
}

fn choice_name(choices: &[String], index: usize) -> String {
    choices
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("#{index}"))
}
