use serde::{Deserialize, Serialize};

/// Scorer selection and parameters for one measure, tagged by scorer name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerConfig {
    /// Integer scale such as 1 to 5 stars.
    Star { min: i64, max: i64 },
    /// Contiguous half-open intervals, each mapped to a fixed score.
    Bucket { buckets: Vec<BucketConfig> },
    /// Min-max normalization over the column itself.
    Relative {
        #[serde(default)]
        invert: bool,
    },
    /// Piecewise-linear curve through `(in, out)` knots.
    Interpolate { knots: Vec<Knot> },
    /// Linear scale where `worst` scores 0 and `best` scores 1.
    Range { worst: f64, best: f64 },
    /// Boolean observation; `good` is the value that scores 1.
    Bool { good: bool },
}

impl ScorerConfig {
    pub const fn code(&self) -> &'static str {
        match self {
            ScorerConfig::Star { .. } => "star",
            ScorerConfig::Bucket { .. } => "bucket",
            ScorerConfig::Relative { .. } => "relative",
            ScorerConfig::Interpolate { .. } => "interpolate",
            ScorerConfig::Range { .. } => "range",
            ScorerConfig::Bool { .. } => "bool",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    pub min: f64,
    pub max: f64,
    pub val: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Knot {
    #[serde(rename = "in")]
    pub input: f64,
    #[serde(rename = "out")]
    pub output: f64,
}

impl Knot {
    pub const fn new(input: f64, output: f64) -> Self {
        Self { input, output }
    }
}
