use crate::graph::NodeKind;
use crate::sources::RawValue;

/// Structurally invalid decision configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("name '{name}' is declared twice (already used by a {existing})")]
    DuplicateName { name: String, existing: NodeKind },
    #[error("metric '{metric}' references unknown factor '{factor}'")]
    UnknownFactor { metric: String, factor: String },
    #[error("metric '{metric}' uses source '{factor}' directly; factors must be measures or metrics")]
    SourceAsFactor { metric: String, factor: String },
    #[error("metric '{metric}' lists factor '{factor}' more than once")]
    DuplicateFactor { metric: String, factor: String },
    #[error("metric '{metric}' gives factor '{factor}' invalid weight {weight}")]
    InvalidWeight {
        metric: String,
        factor: String,
        weight: f64,
    },
    #[error("metric '{metric}' has zero total weight")]
    ZeroWeight { metric: String },
    #[error("metric '{metric}' has weights whose sum is not finite")]
    WeightOverflow { metric: String },
    #[error("metric '{metric}' has no factors")]
    EmptyMetric { metric: String },
    #[error("dependency graph is not acyclic: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },
    #[error("final metric '{0}' is not declared")]
    UnknownFinal(String),
    #[error("final selector '{name}' names a {kind}, not a metric")]
    FinalNotMetric { name: String, kind: NodeKind },
    #[error("source '{source_name}' is consumed as {first} and as {second}")]
    ConflictingInputKinds {
        source_name: String,
        first: crate::scorers::InputKind,
        second: crate::scorers::InputKind,
    },
}

/// Raw or fetched columns do not line up with the sources the configuration requires.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaMismatch {
    #[error("no data or fetcher for source(s): {}", .0.join(", "))]
    MissingSources(Vec<String>),
    #[error("data provides column(s) no measure consumes: {}", .0.join(", "))]
    UnexpectedSources(Vec<String>),
    #[error("choice '{0}' appears more than once")]
    DuplicateChoice(String),
    #[error("column '{0}' appears more than once")]
    DuplicateColumn(String),
    #[error("column '{column}' has {found} values for {expected} choices")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("missing value for choice '{choice}' in column '{column}'")]
    MissingValue { choice: String, column: String },
    #[error("input table has no '{0}' column")]
    MissingChoiceColumn(String),
    #[error("input table has no choices")]
    NoChoices,
}

/// An external fetcher could not resolve every requested choice.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("fetcher for '{source_name}' could not resolve choice(s): {}", .choices.join(", "))]
    Unresolved {
        source_name: String,
        choices: Vec<String>,
    },
    #[error("fetcher for '{source_name}' returned {returned} value(s) for {expected} choice(s)")]
    LengthMismatch {
        source_name: String,
        expected: usize,
        returned: usize,
    },
    #[error("fetcher for '{source_name}' returned {value} for '{choice}', expected {expected}")]
    WrongType {
        source_name: String,
        choice: String,
        value: RawValue,
        expected: crate::scorers::InputKind,
    },
    #[error("fetcher for '{source_name}' failed: {message}")]
    Backend {
        source_name: String,
        message: String,
    },
}

/// A scorer precondition was violated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("invalid scorer for measure '{measure}': {reason}")]
    InvalidScorer { measure: String, reason: String },
    #[error("measure '{measure}': value {value} for '{choice}' is outside {domain}")]
    OutOfDomain {
        measure: String,
        choice: String,
        value: f64,
        domain: String,
    },
    #[error("measure '{measure}': all values equal {value}, relative scale is undefined")]
    Degenerate { measure: String, value: f64 },
    #[error("measure '{measure}': column has {found} values, expected {expected}")]
    WrongInput {
        measure: String,
        expected: String,
        found: String,
    },
    #[error("source '{source_name}': cannot coerce {value} for '{choice}' to {target}")]
    Coercion {
        source_name: String,
        choice: String,
        value: RawValue,
        target: crate::scorers::InputKind,
    },
    #[error("measure '{measure}': produced {value} for '{choice}', outside [0, 1]")]
    OutOfUnitRange {
        measure: String,
        choice: String,
        value: f64,
    },
}

/// Internal table alignment failure between scores and weights.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShapeError {
    #[error("weight columns {weights:?} do not match score columns {scores:?}")]
    ColumnMismatch {
        weights: Vec<String>,
        scores: Vec<String>,
    },
    #[error("table '{table}' has no column '{column}'")]
    MissingColumn { table: String, column: String },
    #[error("metric '{metric}' read '{factor}' before it was evaluated")]
    Unevaluated { metric: String, factor: String },
    #[error("metric '{metric}' weight for '{factor}' is {matrix} in the matrix but {graph} in the graph")]
    WeightDisagreement {
        metric: String,
        factor: String,
        matrix: f64,
        graph: f64,
    },
    #[error("column '{column}' has {found} values for {expected} choices")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("row for '{choice}' has {found} cells, expected {expected}")]
    RowLength {
        choice: String,
        expected: usize,
        found: usize,
    },
}

/// Fatal failure of one evaluation run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecisionError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("schema mismatch: {0}")]
    Schema(#[from] SchemaMismatch),
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("scoring error: {0}")]
    Scoring(#[from] ScoringError),
    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),
}

/// Failure reading a configuration document or a raw data table.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Schema(#[from] SchemaMismatch),
}
