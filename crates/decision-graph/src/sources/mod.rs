//! Source resolution: merges the user-supplied raw table with fetched columns into one typed
//! table holding exactly the sources the configuration consumes.

mod coerce;
pub mod expr;
mod fetchers;
mod normalizer;
mod reader;

pub use fetchers::{CsvLookupFetcher, Fetcher, FetcherRegistry, StaticFetcher};
pub use reader::{read_csv, read_csv_path, ReadOptions};

use crate::diagnostics::{Diagnostics, Stage};
use crate::error::{DecisionError, FetchError, SchemaMismatch};
use crate::scorers::InputKind;
use crate::table::Column;
use coerce::coerce_column;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// Untyped cell as read from the user table or returned by a fetcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl RawValue {
    pub const fn kind_label(&self) -> &'static str {
        match self {
            RawValue::Integer(_) => "integer",
            RawValue::Float(_) => "float",
            RawValue::Boolean(_) => "boolean",
            RawValue::Text(_) => "text",
        }
    }

    fn matches(&self, kind: InputKind) -> bool {
        matches!(
            (self, kind),
            (RawValue::Integer(_), InputKind::Integer | InputKind::Float)
                | (RawValue::Float(_), InputKind::Float)
                | (RawValue::Boolean(_), InputKind::Boolean)
        )
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Integer(value) => write!(f, "{value}"),
            RawValue::Float(value) => write!(f, "{value}"),
            RawValue::Boolean(value) => write!(f, "{value}"),
            RawValue::Text(value) => write!(f, "'{value}'"),
        }
    }
}

/// User-supplied observations: one row per choice, one column per provided source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    choices: Vec<String>,
    columns: BTreeMap<String, Vec<RawValue>>,
}

impl RawTable {
    /// Start a table over `choices`, which must be non-empty and unique.
    pub fn new(choices: Vec<String>) -> Result<Self, SchemaMismatch> {
        if choices.is_empty() {
            return Err(SchemaMismatch::NoChoices);
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = choices.iter().find(|choice| !seen.insert(choice.as_str())) {
            return Err(SchemaMismatch::DuplicateChoice(duplicate.clone()));
        }
        Ok(Self {
            choices,
            columns: BTreeMap::new(),
        })
    }

    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<RawValue>,
    ) -> Result<(), SchemaMismatch> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(SchemaMismatch::DuplicateColumn(name));
        }
        if values.len() != self.choices.len() {
            return Err(SchemaMismatch::ColumnLength {
                column: name,
                expected: self.choices.len(),
                found: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<RawValue>,
    ) -> Result<Self, SchemaMismatch> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn column(&self, name: &str) -> Option<&[RawValue]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Column names in alphabetical order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

/// Resolved source columns, typed for their scorers and sorted by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceTable {
    choices: Vec<String>,
    columns: BTreeMap<String, Column>,
}

impl SourceTable {
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns
            .iter()
            .map(|(name, column)| (name.as_str(), column))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Evaluate text cells with the restricted arithmetic parser.
    pub evaluate_expressions: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            evaluate_expressions: true,
        }
    }
}

/// Build the complete source table for `required` sources (name to scorer input kind).
///
/// User columns take precedence; fetchers run only for sources the user did not supply.
pub fn resolve(
    raw: &RawTable,
    required: &BTreeMap<String, InputKind>,
    registry: &FetcherRegistry,
    options: ResolveOptions,
    diagnostics: &mut Diagnostics,
) -> Result<SourceTable, DecisionError> {
    let provided: BTreeSet<&str> = raw.column_names().collect();
    let required_names: BTreeSet<&str> = required.keys().map(String::as_str).collect();

    let unexpected: Vec<String> = provided
        .difference(&required_names)
        .map(|name| name.to_string())
        .collect();
    if !unexpected.is_empty() {
        return Err(SchemaMismatch::UnexpectedSources(unexpected).into());
    }

    let missing: Vec<&str> = required_names.difference(&provided).copied().collect();
    let unresolvable: Vec<String> = missing
        .iter()
        .filter(|name| registry.get(name).is_none())
        .map(|name| name.to_string())
        .collect();
    if !unresolvable.is_empty() {
        return Err(SchemaMismatch::MissingSources(unresolvable).into());
    }

    let mut merged: BTreeMap<&str, Vec<RawValue>> = BTreeMap::new();
    for name in &provided {
        if let Some(values) = raw.column(name) {
            merged.insert(name, values.to_vec());
        }
    }
    for name in missing {
        let fetcher = registry
            .get(name)
            .ok_or_else(|| SchemaMismatch::MissingSources(vec![name.to_string()]))?;
        let values = fetch_checked(fetcher, name, raw.choices(), diagnostics)?;
        diagnostics.info(
            Stage::Resolution,
            name,
            format!("fetched {} value(s)", values.len()),
        );
        merged.insert(name, values);
    }

    let mut columns = BTreeMap::new();
    for (name, mut values) in merged {
        if options.evaluate_expressions {
            evaluate_expressions(name, raw.choices(), &mut values, diagnostics);
        }
        let kind = required[name];
        let column = coerce_column(name, raw.choices(), &values, kind, diagnostics)?;
        columns.insert(name.to_string(), column);
    }

    tracing::debug!(sources = columns.len(), "sources resolved");
    Ok(SourceTable {
        choices: raw.choices().to_vec(),
        columns,
    })
}

fn fetch_checked(
    fetcher: &dyn Fetcher,
    source: &str,
    choices: &[String],
    diagnostics: &mut Diagnostics,
) -> Result<Vec<RawValue>, FetchError> {
    let values = fetcher.fetch(source, choices, diagnostics)?;
    if values.len() != choices.len() {
        return Err(FetchError::LengthMismatch {
            source_name: source.to_string(),
            expected: choices.len(),
            returned: values.len(),
        });
    }

    let kind = fetcher.kind();
    if let Some((choice, value)) = choices
        .iter()
        .zip(&values)
        .find(|(_, value)| !value.matches(kind))
    {
        return Err(FetchError::WrongType {
            source_name: source.to_string(),
            choice: choice.clone(),
            value: value.clone(),
            expected: kind,
        });
    }

    Ok(values)
}

fn evaluate_expressions(
    source: &str,
    choices: &[String],
    values: &mut [RawValue],
    diagnostics: &mut Diagnostics,
) {
    for (choice, value) in choices.iter().zip(values.iter_mut()) {
        let RawValue::Text(text) = value else {
            continue;
        };
        if let Ok(number) = expr::evaluate(text) {
            diagnostics.info(
                Stage::Resolution,
                source,
                format!("evaluated '{text}' as {number} for '{choice}'"),
            );
            *value = match number {
                expr::Number::Integer(v) => RawValue::Integer(v),
                expr::Number::Float(v) => RawValue::Float(v),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn required(pairs: &[(&str, InputKind)]) -> BTreeMap<String, InputKind> {
        pairs
            .iter()
            .map(|(name, kind)| (name.to_string(), *kind))
            .collect()
    }

    fn raw() -> RawTable {
        RawTable::new(names(&["a", "b"]))
            .and_then(|table| {
                table.with_column("rating", vec![RawValue::Integer(1), RawValue::Integer(5)])
            })
            .and_then(|table| {
                table.with_column(
                    "power",
                    vec![
                        RawValue::Text("50+50".to_string()),
                        RawValue::Float(200.0),
                    ],
                )
            })
            .expect("valid raw table")
    }

    #[test]
    fn raw_table_rejects_duplicates_and_bad_lengths() {
        assert_eq!(
            RawTable::new(names(&["a", "a"])),
            Err(SchemaMismatch::DuplicateChoice("a".to_string()))
        );
        assert_eq!(RawTable::new(Vec::new()), Err(SchemaMismatch::NoChoices));
        let error = RawTable::new(names(&["a"]))
            .expect("valid")
            .with_column("x", Vec::new())
            .expect_err("wrong length");
        assert!(matches!(error, SchemaMismatch::ColumnLength { .. }));
    }

    #[test]
    fn resolves_user_columns_without_fetching() {
        let mut diagnostics = Diagnostics::new();
        let table = resolve(
            &raw(),
            &required(&[("rating", InputKind::Integer), ("power", InputKind::Float)]),
            &FetcherRegistry::new(),
            ResolveOptions::default(),
            &mut diagnostics,
        )
        .expect("resolves");

        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["power", "rating"]);
        assert_eq!(table.column("rating"), Some(&Column::Integer(vec![1, 5])));
        assert_eq!(table.column("power"), Some(&Column::Float(vec![100.0, 200.0])));
    }

    #[test]
    fn expressions_stay_text_when_disabled() {
        let mut diagnostics = Diagnostics::new();
        let error = resolve(
            &raw(),
            &required(&[("rating", InputKind::Integer), ("power", InputKind::Float)]),
            &FetcherRegistry::new(),
            ResolveOptions {
                evaluate_expressions: false,
            },
            &mut diagnostics,
        )
        .expect_err("text cell cannot be coerced");
        assert!(matches!(
            error,
            DecisionError::Scoring(crate::error::ScoringError::Coercion { .. })
        ));
    }

    #[test]
    fn fetches_missing_sources() {
        let mut registry = FetcherRegistry::new();
        registry.register(
            "obesity",
            StaticFetcher::new(
                InputKind::Float,
                [("a", RawValue::Float(20.0)), ("b", RawValue::Float(30.0))],
            ),
        );
        let mut diagnostics = Diagnostics::new();
        let table = resolve(
            &raw(),
            &required(&[
                ("rating", InputKind::Integer),
                ("power", InputKind::Float),
                ("obesity", InputKind::Float),
            ]),
            &registry,
            ResolveOptions::default(),
            &mut diagnostics,
        )
        .expect("resolves");

        assert_eq!(table.column("obesity"), Some(&Column::Float(vec![20.0, 30.0])));
        assert!(diagnostics
            .entries()
            .iter()
            .any(|entry| entry.subject == "obesity" && entry.message.contains("fetched 2")));
    }

    #[test]
    fn missing_and_unexpected_sources_are_schema_mismatches() {
        let mut diagnostics = Diagnostics::new();
        let error = resolve(
            &raw(),
            &required(&[
                ("rating", InputKind::Integer),
                ("power", InputKind::Float),
                ("obesity", InputKind::Float),
            ]),
            &FetcherRegistry::new(),
            ResolveOptions::default(),
            &mut diagnostics,
        )
        .expect_err("no fetcher for obesity");
        assert_eq!(
            error,
            DecisionError::Schema(SchemaMismatch::MissingSources(vec!["obesity".to_string()]))
        );

        let error = resolve(
            &raw(),
            &required(&[("rating", InputKind::Integer)]),
            &FetcherRegistry::new(),
            ResolveOptions::default(),
            &mut diagnostics,
        )
        .expect_err("power is not consumed");
        assert_eq!(
            error,
            DecisionError::Schema(SchemaMismatch::UnexpectedSources(vec!["power".to_string()]))
        );
    }

    #[test]
    fn fetcher_results_are_checked() {
        let mut registry = FetcherRegistry::new();
        registry.register(
            "obesity",
            StaticFetcher::new(
                InputKind::Float,
                [
                    ("a", RawValue::Float(20.0)),
                    ("b", RawValue::Text("n/a".to_string())),
                ],
            ),
        );
        let mut diagnostics = Diagnostics::new();
        let error = resolve(
            &raw(),
            &required(&[
                ("rating", InputKind::Integer),
                ("power", InputKind::Float),
                ("obesity", InputKind::Float),
            ]),
            &registry,
            ResolveOptions::default(),
            &mut diagnostics,
        )
        .expect_err("text value from float fetcher");
        assert!(matches!(
            error,
            DecisionError::Fetch(FetchError::WrongType { ref choice, .. }) if choice == "b"
        ));
    }
}
