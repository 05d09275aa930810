use super::normalizer::normalize_name;
use super::{RawTable, RawValue};
use crate::error::{LoadError, SchemaMismatch};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// Options for reading the user-supplied raw table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Header of the column holding choice names.
    pub choice_column: String,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            choice_column: "choice".to_string(),
        }
    }
}

pub fn read_csv_path<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<RawTable, LoadError> {
    let file = std::fs::File::open(path)?;
    read_csv(file, options)
}

/// Read a table with one row per choice and one column per source.
///
/// Cells are typed by their literal shape (integer, float, boolean, otherwise text). Empty
/// cells are rejected.
pub fn read_csv<R: Read>(reader: R, options: &ReadOptions) -> Result<RawTable, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(normalize_name).collect();
    let mut seen = HashSet::new();
    if let Some(duplicate) = headers.iter().find(|header| !seen.insert(header.as_str())) {
        return Err(SchemaMismatch::DuplicateColumn(duplicate.clone()).into());
    }
    let choice_index = headers
        .iter()
        .position(|header| header == &options.choice_column)
        .ok_or_else(|| SchemaMismatch::MissingChoiceColumn(options.choice_column.clone()))?;

    let mut choices = Vec::new();
    let mut columns: Vec<Vec<RawValue>> = vec![Vec::new(); headers.len()];

    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        let choice = normalize_name(record.get(choice_index).unwrap_or_default());
        if choice.is_empty() {
            return Err(SchemaMismatch::MissingValue {
                choice: format!("row {}", row + 1),
                column: options.choice_column.clone(),
            }
            .into());
        }

        for (index, header) in headers.iter().enumerate() {
            if index == choice_index {
                continue;
            }
            let value = record
                .get(index)
                .and_then(parse_cell)
                .ok_or_else(|| SchemaMismatch::MissingValue {
                    choice: choice.clone(),
                    column: header.clone(),
                })?;
            columns[index].push(value);
        }
        choices.push(choice);
    }

    let mut table = RawTable::new(choices)?;
    for (index, (header, values)) in headers.into_iter().zip(columns).enumerate() {
        if index != choice_index {
            table.insert_column(header, values)?;
        }
    }

    tracing::debug!(
        choices = table.choices().len(),
        columns = table.column_names().count(),
        "raw table read"
    );
    Ok(table)
}

/// Type a raw cell by its literal shape; `None` for empty cells.
pub(crate) fn parse_cell(text: &str) -> Option<RawValue> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(RawValue::Integer(value));
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        if value.is_finite() {
            return Some(RawValue::Float(value));
        }
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Some(RawValue::Boolean(true));
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Some(RawValue::Boolean(false));
    }

    Some(RawValue::Text(trimmed.to_string()))
}
