use crate::error::ShapeError;
use serde::Serialize;
use std::fmt;

/// Typed column of raw observations, one entry per choice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum Column {
    Integer(Vec<i64>),
    Float(Vec<f64>),
    Boolean(Vec<bool>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Integer(values) => values.len(),
            Column::Float(values) => values.len(),
            Column::Boolean(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn kind_label(&self) -> &'static str {
        match self {
            Column::Integer(_) => "integer",
            Column::Float(_) => "float",
            Column::Boolean(_) => "boolean",
        }
    }

    /// Cell rendered for display, trailing zeros removed.
    pub fn display_cell(&self, index: usize) -> Option<String> {
        match self {
            Column::Integer(values) => values.get(index).map(|value| value.to_string()),
            Column::Float(values) => values.get(index).map(|value| format_number(*value)),
            Column::Boolean(values) => values.get(index).map(|value| value.to_string()),
        }
    }
}

pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        let text = format!("{value:.6}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Dense choice-by-column table of scores.
///
/// Rows follow the choice order of the input data and columns follow declaration order, so two
/// runs over identical inputs compare equal bit for bit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    choices: Vec<String>,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl Table {
    /// Zero-filled table.
    pub fn zeros(choices: Vec<String>, columns: Vec<String>) -> Self {
        let rows = vec![vec![0.0; columns.len()]; choices.len()];
        Self {
            choices,
            columns,
            rows,
        }
    }

    /// Assemble a table from named columns, each holding one value per choice.
    pub fn from_columns(
        choices: Vec<String>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, ShapeError> {
        let mut table = Self::zeros(
            choices,
            columns.iter().map(|(name, _)| name.clone()).collect(),
        );

        for (col, (_, values)) in columns.into_iter().enumerate() {
            if values.len() != table.choices.len() {
                return Err(ShapeError::ColumnLength {
                    column: table.columns[col].clone(),
                    expected: table.choices.len(),
                    found: values.len(),
                });
            }
            for (row, value) in values.into_iter().enumerate() {
                table.rows[row][col] = value;
            }
        }

        Ok(table)
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.choices
            .iter()
            .map(String::as_str)
            .zip(self.rows.iter().map(Vec::as_slice))
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[index]).collect())
    }

    pub fn value(&self, choice: &str, column: &str) -> Option<f64> {
        let row = self.choices.iter().position(|candidate| candidate == choice)?;
        let col = self.column_index(column)?;
        Some(self.rows[row][col])
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: f64) {
        self.rows[row][col] = value;
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_width = self
            .choices
            .iter()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max("choice".len());
        let widths: Vec<usize> = self
            .columns
            .iter()
            .map(|column| column.len().max(6))
            .collect();

        write!(f, "{:<label_width$}", "choice")?;
        for (column, width) in self.columns.iter().zip(&widths) {
            write!(f, "  {column:>width$}")?;
        }
        writeln!(f)?;

        for (choice, row) in self.rows() {
            write!(f, "{choice:<label_width$}")?;
            for (value, width) in row.iter().zip(&widths) {
                write!(f, "  {value:>width$.4}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
