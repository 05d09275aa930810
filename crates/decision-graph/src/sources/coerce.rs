use super::RawValue;
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::ScoringError;
use crate::scorers::InputKind;
use crate::table::Column;

/// Convert a raw column to the datatype its scorer requires.
///
/// Lossless conversions are applied and recorded as one warning per column; anything else is
/// a [`ScoringError::Coercion`] naming the first offending cell.
pub(crate) fn coerce_column(
    source: &str,
    choices: &[String],
    values: &[RawValue],
    target: InputKind,
    diagnostics: &mut Diagnostics,
) -> Result<Column, ScoringError> {
    let mut converted = 0usize;
    let mut found = Vec::new();

    let fail = |index: usize, value: &RawValue| ScoringError::Coercion {
        source_name: source.to_string(),
        choice: choices
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("#{index}")),
        value: value.clone(),
        target,
    };

    let column = match target {
        InputKind::Integer => {
            let mut out = Vec::with_capacity(values.len());
            for (index, value) in values.iter().enumerate() {
                found.push(value.kind_label());
                out.push(match value {
                    RawValue::Integer(v) => *v,
                    RawValue::Float(v) if is_integral(*v) => {
                        converted += 1;
                        *v as i64
                    }
                    other => return Err(fail(index, other)),
                });
            }
            Column::Integer(out)
        }
        InputKind::Float => {
            let mut out = Vec::with_capacity(values.len());
            for (index, value) in values.iter().enumerate() {
                found.push(value.kind_label());
                out.push(match value {
                    RawValue::Float(v) => *v,
                    RawValue::Integer(v) => {
                        converted += 1;
                        *v as f64
                    }
                    other => return Err(fail(index, other)),
                });
            }
            Column::Float(out)
        }
        InputKind::Boolean => {
            let mut out = Vec::with_capacity(values.len());
            for (index, value) in values.iter().enumerate() {
                found.push(value.kind_label());
                out.push(match value {
                    RawValue::Boolean(v) => *v,
                    RawValue::Integer(v @ (0 | 1)) => {
                        converted += 1;
                        *v == 1
                    }
                    RawValue::Text(text) => match parse_flag(text) {
                        Some(flag) => {
                            converted += 1;
                            flag
                        }
                        None => return Err(fail(index, value)),
                    },
                    other => return Err(fail(index, other)),
                });
            }
            Column::Boolean(out)
        }
    };

    if converted > 0 {
        found.sort_unstable();
        found.dedup();
        diagnostics.warn(
            Stage::Resolution,
            source,
            format!(
                "column holds {} but its scorer requires {target}; coerced {converted} value(s)",
                found.join("/"),
            ),
        );
    }

    Ok(column)
}

fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() <= i64::MAX as f64 / 2.0
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" => Some(true),
        "false" | "no" | "n" => Some(false),
        _ => None,
    }
}
