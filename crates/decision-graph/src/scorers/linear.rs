use super::config::Knot;
use super::Rejection;
use crate::table::format_number;

/// Fixed integer scale: `min` scores 0 and `max` scores 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Star {
    min: i64,
    max: i64,
}

impl Star {
    pub fn new(min: i64, max: i64) -> Result<Self, String> {
        if min >= max {
            return Err(format!("min {min} must be < max {max}"));
        }
        Ok(Self { min, max })
    }

    pub(crate) fn score(&self, values: &[i64]) -> Result<Vec<f64>, Rejection> {
        let min = self.min as f64;
        let span = self.max as f64 - min;
        values
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                if value < self.min || value > self.max {
                    return Err(Rejection::OutOfDomain {
                        index,
                        value: value as f64,
                        domain: format!("[{}, {}]", self.min, self.max),
                    });
                }
                Ok((value as f64 - min) / span)
            })
            .collect()
    }

    pub fn describe(&self) -> String {
        format!(
            "{min} to {max} stars, where {min} = 0%, and {max} = 100%.",
            min = self.min,
            max = self.max
        )
    }
}

/// Min-max normalization against the column being scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relative {
    invert: bool,
}

impl Relative {
    pub const fn new(invert: bool) -> Self {
        Self { invert }
    }

    pub(crate) fn score(&self, values: &[f64]) -> Result<Vec<f64>, Rejection> {
        if let Some(index) = values.iter().position(|value| !value.is_finite()) {
            return Err(Rejection::OutOfDomain {
                index,
                value: values[index],
                domain: "finite numbers".to_string(),
            });
        }

        let low = values.iter().copied().fold(f64::INFINITY, f64::min);
        let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if values.is_empty() || high == low {
            return Err(Rejection::Degenerate {
                value: if values.is_empty() { 0.0 } else { low },
            });
        }

        let span = high - low;
        Ok(values
            .iter()
            .map(|value| {
                let score = (value - low) / span;
                if self.invert {
                    1.0 - score
                } else {
                    score
                }
            })
            .collect())
    }

    pub fn describe(&self) -> String {
        if self.invert {
            "Relative to other values & lower is better: the highest value gets 0%, and the lowest value gets 100%.".to_string()
        } else {
            "Relative to other values & higher is better: the lowest value gets 0%, and the highest value gets 100%.".to_string()
        }
    }
}

/// Piecewise-linear curve through knots with non-decreasing inputs.
///
/// Inputs outside the first and last knot are rejected rather than extrapolated.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolate {
    knots: Vec<Knot>,
}

impl Interpolate {
    pub fn new(knots: Vec<Knot>) -> Result<Self, String> {
        if knots.len() < 2 {
            return Err(format!(
                "interpolation needs at least 2 knots, got {}",
                knots.len()
            ));
        }
        if let Some(knot) = knots
            .iter()
            .find(|knot| !knot.input.is_finite() || !knot.output.is_finite())
        {
            return Err(format!(
                "knot ({}, {}) is not finite",
                knot.input, knot.output
            ));
        }
        if let Some(pair) = knots.windows(2).find(|pair| pair[1].input < pair[0].input) {
            return Err(format!(
                "knots must be given in increasing order of input, but {} follows {}",
                pair[1].input, pair[0].input
            ));
        }
        if knots[0].input == knots[knots.len() - 1].input {
            return Err(format!(
                "knots must span more than the single input {}",
                knots[0].input
            ));
        }
        if let Some(knot) = knots
            .iter()
            .find(|knot| !(0.0..=1.0).contains(&knot.output))
        {
            return Err(format!(
                "knot output {} must be between 0 and 1",
                knot.output
            ));
        }
        Ok(Self { knots })
    }

    /// Two-knot curve with `worst` at 0 and `best` at 1; either may be the larger input.
    pub fn range(worst: f64, best: f64) -> Result<Self, String> {
        if worst < best {
            Self::new(vec![Knot::new(worst, 0.0), Knot::new(best, 1.0)])
        } else if worst > best {
            Self::new(vec![Knot::new(best, 1.0), Knot::new(worst, 0.0)])
        } else {
            Err(format!("worst {worst} and best {best} must be different"))
        }
    }

    fn bounds(&self) -> (f64, f64) {
        (
            self.knots[0].input,
            self.knots[self.knots.len() - 1].input,
        )
    }

    /// Knots sharing an input form a step; the last of them wins at that input.
    fn eval(&self, value: f64) -> f64 {
        if let Some(knot) = self.knots.iter().rev().find(|knot| knot.input == value) {
            return knot.output;
        }
        let segment = self
            .knots
            .windows(2)
            .find(|pair| pair[0].input < value && value < pair[1].input)
            .unwrap_or(&self.knots[..2]);
        let (start, end) = (segment[0], segment[1]);
        let t = (value - start.input) / (end.input - start.input);
        start.output + t * (end.output - start.output)
    }

    pub(crate) fn score(&self, values: &[f64]) -> Result<Vec<f64>, Rejection> {
        let (low, high) = self.bounds();
        values
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                if !(low..=high).contains(&value) {
                    return Err(Rejection::OutOfDomain {
                        index,
                        value,
                        domain: format!("[{}, {}]", format_number(low), format_number(high)),
                    });
                }
                Ok(self.eval(value))
            })
            .collect()
    }

    pub fn describe(&self) -> String {
        let mut text = String::from(
            "Linearly interpolated between the following knots:\n\n| Value | Score (%) |\n|-------|-----------|",
        );
        for knot in &self.knots {
            text.push_str(&format!(
                "\n| {} | {} |",
                format_number(knot.input),
                format_number(knot.output * 100.0)
            ));
        }
        text
    }
}
