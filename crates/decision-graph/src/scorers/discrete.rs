use super::config::BucketConfig;
use super::Rejection;
use crate::table::format_number;

/// Lumps inputs into contiguous half-open intervals `[min, max)` that share a score.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    buckets: Vec<BucketConfig>,
}

impl Bucket {
    /// Sorts buckets by `min` and checks they form one contiguous chain.
    pub fn new(mut buckets: Vec<BucketConfig>) -> Result<Self, String> {
        if buckets.is_empty() {
            return Err("at least one bucket is required".to_string());
        }

        for bucket in &buckets {
            if !bucket.min.is_finite() || !bucket.max.is_finite() {
                return Err(format!(
                    "bucket [{}, {}) must have finite bounds",
                    bucket.min, bucket.max
                ));
            }
            if bucket.min >= bucket.max {
                return Err(format!(
                    "bucket min {} must be < max {}",
                    bucket.min, bucket.max
                ));
            }
            if !(0.0..=1.0).contains(&bucket.val) {
                return Err(format!("bucket val {} must be between 0 and 1", bucket.val));
            }
        }

        buckets.sort_by(|a, b| a.min.total_cmp(&b.min));
        if let Some(pair) = buckets.windows(2).find(|pair| pair[0].max != pair[1].min) {
            return Err(format!(
                "buckets must be contiguous, but [{}, {}) is followed by [{}, {})",
                pair[0].min, pair[0].max, pair[1].min, pair[1].max
            ));
        }

        Ok(Self { buckets })
    }

    pub fn buckets(&self) -> &[BucketConfig] {
        &self.buckets
    }

    pub(crate) fn score(&self, values: &[f64]) -> Result<Vec<f64>, Rejection> {
        let low = self.buckets[0].min;
        let high = self.buckets[self.buckets.len() - 1].max;

        values
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                self.buckets
                    .iter()
                    .find(|bucket| value >= bucket.min && value < bucket.max)
                    .map(|bucket| bucket.val)
                    .ok_or_else(|| Rejection::OutOfDomain {
                        index,
                        value,
                        domain: format!("[{}, {})", format_number(low), format_number(high)),
                    })
            })
            .collect()
    }

    pub fn describe(&self) -> String {
        let mut text = String::from("| Range | Score (%) |\n|-------|-----------|");
        for bucket in &self.buckets {
            text.push_str(&format!(
                "\n| {} to {} | {} |",
                format_number(bucket.min),
                format_number(bucket.max),
                format_number(bucket.val * 100.0)
            ));
        }
        text
    }
}

/// Maps booleans to 1 when they equal the `good` polarity and to 0 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoolScorer {
    good: bool,
}

impl BoolScorer {
    pub const fn new(good: bool) -> Self {
        Self { good }
    }

    pub(crate) fn score(&self, values: &[bool]) -> Vec<f64> {
        values
            .iter()
            .map(|&value| if value == self.good { 1.0 } else { 0.0 })
            .collect()
    }

    pub fn describe(&self) -> String {
        if self.good {
            "Yes = 100%, No = 0%.".to_string()
        } else {
            "No = 100%, Yes = 0%.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(min: f64, max: f64, val: f64) -> BucketConfig {
        BucketConfig { min, max, val }
    }

    #[test]
    fn buckets_are_sorted_before_validation() {
        let scorer = Bucket::new(vec![bucket(1.0, 2.0, 1.0), bucket(0.0, 1.0, 0.5)])
            .expect("contiguous once sorted");
        assert_eq!(scorer.buckets()[0].min, 0.0);
        assert_eq!(scorer.score(&[0.5, 1.0]), Ok(vec![0.5, 1.0]));
    }

    #[test]
    fn gaps_and_overlaps_are_rejected() {
        assert!(Bucket::new(vec![bucket(0.0, 1.0, 0.5), bucket(1.5, 2.0, 1.0)]).is_err());
        assert!(Bucket::new(vec![bucket(0.0, 1.5, 0.5), bucket(1.0, 2.0, 1.0)]).is_err());
        assert!(Bucket::new(Vec::new()).is_err());
    }

    #[test]
    fn bucket_values_and_bounds_are_validated() {
        assert!(Bucket::new(vec![bucket(0.0, 1.0, 1.5)]).is_err());
        assert!(Bucket::new(vec![bucket(1.0, 1.0, 0.5)]).is_err());
    }

    #[test]
    fn upper_bound_is_exclusive() {
        let scorer = Bucket::new(vec![bucket(0.0, 1.0, 0.5)]).expect("valid bucket");
        assert!(matches!(
            scorer.score(&[1.0]),
            Err(Rejection::OutOfDomain { index: 0, .. })
        ));
        assert!(matches!(
            scorer.score(&[-0.1]),
            Err(Rejection::OutOfDomain { index: 0, .. })
        ));
    }
}
