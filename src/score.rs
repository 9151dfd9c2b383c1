#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Region-based score normalization and the per-check score record.

use std::fmt::Display;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Upper end of every raw metric (a percentage).
pub const RAW_METRIC_MAX: f64 = 100.0;

/// Maps a raw percentage onto an integer score in `0..=max_points`.
///
/// `[0, 100]` is split into `max_points + 1` equal half-open regions. The
/// index of the region containing `raw` is the score; 100 itself gets
/// `max_points`. Lower edges are inclusive, so a value exactly on a boundary
/// lands in the upper region. `raw` is clamped to `[0, 100]` first and `NaN`
/// counts as 0.
pub fn normalize(raw: f64, max_points: u32) -> u32 {
    let raw = if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, RAW_METRIC_MAX)
    };
    let max = u64::from(max_points);
    let step = RAW_METRIC_MAX / (f64::from(max_points) + 1.0);

    // Division only approximates the region; settle it against the same
    // `i * step` edges the regions are defined by.
    let guess = (raw / step).floor() as u64;
    let region = (guess.saturating_sub(1)..=guess + 2)
        .map(|i| (i, i as f64 * step))
        .tuple_windows()
        .find(|((_, start), (_, end))| *start <= raw && raw < *end)
        .map_or(max, |((i, _), _)| i);

    region.min(max) as u32
}

/// Result of one check: `(check_name, score, max_score)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Name of the check that produced the score.
    check_name: String,
    /// Points awarded.
    score:      u32,
    /// Points available.
    max_score:  u32,
}

impl ScoreRecord {
    /// Creates a new record.
    pub fn new(check_name: impl Into<String>, score: u32, max_score: u32) -> Self {
        Self {
            check_name: check_name.into(),
            score,
            max_score,
        }
    }

    /// Returns the check name.
    pub fn check_name(&self) -> &str {
        &self.check_name
    }

    /// Returns the awarded score.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Returns the maximum score.
    pub fn max_score(&self) -> u32 {
        self.max_score
    }
}

impl Display for ScoreRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Check: {}, Score: {}/{}",
            self.check_name, self.score, self.max_score
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_map_to_zero_and_max() {
        for max_points in 0..=25 {
            assert_eq!(normalize(0.0, max_points), 0);
            assert_eq!(normalize(100.0, max_points), max_points);
        }
    }

    #[test]
    fn monotonically_non_decreasing() {
        for max_points in [0, 1, 2, 3, 7, 10] {
            let mut previous = 0;
            for tenth in 0..=1000 {
                let score = normalize(f64::from(tenth) / 10.0, max_points);
                assert!(score >= previous, "dropped at {tenth} for {max_points}");
                assert!(score <= max_points);
                previous = score;
            }
        }
    }

    #[test]
    fn three_regions_have_exact_boundaries() {
        assert_eq!(normalize(0.0, 2), 0);
        assert_eq!(normalize(22.0, 2), 0);
        assert_eq!(normalize(100.0 / 3.0, 2), 1);
        assert_eq!(normalize(100.0 / 3.0 + 0.01, 2), 1);
        assert_eq!(normalize(50.0, 2), 1);
        assert_eq!(normalize(200.0 / 3.0, 2), 2);
        assert_eq!(normalize(75.0, 2), 2);
        assert_eq!(normalize(100.0, 2), 2);
    }

    #[test]
    fn out_of_range_raw_values_are_clamped() {
        assert_eq!(normalize(-1.0, 8), 0);
        assert_eq!(normalize(f64::NAN, 8), 0);
        assert_eq!(normalize(150.0, 8), 8);
        assert_eq!(normalize(f64::INFINITY, 8), 8);
    }

    #[test]
    fn largest_max_points_does_not_overflow() {
        assert_eq!(normalize(0.0, u32::MAX), 0);
        assert_eq!(normalize(50.0, u32::MAX), 1 << 31);
        assert_eq!(normalize(100.0, u32::MAX), u32::MAX);
    }

    #[test]
    fn zero_max_points_always_scores_zero() {
        assert_eq!(normalize(0.0, 0), 0);
        assert_eq!(normalize(99.9, 0), 0);
    }

    #[test]
    fn record_renders_report_line() {
        let record = ScoreRecord::new("coverage", 8, 10);
        assert_eq!(record.to_string(), "Check: coverage, Score: 8/10");
    }
}
