use crate::error::{DecorationError, Result};
use lmrisk_protocol::ColorRange;

pub const DEFAULT_RANGES: [f64; 5] = [20.0, 40.0, 60.0, 80.0, 100.0];
pub const DEFAULT_COLORS: [&str; 5] = ["green", "rgb(126, 128, 0)", "orange", "rgb(255, 72, 0)", "red"];

/// Risk buckets. Range `i` covers `(bound[i], bound[i + 1]]` of
/// `[0] ++ upper_bounds` and carries color `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRanges {
    ranges: Vec<ColorRange>,
}

impl Default for ColorRanges {
    fn default() -> Self {
        let colors: Vec<String> = DEFAULT_COLORS.iter().map(ToString::to_string).collect();
        Self::build(&DEFAULT_RANGES, &colors)
    }
}

impl ColorRanges {
    pub fn new(upper_bounds: &[f64], colors: &[String]) -> Result<Self> {
        if upper_bounds.len() != colors.len() {
            return Err(DecorationError::ColorCountMismatch {
                ranges: upper_bounds.len(),
                colors: colors.len(),
            });
        }
        let ascending = std::iter::once(&0.0)
            .chain(upper_bounds)
            .collect::<Vec<_>>()
            .windows(2)
            .all(|pair| pair[0] < pair[1]);
        if !ascending {
            return Err(DecorationError::UnorderedRanges(upper_bounds.to_vec()));
        }
        Ok(Self::build(upper_bounds, colors))
    }

    fn build(upper_bounds: &[f64], colors: &[String]) -> Self {
        let mut lower = 0.0;
        let ranges = upper_bounds
            .iter()
            .zip(colors)
            .map(|(&upper, color)| {
                let range = ColorRange {
                    minimum: lower,
                    maximum: upper,
                    color: color.clone(),
                };
                lower = upper;
                range
            })
            .collect();
        Self { ranges }
    }

    #[must_use]
    pub fn ranges(&self) -> &[ColorRange] {
        &self.ranges
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Gutter icon index: `i + 1` for the first range with `min < risk <= max`,
    /// `0` when no range holds the value.
    #[must_use]
    pub fn gutter_bucket(&self, risk: f64) -> usize {
        self.ranges
            .iter()
            .position(|range| risk > range.minimum && risk <= range.maximum)
            .map_or(0, |i| i + 1)
    }

    /// Like [`ColorRanges::gutter_bucket`], but anything under `min_risk` is hidden.
    #[must_use]
    pub fn minimap_bucket(&self, risk: f64, min_risk: f64) -> usize {
        if risk < min_risk {
            0
        } else {
            self.gutter_bucket(risk)
        }
    }

    /// Background for a token: first range with `min <= risk < max`,
    /// otherwise the color of the last range.
    #[must_use]
    pub fn token_color(&self, risk: f64) -> Option<&str> {
        self.ranges
            .iter()
            .find(|range| risk >= range.minimum && risk < range.maximum)
            .or_else(|| self.ranges.last())
            .map(|range| range.color.as_str())
    }

    /// Color of a gutter bucket as returned by [`ColorRanges::gutter_bucket`].
    #[must_use]
    pub fn bucket_color(&self, bucket: usize) -> Option<&str> {
        bucket
            .checked_sub(1)
            .and_then(|i| self.ranges.get(i))
            .map(|range| range.color.as_str())
    }
}
