use lmrisk_protocol::LineMatch;
use std::collections::BTreeMap;

pub const DEFAULT_THRESHOLD: f64 = 20.0;

/// Relative difference `(max / min - 1) * 100`. A zero or non-finite ratio
/// counts as no difference.
#[must_use]
pub fn difference_percent(a: f64, b: f64) -> f64 {
    let ratio = a.max(b) / a.min(b);
    if ratio.is_finite() {
        (ratio - 1.0) * 100.0
    } else {
        0.0
    }
}

/// Compare two per-line entropy lists pairwise, up to the shorter one, and
/// keep the lines whose difference exceeds `threshold` percent.
#[must_use]
pub fn match_lines(original: &[f64], modified: &[f64], threshold: f64) -> BTreeMap<usize, LineMatch> {
    original
        .iter()
        .zip(modified)
        .enumerate()
        .filter_map(|(line, (&original, &modified))| {
            let difference = difference_percent(original, modified);
            (difference > threshold).then_some((
                line,
                LineMatch {
                    original,
                    modified,
                    difference,
                },
            ))
        })
        .collect()
}
