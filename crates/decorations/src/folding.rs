use serde::Serialize;

pub const DEFAULT_FOLDING_MAX_RISK: f64 = 20.0;

/// Inclusive, zero-based line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FoldingRange {
    pub start: usize,
    pub end: usize,
}

/// Maximal runs of consecutive lines whose risk is below `max_risk`.
#[must_use]
pub fn folding_ranges(line_risks: &[f64], max_risk: f64) -> Vec<FoldingRange> {
    let mut ranges: Vec<FoldingRange> = Vec::new();
    for (line, &risk) in line_risks.iter().enumerate() {
        if risk >= max_risk {
            continue;
        }
        match ranges.last_mut() {
            Some(last) if last.end + 1 == line => last.end = line,
            _ => ranges.push(FoldingRange {
                start: line,
                end: line,
            }),
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn runs_of_quiet_lines_fold_together() {
        let risks = [1.0, 2.0, 50.0, 3.0, 60.0, 70.0, 0.0, 0.0];
        assert_eq!(
            folding_ranges(&risks, 20.0),
            vec![
                FoldingRange { start: 0, end: 1 },
                FoldingRange { start: 3, end: 3 },
                FoldingRange { start: 6, end: 7 },
            ]
        );
    }

    #[test]
    fn nothing_to_fold() {
        assert!(folding_ranges(&[], 20.0).is_empty());
        assert!(folding_ranges(&[20.0, 99.0], 20.0).is_empty());
    }
}
