const GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Glyph for a percentage in `0..=100`; values outside are clamped.
#[must_use]
pub fn glyph(percentage: f64) -> char {
    let top = GLYPHS.len() - 1;
    let scaled = (percentage / 100.0 * top as f64).floor();
    if scaled.is_nan() || scaled < 0.0 {
        return GLYPHS[0];
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = (scaled as usize).min(top);
    GLYPHS[index]
}

/// Four spaces followed by one glyph per value, or nothing when disabled.
#[must_use]
pub fn sparkline(percentages: &[f64], enabled: bool) -> String {
    if !enabled {
        return String::new();
    }
    let mut line = String::from("    ");
    line.extend(percentages.iter().map(|&p| glyph(p)));
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn glyphs_scale_and_clamp() {
        assert_eq!(glyph(0.0), '▁');
        assert_eq!(glyph(50.0), '▄');
        assert_eq!(glyph(100.0), '█');
        assert_eq!(glyph(250.0), '█');
        assert_eq!(glyph(-5.0), '▁');
        assert_eq!(glyph(f64::NAN), '▁');
    }

    #[test]
    fn prefixed_with_four_spaces() {
        assert_eq!(sparkline(&[0.0, 100.0], true), "    ▁█");
        assert_eq!(sparkline(&[], true), "    ");
        assert_eq!(sparkline(&[10.0], false), "");
    }
}
