use std::fmt::Write as _;

pub const MINIMAP_WIDTH: usize = 75;
const MINIMAP_FILL: &str = "rgba(200,200,200,80)";

/// Outline of a file: one bar per line, three units tall, from the
/// indentation to at most [`MINIMAP_WIDTH`].
#[must_use]
pub fn minimap_svg(content: &str) -> String {
    let lines = split_lines(content);
    let mut svg = format!(
        r#"<svg width="{MINIMAP_WIDTH}" height="{}" viewPort="0 0 32 48" xmlns="http://www.w3.org/2000/svg">"#,
        lines.len() * 3
    );

    let mut y = 1;
    for line in lines {
        let indent = line.chars().take_while(|c| c.is_whitespace()).count();
        let length = (line.chars().count() - indent).min(MINIMAP_WIDTH);
        let _ = write!(
            svg,
            r#"<polygon points="{indent},{y} {length},{y} {length},{bottom} {indent},{bottom}" fill="{MINIMAP_FILL}"/>"#,
            bottom = y + 2
        );
        y += 3;
    }

    svg.push_str("</svg>");
    svg
}

/// Split on `\r\n`, `\r` or `\n`. Empty content is one empty line.
fn split_lines(content: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let bytes = content.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                lines.push(&content[start..i]);
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            b'\n' => {
                lines.push(&content[start..i]);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    lines.push(&content[start..]);
    lines
}

/// Gutter marker: the right half of a 32x48 box filled with `color`.
#[must_use]
pub fn gutter_icon_svg(color: &str) -> String {
    format!(
        r#"<svg width="32" height="48" viewPort="0 0 32 48" xmlns="http://www.w3.org/2000/svg"><polygon points="16,0 32,0 32,48 16,48" fill="{color}"/></svg>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn minimap_draws_one_bar_per_line() {
        let svg = minimap_svg("class A {\r\n    int b;\n}");
        assert!(svg.starts_with(r#"<svg width="75" height="9""#));
        assert!(svg.contains(r#"<polygon points="0,1 9,1 9,3 0,3""#));
        assert!(svg.contains(r#"<polygon points="4,4 6,4 6,6 4,6""#));
        assert!(svg.contains(r#"<polygon points="0,7 1,7 1,9 0,9""#));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn long_lines_are_capped() {
        let svg = minimap_svg(&"x".repeat(200));
        assert!(svg.contains(r#"points="0,1 75,1 75,3 0,3""#));
    }

    #[test]
    fn split_handles_every_line_ending() {
        assert_eq!(split_lines("a\r\nb\rc\nd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines(""), vec![""]);
        assert_eq!(split_lines("a\n"), vec!["a", ""]);
    }

    #[test]
    fn gutter_icon_fills_right_half() {
        assert_eq!(
            gutter_icon_svg("red"),
            r#"<svg width="32" height="48" viewPort="0 0 32 48" xmlns="http://www.w3.org/2000/svg"><polygon points="16,0 32,0 32,48 16,48" fill="red"/></svg>"#
        );
    }
}
