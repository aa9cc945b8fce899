use crate::ranges::ColorRanges;
use lmrisk_protocol::{EntropyLine, EntropyResult};
use serde::Serialize;

const TOKEN_END_MARKER: &str = "</t>";
/// Characters a token may sit after the end of the previous one (whitespace
/// the tokenizer dropped).
const MAX_TOKEN_SKIP: usize = 12;

pub const DEFAULT_OK_COLOR: &str = "rgba(0,255,0,0.2)";
pub const DEFAULT_WARNING_COLOR: &str = "rgba(255,0,0,0.2)";

/// A token found in its line, as a `[start, end)` character column range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocatedToken {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub entropy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenSpan {
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub color: String,
}

/// Walk the line left to right, placing each token after the previous one.
/// Tokens that cannot be placed, or are empty, are skipped.
#[must_use]
pub fn locate_tokens(line: &EntropyLine) -> Vec<LocatedToken> {
    let chars: Vec<char> = line.text.chars().collect();
    let mut cursor = 0;
    let mut located = Vec::with_capacity(line.tokens.len());

    for token in &line.tokens {
        let text = token.text.replace(TOKEN_END_MARKER, "");
        let needle: Vec<char> = text.chars().collect();
        if needle.is_empty() {
            continue;
        }

        let remaining = &chars[cursor.min(chars.len())..];
        let found = (0..=MAX_TOKEN_SKIP).find(|&skip| {
            remaining
                .get(skip..skip + needle.len())
                .is_some_and(|window| window == needle.as_slice())
        });
        if let Some(skip) = found {
            let start = cursor + skip;
            let end = start + needle.len();
            located.push(LocatedToken {
                start,
                end,
                text,
                entropy: token.entropy,
            });
            cursor = end;
        }
    }
    located
}

/// Colored spans for every placed token of every line.
#[must_use]
pub fn token_spans(result: &EntropyResult, ranges: &ColorRanges) -> Vec<TokenSpan> {
    result
        .lines
        .iter()
        .enumerate()
        .flat_map(|(line_number, line)| {
            locate_tokens(line)
                .into_iter()
                .filter_map(move |token| {
                    let color = ranges.token_color(token.entropy)?;
                    Some(TokenSpan {
                        line: line_number,
                        start: token.start,
                        end: token.end,
                        color: color.to_string(),
                    })
                })
        })
        .collect()
}

/// Hover text for a column of a scored line.
#[must_use]
pub fn hover_text(line: &EntropyLine, column: usize) -> String {
    let header = format!("Line entropy: {:.3}", line.line_entropy);
    let Some(token) = locate_tokens(line)
        .into_iter()
        .find(|token| column >= token.start && column < token.end)
    else {
        return header;
    };
    let tokens: Vec<&str> = line.tokens.iter().map(|t| t.text.as_str()).collect();
    format!(
        "{header} - Token '{}' -> {:.3} ||| tokens: {}",
        token.text,
        token.entropy,
        tokens.join(",")
    )
}

/// Background color per line from coverage flags.
#[must_use]
pub fn coverage_colors<'a>(covered: &[bool], ok_color: &'a str, warning_color: &'a str) -> Vec<&'a str> {
    covered
        .iter()
        .map(|&hit| if hit { ok_color } else { warning_color })
        .collect()
}
