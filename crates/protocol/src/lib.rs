use serde::{Deserialize, Serialize};

pub mod messages;
mod risk;

pub use risk::{AggregationPolicy, ParsePolicyError, RiskLevel};

/// Status code the language-model service answers with when it refuses a content type.
pub const UNSUPPORTED_STATUS: u16 = 406;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub content: String,
    pub language_id: String,
    pub file_path: String,
    /// Modification time of the file in milliseconds since the epoch.
    pub timestamp: f64,
    pub no_return: bool,
    pub reset_context: bool,
    pub metrics: String,
    pub token_type: String,
    pub model: String,
    pub workspace_folder: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Token {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub entropy: f64,
    #[serde(default, rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct EntropyLine {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub line_entropy: f64,
    #[serde(default)]
    pub tokens: Vec<Token>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct EntropyResult {
    #[serde(default)]
    pub metrics: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub languagemodel: String,
    #[serde(default)]
    pub lines: Vec<EntropyLine>,
}

impl EntropyResult {
    /// Per-line risk values in line order.
    #[must_use]
    pub fn line_entropies(&self) -> Vec<f64> {
        self.lines.iter().map(|line| line.line_entropy).collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScoreResponse {
    pub entropies: EntropyResult,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub content: String,
    pub search: String,
    pub language_id: String,
    pub search_interval: u32,
}

/// Two independent entropy computations: the file as-is and the file with the query applied.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SearchEntropies {
    #[serde(default)]
    pub original: EntropyResult,
    #[serde(default)]
    pub search: EntropyResult,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SearchResponse {
    pub entropies: SearchEntropies,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub content: String,
    pub language_id: String,
    pub reset_context: bool,
    pub proposals_count: u32,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CompletionResponse {
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// `[text, score]` pairs as returned by the service.
    #[serde(default)]
    pub predictions: Vec<(String, f64)>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CompletionProposal {
    pub text: String,
    pub score: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CodelensQuery {
    pub days: u32,
    pub bars: u32,
    pub subject: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CodelensStats {
    #[serde(default)]
    pub number_of_calls: u64,
    #[serde(default)]
    pub number_of_fails: u64,
    /// Failure percentages per bar, oldest first.
    #[serde(default)]
    pub history: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CoverageQuery {
    pub subject: String,
    pub language_id: String,
    pub file_name: String,
}

/// Body shared by the coverage and thumbnail endpoints.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct InputPayload {
    pub input: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ColorRange {
    pub minimum: f64,
    pub maximum: f64,
    pub color: String,
}

/// A line whose risk moved by more than the search threshold.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct LineMatch {
    pub original: f64,
    pub modified: f64,
    /// Relative difference in percent.
    pub difference: f64,
}
