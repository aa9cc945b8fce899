//! Offline backend. Scores are derived from the text itself so runs are
//! reproducible without a language-model service.

use crate::error::{ClientError, Result};
use crate::service::ModelService;
use async_trait::async_trait;
use lmrisk_protocol::{
    CodelensQuery, CodelensStats, CompletionRequest, CompletionResponse, CoverageQuery,
    EntropyLine, EntropyResult, ScoreRequest, SearchEntropies, SearchRequest, Token,
};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct StubModelService;

impl StubModelService {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Distinct non-whitespace characters of `text`, scaled down.
#[must_use]
pub fn stub_entropy(text: &str) -> f64 {
    let distinct: BTreeSet<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    #[allow(clippy::cast_precision_loss)]
    let count = distinct.len() as f64;
    count / 4.0
}

fn entropy_of(content: &str, metrics: &str, token_type: &str) -> EntropyResult {
    let lines = content
        .lines()
        .map(|line| EntropyLine {
            text: line.to_string(),
            line_entropy: stub_entropy(line),
            tokens: line
                .split_whitespace()
                .map(|word| Token {
                    text: word.to_string(),
                    entropy: stub_entropy(word),
                    kind: "token".to_string(),
                })
                .collect(),
        })
        .collect();
    EntropyResult {
        metrics: metrics.to_string(),
        token_type: token_type.to_string(),
        languagemodel: "stub".to_string(),
        lines,
    }
}

#[async_trait]
impl ModelService for StubModelService {
    async fn score(&self, request: &ScoreRequest) -> Result<EntropyResult> {
        if request.content.contains('\0') {
            return Err(ClientError::Unsupported);
        }
        Ok(entropy_of(
            &request.content,
            &request.metrics,
            &request.token_type,
        ))
    }

    /// The modified variant is the content with every occurrence of the query removed.
    async fn search(&self, request: &SearchRequest) -> Result<SearchEntropies> {
        if request.content.contains('\0') {
            return Err(ClientError::Unsupported);
        }
        let modified = if request.search.is_empty() {
            request.content.clone()
        } else {
            request.content.replace(&request.search, "")
        };
        Ok(SearchEntropies {
            original: entropy_of(&request.content, "", ""),
            search: entropy_of(&modified, "", ""),
        })
    }

    /// Proposes the distinct words of the context, scored by length.
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let words: BTreeSet<&str> = request
            .content
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|word| !word.is_empty())
            .collect();
        #[allow(clippy::cast_precision_loss)]
        let predictions = words
            .into_iter()
            .take(request.proposals_count as usize)
            .map(|word| (word.to_string(), word.len() as f64))
            .collect();
        Ok(CompletionResponse {
            metadata: None,
            predictions,
        })
    }

    async fn codelens(&self, query: &CodelensQuery) -> Result<Option<CodelensStats>> {
        #[allow(clippy::cast_precision_loss)]
        let history = (0..query.bars)
            .map(|bar| f64::from(bar * 100) / f64::from(query.bars.max(1)))
            .collect();
        Ok(Some(CodelensStats {
            number_of_calls: query.subject.len() as u64,
            number_of_fails: u64::from(query.subject.contains("Error")),
            history,
        }))
    }

    /// Blank lines count as uncovered.
    async fn coverage(&self, _query: &CoverageQuery, content: &str) -> Result<Vec<bool>> {
        Ok(content.lines().map(|line| !line.trim().is_empty()).collect())
    }
}
