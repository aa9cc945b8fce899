use crate::error::Result;
use crate::service::ModelService;
use lmrisk_protocol::{CompletionProposal, CompletionRequest, CompletionResponse};

/// Text sent for completion: up to `context_lines` lines before `line`, each
/// followed by a newline, then the first `column` characters of `line`.
#[must_use]
pub fn completion_context(content: &str, line: usize, column: usize, context_lines: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let from = line.saturating_sub(context_lines);

    let mut context = String::new();
    for previous in lines.iter().take(line).skip(from) {
        context.push_str(previous);
        context.push('\n');
    }
    if let Some(current) = lines.get(line) {
        context.extend(current.chars().take(column));
    }
    context
}

/// Predictions ordered by score, best first.
#[must_use]
pub fn rank_predictions(response: CompletionResponse) -> Vec<CompletionProposal> {
    let mut proposals: Vec<CompletionProposal> = response
        .predictions
        .into_iter()
        .map(|(text, score)| CompletionProposal { text, score })
        .collect();
    proposals.sort_by(|a, b| b.score.total_cmp(&a.score));
    proposals
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionOptions {
    pub proposals: u32,
    pub context_lines: usize,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            proposals: 20,
            context_lines: 10,
        }
    }
}

/// Ask the service for proposals at `line`/`column` (both zero-based).
pub async fn complete_at(
    service: &dyn ModelService,
    content: &str,
    language_id: &str,
    model: &str,
    line: usize,
    column: usize,
    options: CompletionOptions,
) -> Result<Vec<CompletionProposal>> {
    let request = CompletionRequest {
        content: completion_context(content, line, column, options.context_lines),
        language_id: language_id.to_string(),
        reset_context: true,
        proposals_count: options.proposals,
        model: model.to_string(),
    };
    let response = service.complete(&request).await?;
    Ok(rank_predictions(response))
}
