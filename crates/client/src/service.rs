use crate::error::{ClientError, Result};
use async_trait::async_trait;
use lmrisk_protocol::{
    CodelensQuery, CodelensStats, CompletionRequest, CompletionResponse, CoverageQuery,
    EntropyResult, ScoreRequest, SearchEntropies, SearchRequest,
};

/// Backend of the language-model service.
///
/// Only [`ModelService::score`] is mandatory; the remaining endpoints answer
/// [`ClientError::Unavailable`] unless a backend provides them.
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Per-line entropies for one file.
    async fn score(&self, request: &ScoreRequest) -> Result<EntropyResult>;

    /// Entropies of the file as-is and with the query applied.
    async fn search(&self, _request: &SearchRequest) -> Result<SearchEntropies> {
        Err(ClientError::Unavailable("search"))
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse> {
        Err(ClientError::Unavailable("completion"))
    }

    /// Call statistics for a qualified method name. `None` when the service
    /// knows nothing about the subject.
    async fn codelens(&self, _query: &CodelensQuery) -> Result<Option<CodelensStats>> {
        Err(ClientError::Unavailable("codelens"))
    }

    /// Per-line coverage flags for a file.
    async fn coverage(&self, _query: &CoverageQuery, _content: &str) -> Result<Vec<bool>> {
        Err(ClientError::Unavailable("coverage"))
    }

    /// Rendered thumbnail image bytes for a file.
    async fn thumbnail(&self, _content: &str) -> Result<Vec<u8>> {
        Err(ClientError::Unavailable("thumbnail"))
    }
}
