use crate::error::Result;
use crate::http::ServiceClient;
use crate::service::ModelService;
use async_trait::async_trait;
use log::debug;
use lmrisk_protocol::{
    CodelensQuery, CodelensStats, CompletionRequest, CompletionResponse, CoverageQuery,
    EntropyResult, InputPayload, ScoreRequest, ScoreResponse, SearchEntropies, SearchRequest,
    SearchResponse,
};
use serde::{Deserialize, Serialize};

/// Service URLs, one per endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub languagemodel: String,
    pub search: String,
    pub completion: String,
    pub codelens: String,
    pub highlight: String,
    pub thumbnail: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            languagemodel: "http://localhost/webservice/languagemodel.php".to_string(),
            search: "http://localhost/webservice/languagemodel.php".to_string(),
            completion: "http://localhost/webservice/completion.php".to_string(),
            codelens: "http://localhost/webservice/codelens.php".to_string(),
            highlight: "http://localhost/webservice/highlight.php".to_string(),
            thumbnail: "http://localhost/webservice/thumbnail.php".to_string(),
        }
    }
}

pub struct HttpModelService {
    client: ServiceClient,
    endpoints: Endpoints,
}

impl HttpModelService {
    #[must_use]
    pub const fn new(client: ServiceClient, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    #[must_use]
    pub const fn client(&self) -> &ServiceClient {
        &self.client
    }
}

#[async_trait]
impl ModelService for HttpModelService {
    async fn score(&self, request: &ScoreRequest) -> Result<EntropyResult> {
        debug!("Scoring {}", request.file_path);
        let response: ScoreResponse = self
            .client
            .post_json(&self.endpoints.languagemodel, request)
            .await?;
        Ok(response.entropies)
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchEntropies> {
        let response: SearchResponse = self.client.post_json(&self.endpoints.search, request).await?;
        Ok(response.entropies)
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        self.client.post_json(&self.endpoints.completion, request).await
    }

    async fn codelens(&self, query: &CodelensQuery) -> Result<Option<CodelensStats>> {
        self.client.get_json(&self.endpoints.codelens, query).await
    }

    async fn coverage(&self, query: &CoverageQuery, content: &str) -> Result<Vec<bool>> {
        let body = InputPayload {
            input: content.to_string(),
        };
        self.client
            .post_json_with_query(&self.endpoints.highlight, query, &body)
            .await
    }

    async fn thumbnail(&self, content: &str) -> Result<Vec<u8>> {
        let body = InputPayload {
            input: content.to_string(),
        };
        self.client.post_for_bytes(&self.endpoints.thumbnail, &body).await
    }
}
