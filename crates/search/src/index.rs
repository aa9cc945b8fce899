use crate::diff::{match_lines, DEFAULT_THRESHOLD};
use crate::error::{Result, SearchError};
use log::{debug, info, warn};
use lmrisk_client::{ClientError, ModelService};
use lmrisk_protocol::messages::SearchResultPayload;
use lmrisk_protocol::{LineMatch, SearchRequest};
use lmrisk_tree::RiskTree;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Minimum relative difference, in percent, for a line to match.
    pub threshold: f64,
    pub interval: u32,
    /// Requests in flight at once.
    pub concurrency: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            interval: 1,
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum MatchState {
    #[default]
    Idle,
    Processing,
    Done(BTreeMap<usize, LineMatch>),
}

#[derive(Debug, Clone)]
pub struct SearchEntry {
    /// Row number of the file in the treemap table.
    pub index: usize,
    pub path: PathBuf,
    pub relative_path: String,
    pub language_id: String,
    pub content: String,
    pub lines: usize,
    pub modified: Option<SystemTime>,
    pub state: MatchState,
}

/// Files of one scan, in scan order, with the match state of the last query.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    entries: Vec<SearchEntry>,
    options: SearchOptions,
}

impl SearchIndex {
    #[must_use]
    pub fn from_tree(tree: &RiskTree, options: SearchOptions) -> Self {
        let entries = tree
            .files()
            .map(|id| {
                let node = tree.node(id);
                SearchEntry {
                    index: id.index() + 1,
                    path: node.path.clone(),
                    relative_path: node.relative_path.clone(),
                    language_id: node.language_id(),
                    content: node.content().unwrap_or_default().to_string(),
                    lines: node.lines(),
                    modified: node.modified(),
                    state: MatchState::Idle,
                }
            })
            .collect();
        Self { entries, options }
    }

    #[must_use]
    pub fn entries(&self) -> &[SearchEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn options(&self) -> SearchOptions {
        self.options
    }

    #[must_use]
    pub fn find(&self, relative_path: &str) -> Option<&SearchEntry> {
        self.entries
            .iter()
            .find(|entry| entry.relative_path == relative_path)
    }

    pub async fn search(
        &mut self,
        service: Arc<dyn ModelService>,
        query: &str,
    ) -> Result<Vec<SearchResultPayload>> {
        self.search_with(service, query, |_| {}).await
    }

    /// Run `query` against every file. `on_result` is called as soon as a
    /// file finishes; the returned payloads are ordered by index. A failed
    /// request yields an empty match set for that file.
    pub async fn search_with<F>(
        &mut self,
        service: Arc<dyn ModelService>,
        query: &str,
        mut on_result: F,
    ) -> Result<Vec<SearchResultPayload>>
    where
        F: FnMut(&SearchResultPayload),
    {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let threshold = self.options.threshold;
        let mut tasks = JoinSet::new();

        for (position, entry) in self.entries.iter_mut().enumerate() {
            entry.state = MatchState::Processing;
            let request = SearchRequest {
                content: entry.content.clone(),
                search: query.to_string(),
                language_id: entry.language_id.clone(),
                search_interval: self.options.interval,
            };
            let service = Arc::clone(&service);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| SearchError::Other(format!("search limiter closed: {e}")))?;
                let matches = match service.search(&request).await {
                    Ok(entropies) => match_lines(
                        &entropies.original.line_entropies(),
                        &entropies.search.line_entropies(),
                        threshold,
                    ),
                    Err(ClientError::Unsupported) => BTreeMap::new(),
                    Err(err) => {
                        warn!("Search request failed: {err}");
                        BTreeMap::new()
                    }
                };
                Ok::<_, SearchError>((position, matches))
            });
        }

        let mut results = Vec::with_capacity(self.entries.len());
        while let Some(joined) = tasks.join_next().await {
            let (position, matches) =
                joined.map_err(|e| SearchError::Other(format!("search task failed: {e}")))??;
            let entry = &mut self.entries[position];
            debug!("{}: {} matching line(s)", entry.relative_path, matches.len());

            let payload = SearchResultPayload {
                index: entry.index,
                matches: matches.clone(),
            };
            entry.state = MatchState::Done(matches);
            on_result(&payload);
            results.push(payload);
        }

        results.sort_by_key(|payload| payload.index);
        info!(
            "Search '{query}' over {} file(s) finished in {:?}",
            self.entries.len(),
            start.elapsed()
        );
        Ok(results)
    }

    /// Forget the last query's matches.
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.state = MatchState::Idle;
        }
    }
}
