//! A scored workspace kept in memory between panel requests.
//!
//! ```text
//! open / rescan ──> TreeBuilder ──> cached entropies ──> ScoringWorker ──> aggregate
//!                                                                 │
//! PanelRequest ──> handle ──> PanelMessage(s) <───────────────────┘
//! ```

use crate::config::Settings;
use crate::report::{FileReport, ScanReport, ScoringSummary};
use anyhow::{Context, Result};
use lmrisk_client::{EntropyCache, ModelService, ScoreOutcome, ScoringContext, ScoringWorker};
use lmrisk_decorations::ColorRanges;
use lmrisk_protocol::messages::{PanelMessage, PanelRequest, RiskUpdate, SearchResultPayload};
use lmrisk_protocol::{AggregationPolicy, RiskLevel};
use lmrisk_search::{SearchError, SearchIndex};
use lmrisk_tree::{aggregate, FileRisk, NodeId, RiskTree, ScanOutcome, ScanStats, TreeBuilder};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct RiskSession {
    root: PathBuf,
    settings: Settings,
    service: Arc<dyn ModelService>,
    worker: ScoringWorker,
    context: ScoringContext,
    ranges: ColorRanges,
    policy: AggregationPolicy,
    generation: u64,
    tree: RiskTree,
    entropies: EntropyCache,
    index: SearchIndex,
    stats: ScanStats,
    scoring: ScoringSummary,
}

impl RiskSession {
    /// Scan and score `root` with the backend selected in `settings`.
    pub async fn open(root: &Path, settings: Settings) -> Result<Self> {
        let service = settings.model_service()?;
        Self::open_with(root, settings, service).await
    }

    pub async fn open_with(
        root: &Path,
        settings: Settings,
        service: Arc<dyn ModelService>,
    ) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("Invalid workspace {}", root.display()))?;
        let ranges = settings.color_ranges()?;
        let context = settings.scoring_context(&root);
        let policy = settings.general.policy;
        let generation = 1;
        let ScanOutcome {
            tree,
            pending,
            stats,
        } = TreeBuilder::new(&root, settings.scan_options()).build(generation)?;

        let mut session = Self {
            worker: ScoringWorker::spawn(Arc::clone(&service)),
            index: SearchIndex::default(),
            root,
            settings,
            service,
            context,
            ranges,
            policy,
            generation,
            tree,
            entropies: EntropyCache::new(),
            stats,
            scoring: ScoringSummary::default(),
        };
        session.score_pending(&pending).await?;
        Ok(session)
    }

    /// Rebuild the tree from disk. Files whose cached entropies are still
    /// fresh are not sent to the service again.
    pub async fn rescan(&mut self) -> Result<&ScoringSummary> {
        self.generation += 1;
        let ScanOutcome {
            tree,
            pending,
            stats,
        } = TreeBuilder::new(&self.root, self.settings.scan_options()).build(self.generation)?;
        self.tree = tree;
        self.stats = stats;
        self.score_pending(&pending).await?;
        Ok(&self.scoring)
    }

    async fn score_pending(&mut self, pending: &[NodeId]) -> Result<()> {
        let mut summary = ScoringSummary::default();
        let mut uncached = Vec::with_capacity(pending.len());
        for &id in pending {
            let node = self.tree.node(id);
            let cached = self
                .entropies
                .get(&node.path, node.modified())
                .map(|result| FileRisk::Lines(result.line_entropies()));
            match cached {
                Some(risk) => {
                    self.tree.apply_scores(self.generation, id, risk);
                    summary.cached += 1;
                }
                None => uncached.push(id),
            }
        }
        debug!(
            "Generation {}: {} cached, {} to score",
            self.generation,
            summary.cached,
            uncached.len()
        );

        let entropies = &mut self.entropies;
        let report = self
            .worker
            .score_tree(&mut self.tree, &uncached, &self.context, |tree, update| {
                if let ScoreOutcome::Scored(result) = &update.outcome {
                    let node = tree.node(update.node);
                    entropies.insert(node.path.clone(), node.modified(), result.clone());
                }
            })
            .await?;

        summary.scored = report.scored;
        summary.unsupported = report.unsupported;
        summary.failed = report.failed;
        summary.stale = report.stale;
        self.scoring = summary;

        let root_risk = aggregate(&mut self.tree, self.policy);
        self.index = SearchIndex::from_tree(&self.tree, self.settings.search_options());
        info!(
            "Workspace {} at generation {}: root risk {:?}",
            self.root.display(),
            self.generation,
            root_risk
        );
        Ok(())
    }

    /// Drop cached entropies at or below the changed paths so the next
    /// rescan scores them again.
    pub fn invalidate(&mut self, paths: &[PathBuf]) -> usize {
        paths
            .iter()
            .map(|path| self.entropies.invalidate_under(path))
            .sum()
    }

    /// Invalidate `changed`, rescan, and pick the message that keeps the panel
    /// in sync. Rows are addressed by index, so `updateData` is only safe when
    /// every row still names the same node; otherwise the table is resent.
    pub async fn refresh(&mut self, changed: &[PathBuf]) -> Result<PanelMessage> {
        let invalidated = self.invalidate(changed);
        let before = self.row_keys();
        self.rescan().await?;
        let same_rows = self.row_keys() == before;
        debug!(
            "{} change(s), {} cached score(s) dropped, rows {}",
            changed.len(),
            invalidated,
            if same_rows { "unchanged" } else { "reshaped" }
        );
        Ok(if same_rows {
            self.update_message()
        } else {
            self.init_message()
        })
    }

    fn row_keys(&self) -> Vec<String> {
        self.tree
            .iter()
            .map(|(_, node)| node.relative_path.clone())
            .collect()
    }

    /// Re-aggregate under `policy` from the scores already attached.
    pub fn set_policy(&mut self, policy: AggregationPolicy) -> Vec<RiskUpdate> {
        self.policy = policy;
        aggregate(&mut self.tree, policy);
        self.tree.risk_updates()
    }

    pub async fn search(&mut self, query: &str) -> lmrisk_search::Result<Vec<SearchResultPayload>> {
        self.index.search(Arc::clone(&self.service), query).await
    }

    pub fn init_message(&self) -> PanelMessage {
        PanelMessage::Init {
            data: self.tree.treemap_table(),
            color_ranges: self.ranges.ranges().to_vec(),
        }
    }

    pub fn update_message(&self) -> PanelMessage {
        PanelMessage::UpdateData {
            data: self.tree.risk_updates(),
        }
    }

    /// Answer one panel request. Failures the panel can display are
    /// returned as [`PanelMessage::Error`].
    pub async fn handle(&mut self, request: PanelRequest) -> Result<Vec<PanelMessage>> {
        match request {
            PanelRequest::Init => Ok(vec![self.init_message()]),
            PanelRequest::TypeChanged { value } => {
                let data = self.set_policy(value);
                Ok(vec![PanelMessage::UpdateData { data }])
            }
            PanelRequest::Search { value } => match self.search(&value).await {
                Ok(results) => Ok(results
                    .into_iter()
                    .map(|data| PanelMessage::SearchResults { data })
                    .collect()),
                Err(SearchError::EmptyQuery) => Ok(vec![PanelMessage::Error {
                    message: "Search query is empty".to_string(),
                }]),
                Err(err) => Ok(vec![PanelMessage::Error {
                    message: err.to_string(),
                }]),
            },
            PanelRequest::Rescan => {
                self.rescan().await?;
                Ok(vec![self.init_message()])
            }
        }
    }

    pub fn scan_report(&self) -> ScanReport {
        let files = self
            .tree
            .files()
            .map(|id| {
                let node = self.tree.node(id);
                FileReport {
                    index: id.index() + 1,
                    path: node.relative_path.clone(),
                    lines: node.lines(),
                    risk_level: node.risk_level,
                }
            })
            .collect();
        ScanReport {
            root: self.root.clone(),
            generation: self.generation,
            policy: self.policy,
            root_risk: self.root_risk(),
            stats: self.stats.clone(),
            scoring: self.scoring.clone(),
            files,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tree(&self) -> &RiskTree {
        &self.tree
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub const fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    pub fn cached_entropies(&self) -> usize {
        self.entropies.len()
    }

    pub fn root_risk(&self) -> RiskLevel {
        self.tree.node(self.tree.root()).risk_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScorerKind;
    use lmrisk_client::StubModelService;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.languagemodel.scorer = ScorerKind::Stub;
        settings
    }

    fn workspace() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::write(dir.path().join("src/Main.java"), "class Main {\n    int value;\n}\n").unwrap();
        std::fs::write(dir.path().join("src/blob.dat"), "a\0b").unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/index.js"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "todo\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn open_scores_and_aggregates() {
        let dir = workspace();
        let session = RiskSession::open(dir.path(), settings()).await.unwrap();
        let report = session.scan_report();

        assert_eq!(report.scoring.scored, 2);
        assert_eq!(report.scoring.unsupported, 1);
        assert!(report.files.iter().all(|f| !f.path.contains("node_modules")));
        let blob = report.files.iter().find(|f| f.path.ends_with("blob.dat")).unwrap();
        assert_eq!(blob.risk_level, RiskLevel::NotSupported);
        assert!(session.root_risk().value().is_some());
        assert_eq!(session.cached_entropies(), 2);
    }

    #[tokio::test]
    async fn rescan_reuses_fresh_entropies() {
        let dir = workspace();
        let mut session = RiskSession::open(dir.path(), settings()).await.unwrap();
        let summary = session.rescan().await.unwrap().clone();
        assert_eq!(summary.cached, 2);
        assert_eq!(summary.scored, 0);
        assert_eq!(session.generation(), 2);

        let changed = session.root().join("src");
        assert_eq!(session.invalidate(&[changed]), 1);
        let summary = session.rescan().await.unwrap();
        assert_eq!((summary.cached, summary.scored), (1, 1));
    }

    #[tokio::test]
    async fn refresh_updates_in_place_when_rows_keep_their_paths() {
        let dir = workspace();
        let mut session = RiskSession::open(dir.path(), settings()).await.unwrap();
        let main = session.root().join("src/Main.java");
        std::fs::write(&main, "class Main {\n    int other;\n}\n").unwrap();

        let message = session.refresh(&[main]).await.unwrap();
        assert!(matches!(message, PanelMessage::UpdateData { .. }));
    }

    #[tokio::test]
    async fn refresh_resends_table_after_same_count_rename() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.java"), "class A {}\n").unwrap();
        std::fs::write(dir.path().join("b.java"), "class B {}\n").unwrap();
        let mut session = RiskSession::open(dir.path(), settings()).await.unwrap();
        let nodes = session.tree().len();

        let from = session.root().join("a.java");
        let to = session.root().join("z.java");
        std::fs::rename(&from, &to).unwrap();
        let message = session.refresh(&[from, to]).await.unwrap();

        assert_eq!(session.tree().len(), nodes);
        assert!(session.tree().find("root/z.java").is_some());
        match message {
            PanelMessage::Init { data, .. } => {
                let json = serde_json::to_value(&data).unwrap();
                assert!(json
                    .as_array()
                    .unwrap()
                    .iter()
                    .any(|row| row[0]["v"] == "root/z.java"));
            }
            other => panic!("expected init, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn policy_change_reaggregates_without_scoring() {
        let dir = workspace();
        let mut session =
            RiskSession::open_with(dir.path(), settings(), Arc::new(StubModelService::new()))
                .await
                .unwrap();
        let average = session.root_risk().value().unwrap();
        let updates = session.set_policy(AggregationPolicy::Maximum);
        let maximum = session.root_risk().value().unwrap();

        assert_eq!(updates.len(), session.tree().len());
        assert_eq!(updates[0].index, 1);
        assert!(maximum >= average);
        assert_eq!(session.policy(), AggregationPolicy::Maximum);
    }

    #[tokio::test]
    async fn panel_requests_produce_messages() {
        let dir = workspace();
        let mut session = RiskSession::open(dir.path(), settings()).await.unwrap();

        let init = session.handle(PanelRequest::Init).await.unwrap();
        assert!(matches!(init.as_slice(), [PanelMessage::Init { color_ranges, .. }] if color_ranges.len() == 5));

        let empty = session
            .handle(PanelRequest::Search {
                value: "  ".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(
            empty,
            vec![PanelMessage::Error {
                message: "Search query is empty".to_string()
            }]
        );

        let results = session
            .handle(PanelRequest::Search {
                value: "value".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(results.len(), session.index().len());
    }
}
