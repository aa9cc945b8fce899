//! Single-concurrency scoring queue.
//!
//! Jobs are tagged with the generation of the tree they were built from. The
//! worker skips jobs older than the latest generation announced through
//! [`ScoringWorker::begin_generation`], and the tree itself drops updates of any
//! other generation, so results of an abandoned scan never land in a new tree.

use crate::error::{ClientError, Result};
use crate::scoring::ScoringContext;
use crate::service::ModelService;
use log::{debug, info, warn};
use lmrisk_protocol::{EntropyResult, ScoreRequest};
use lmrisk_tree::{FileRisk, NodeId, RiskTree};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct ScoreJob {
    pub generation: u64,
    pub node: NodeId,
    pub request: ScoreRequest,
}

#[derive(Debug, Clone)]
pub enum ScoreOutcome {
    Scored(EntropyResult),
    /// The service answered 406 for this content type.
    Unsupported,
    Failed(String),
}

impl ScoreOutcome {
    /// Failed requests leave an empty score list behind.
    #[must_use]
    pub fn file_risk(&self) -> FileRisk {
        match self {
            Self::Scored(result) => FileRisk::Lines(result.line_entropies()),
            Self::Unsupported => FileRisk::Unsupported,
            Self::Failed(_) => FileRisk::Lines(Vec::new()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoreUpdate {
    pub generation: u64,
    pub node: NodeId,
    pub file_path: String,
    pub outcome: ScoreOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub scored: usize,
    pub unsupported: usize,
    pub failed: usize,
    /// Updates of an older generation that were discarded.
    pub stale: usize,
}

pub struct ScoringWorker {
    jobs: mpsc::UnboundedSender<ScoreJob>,
    updates: mpsc::UnboundedReceiver<ScoreUpdate>,
    current: Arc<AtomicU64>,
    handle: JoinHandle<()>,
}

impl ScoringWorker {
    /// Spawn the worker task on the current tokio runtime.
    pub fn spawn(service: Arc<dyn ModelService>) -> Self {
        let (jobs, job_rx) = mpsc::unbounded_channel();
        let (update_tx, updates) = mpsc::unbounded_channel();
        let current = Arc::new(AtomicU64::new(0));
        let handle = spawn_scoring_loop(service, job_rx, update_tx, Arc::clone(&current));

        Self {
            jobs,
            updates,
            current,
            handle,
        }
    }

    /// Announce a new tree generation; queued jobs of older ones are skipped.
    pub fn begin_generation(&self, generation: u64) {
        self.current.store(generation, Ordering::SeqCst);
    }

    #[must_use]
    pub fn current_generation(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    pub fn submit(&self, job: ScoreJob) -> Result<()> {
        self.jobs
            .send(job)
            .map_err(|_| ClientError::Other("scoring worker stopped".to_string()))
    }

    pub async fn next_update(&mut self) -> Option<ScoreUpdate> {
        self.updates.recv().await
    }

    /// Score `pending` files of `tree` one at a time, applying each result as it
    /// arrives. `on_update` sees the tree right after an update was applied.
    /// Aggregation is left to the caller once this returns.
    pub async fn score_tree<F>(
        &mut self,
        tree: &mut RiskTree,
        pending: &[NodeId],
        context: &ScoringContext,
        mut on_update: F,
    ) -> Result<DrainReport>
    where
        F: FnMut(&RiskTree, &ScoreUpdate),
    {
        let generation = tree.generation();
        let start = Instant::now();
        self.begin_generation(generation);

        for &node in pending {
            let request = context.request_for(tree.node(node));
            self.submit(ScoreJob {
                generation,
                node,
                request,
            })?;
        }

        let mut report = DrainReport::default();
        let mut remaining = pending.len();
        while remaining > 0 {
            let update = self
                .next_update()
                .await
                .ok_or_else(|| ClientError::Other("scoring worker stopped".to_string()))?;
            if update.generation != generation {
                report.stale += 1;
                continue;
            }
            remaining -= 1;

            match update.outcome {
                ScoreOutcome::Scored(_) => report.scored += 1,
                ScoreOutcome::Unsupported => report.unsupported += 1,
                ScoreOutcome::Failed(_) => report.failed += 1,
            }
            if tree.apply_scores(generation, update.node, update.outcome.file_risk()) {
                on_update(tree, &update);
            }
        }

        info!(
            "Scored {} file(s) in {:?} ({} unsupported, {} failed)",
            report.scored,
            start.elapsed(),
            report.unsupported,
            report.failed
        );
        Ok(report)
    }
}

impl Drop for ScoringWorker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn spawn_scoring_loop(
    service: Arc<dyn ModelService>,
    mut jobs: mpsc::UnboundedReceiver<ScoreJob>,
    updates: mpsc::UnboundedSender<ScoreUpdate>,
    current: Arc<AtomicU64>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(job) = jobs.recv().await {
            let latest = current.load(Ordering::SeqCst);
            if job.generation < latest {
                debug!(
                    "Skipping {} from generation {} (current {latest})",
                    job.request.file_path, job.generation
                );
                continue;
            }

            let outcome = match service.score(&job.request).await {
                Ok(result) => ScoreOutcome::Scored(result),
                Err(ClientError::Unsupported) => {
                    debug!("{} is not supported by the model", job.request.file_path);
                    ScoreOutcome::Unsupported
                }
                Err(err) => {
                    warn!("Scoring {} failed: {err}", job.request.file_path);
                    ScoreOutcome::Failed(err.to_string())
                }
            };

            let update = ScoreUpdate {
                generation: job.generation,
                node: job.node,
                file_path: job.request.file_path,
                outcome,
            };
            if updates.send(update).is_err() {
                break;
            }
        }
        debug!("Scoring worker stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubModelService;
    use async_trait::async_trait;
    use lmrisk_tree::{ScanOptions, TreeBuilder};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingService {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl ModelService for CountingService {
        async fn score(&self, request: &ScoreRequest) -> Result<EntropyResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if request.file_path.ends_with("broken.java") {
                return Err(ClientError::Status {
                    url: "http://localhost".to_string(),
                    status: 500,
                });
            }
            StubModelService::new().score(request).await
        }
    }

    fn workspace(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for (name, content) in files {
            let path = temp.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        temp
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn one_request_in_flight_at_a_time() {
        let temp = workspace(&[
            ("a.java", "class A {}"),
            ("b.java", "class B {}"),
            ("c/d.java", "class D {}"),
            ("c/e.java", "class E {}"),
        ]);
        let mut outcome = TreeBuilder::new(temp.path(), ScanOptions::default())
            .build(1)
            .unwrap();
        let service = Arc::new(CountingService::default());
        let mut worker = ScoringWorker::spawn(service.clone());

        let mut seen = 0;
        let report = worker
            .score_tree(
                &mut outcome.tree,
                &outcome.pending,
                &ScoringContext::default(),
                |_, _| seen += 1,
            )
            .await
            .unwrap();

        assert_eq!(report.scored, 4);
        assert_eq!(seen, 4);
        assert_eq!(service.calls.load(Ordering::SeqCst), 4);
        assert_eq!(service.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn outcomes_map_to_file_risk() {
        let temp = workspace(&[
            ("ok.java", "class A {\n}"),
            ("blob.java", "\0\0"),
            ("broken.java", "class B {}"),
        ]);
        let mut outcome = TreeBuilder::new(temp.path(), ScanOptions::default())
            .build(3)
            .unwrap();
        let mut worker = ScoringWorker::spawn(Arc::new(CountingService::default()));
        let report = worker
            .score_tree(
                &mut outcome.tree,
                &outcome.pending,
                &ScoringContext::default(),
                |_, _| {},
            )
            .await
            .unwrap();

        assert_eq!(
            report,
            DrainReport {
                scored: 1,
                unsupported: 1,
                failed: 1,
                stale: 0,
            }
        );
        let tree = &outcome.tree;
        let ok = tree.find("root/ok.java").unwrap();
        let blob = tree.find("root/blob.java").unwrap();
        let broken = tree.find("root/broken.java").unwrap();
        assert_eq!(tree.node(ok).file_risk(), Some(&FileRisk::Lines(vec![1.5, 0.25])));
        assert_eq!(tree.node(blob).file_risk(), Some(&FileRisk::Unsupported));
        assert_eq!(tree.node(broken).file_risk(), Some(&FileRisk::Lines(Vec::new())));
    }

    #[tokio::test]
    async fn queued_jobs_of_old_generations_are_skipped() {
        let temp = workspace(&[("a.java", "x")]);
        let outcome = TreeBuilder::new(temp.path(), ScanOptions::default())
            .build(1)
            .unwrap();
        let node = outcome.pending[0];
        let service = Arc::new(CountingService::default());
        let mut worker = ScoringWorker::spawn(service.clone());
        let context = ScoringContext::default();
        let job = |generation: u64| ScoreJob {
            generation,
            node,
            request: context.request_for(outcome.tree.node(node)),
        };

        // current-thread runtime: nothing runs until the first await
        worker.submit(job(1)).unwrap();
        worker.submit(job(1)).unwrap();
        worker.begin_generation(2);
        worker.submit(job(2)).unwrap();

        let update = worker.next_update().await.unwrap();
        assert_eq!(update.generation, 2);
        assert!(
            tokio::time::timeout(Duration::from_millis(50), worker.next_update())
                .await
                .is_err()
        );
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }
}
