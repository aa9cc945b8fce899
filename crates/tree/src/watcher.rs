use crate::error::{Result, TreeError};
use crate::scanner::ScanOptions;
use log::{debug, warn};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(750);

/// Fixed-delay debounce: every recorded event pushes the deadline out again.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
    pending: BTreeSet<PathBuf>,
}

impl Debouncer {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            pending: BTreeSet::new(),
        }
    }

    pub fn record<I>(&mut self, paths: I, now: Instant)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.pending.extend(paths);
        self.deadline = Some(now + self.delay);
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drain the batch once the deadline has passed.
    pub fn take_if_due(&mut self, now: Instant) -> Option<Vec<PathBuf>> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                Some(std::mem::take(&mut self.pending).into_iter().collect())
            }
            _ => None,
        }
    }
}

/// Watches a workspace and yields debounced batches of changed paths.
pub struct WorkspaceWatcher {
    root: PathBuf,
    options: ScanOptions,
    events: mpsc::Receiver<notify::Result<Event>>,
    debouncer: Debouncer,
    _watcher: RecommendedWatcher,
}

impl WorkspaceWatcher {
    pub fn start(root: impl AsRef<Path>, options: ScanOptions, delay: Duration) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let (sender, events) = mpsc::channel(1024);
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = sender.blocking_send(res);
            },
            NotifyConfig::default(),
        )
        .map_err(|e| TreeError::WatchError(format!("watcher init failed: {e}")))?;
        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| TreeError::WatchError(format!("failed to watch {}: {e}", root.display())))?;

        Ok(Self {
            root,
            options,
            events,
            debouncer: Debouncer::new(delay),
            _watcher: watcher,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Wait for the next batch of relevant changes. Returns `None` once the
    /// underlying watcher has shut down.
    pub async fn next_batch(&mut self) -> Option<Vec<PathBuf>> {
        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                event = self.events.recv() => {
                    let event = event?;
                    match event {
                        Ok(event) => {
                            let paths = self.relevant_paths(&event);
                            if !paths.is_empty() {
                                debug!("Change detected in {} path(s)", paths.len());
                                self.debouncer.record(paths, Instant::now());
                            }
                        }
                        Err(err) => warn!("Watcher error: {err}"),
                    }
                }
                () = async {
                    if let Some(deadline) = deadline {
                        time::sleep_until(time::Instant::from_std(deadline)).await;
                    }
                }, if deadline.is_some() => {
                    if let Some(batch) = self.debouncer.take_if_due(Instant::now()) {
                        return Some(batch);
                    }
                }
            }
        }
    }

    fn relevant_paths(&self, event: &Event) -> Vec<PathBuf> {
        if matches!(event.kind, EventKind::Access(_)) {
            return Vec::new();
        }
        event
            .paths
            .iter()
            .filter(|path| !self.options.is_excluded_scope(path, &self.root))
            .filter(|path| !self.options.is_excluded_file(path))
            .cloned()
            .collect()
    }
}
