use crate::error::{Result, TreeError};
use crate::stats::ScanStats;
use crate::tree::{NodeId, RiskTree};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::{DirEntry, WalkDir};

/// Exclusion lists applied while scanning a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Directory names skipped at any depth.
    pub exclude_directories: Vec<String>,
    /// File extensions, with the leading dot (`.png`).
    pub exclude_extensions: Vec<String>,
    pub follow_links: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exclude_directories: vec!["node_modules".to_string(), "out".to_string()],
            exclude_extensions: [".png", ".jpg", ".jpeg", ".svg"]
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
            follow_links: true,
        }
    }
}

impl ScanOptions {
    #[must_use]
    pub fn is_excluded_directory(&self, name: &OsStr) -> bool {
        let name = name.to_string_lossy();
        self.exclude_directories.iter().any(|dir| *dir == name)
    }

    #[must_use]
    pub fn is_excluded_file(&self, path: &Path) -> bool {
        let Some(ext) = path.extension() else {
            return false;
        };
        let dotted = format!(".{}", ext.to_string_lossy());
        self.exclude_extensions.iter().any(|candidate| *candidate == dotted)
    }

    /// True when any component of `path` below `root` is an excluded directory.
    #[must_use]
    pub fn is_excluded_scope(&self, path: &Path, root: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return false;
        };
        relative.components().any(|component| match component {
            std::path::Component::Normal(name) => self.is_excluded_directory(name),
            _ => false,
        })
    }
}

/// Result of a workspace scan: the pruned tree plus the files waiting for scores.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub tree: RiskTree,
    /// Files in scan order; the scoring queue drains them front to back.
    pub pending: Vec<NodeId>,
    pub stats: ScanStats,
}

/// Builds a [`RiskTree`] from a workspace directory.
pub struct TreeBuilder {
    root: PathBuf,
    options: ScanOptions,
}

impl TreeBuilder {
    pub fn new(root: impl AsRef<Path>, options: ScanOptions) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            options,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Scan the workspace. Unreadable directories and files are logged and
    /// skipped; only a missing or non-directory root is an error.
    pub fn build(&self, generation: u64) -> Result<ScanOutcome> {
        if !self.root.is_dir() {
            return Err(TreeError::InvalidRoot(format!(
                "Not a directory: {}",
                self.root.display()
            )));
        }

        let started = Instant::now();
        let mut stats = ScanStats::new();
        let mut tree = RiskTree::with_root(&self.root, generation);
        let mut directories: HashMap<PathBuf, NodeId> = HashMap::new();
        directories.insert(self.root.clone(), tree.root());

        let walker = WalkDir::new(&self.root)
            .follow_links(self.options.follow_links)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded_dir_entry(entry));

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    let err = TreeError::from(err);
                    log::warn!("{err}");
                    stats.add_error(err.to_string());
                    continue;
                }
            };

            let path = entry.path();
            let Some(parent) = path.parent().and_then(|p| directories.get(p)).copied() else {
                log::debug!("Skipping orphaned entry {}", path.display());
                continue;
            };
            let name = entry.file_name().to_string_lossy().into_owned();

            if entry.file_type().is_dir() {
                let id = tree.push_directory(parent, name, path.to_path_buf());
                directories.insert(path.to_path_buf(), id);
                stats.directories += 1;
                continue;
            }

            if self.options.is_excluded_file(path) {
                log::debug!("Skipping excluded file {}", path.display());
                stats.skipped_files += 1;
                continue;
            }

            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(source) => {
                    let err = TreeError::Read {
                        path: path.to_path_buf(),
                        source,
                    };
                    log::warn!("{err}");
                    stats.add_error(err.to_string());
                    continue;
                }
            };
            let content = String::from_utf8_lossy(&bytes).into_owned();
            let modified = entry.metadata().ok().and_then(|meta| meta.modified().ok());
            let id = tree.push_file(parent, name, path.to_path_buf(), content, modified);
            let node = tree.node(id);
            stats.add_file(&node.language_id(), node.lines());
        }

        stats.pruned_directories = tree.prune_empty_directories();
        stats.directories = stats.directories.saturating_sub(stats.pruned_directories);
        let pending: Vec<NodeId> = tree.files().collect();
        stats.time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        log::info!(
            "Scanned {} files in {} directories ({} pruned)",
            stats.files,
            stats.directories,
            stats.pruned_directories
        );

        Ok(ScanOutcome {
            tree,
            pending,
            stats,
        })
    }

    fn is_excluded_dir_entry(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_dir() && self.options.is_excluded_directory(entry.file_name())
    }
}

/// Number of lines when splitting on `\r\n`, `\r` or `\n`. Empty content is one line.
#[must_use]
pub fn count_lines(content: &str) -> usize {
    let bytes = content.as_bytes();
    let mut count = 1;
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\r' => {
                count += 1;
                if bytes.get(idx + 1) == Some(&b'\n') {
                    idx += 1;
                }
            }
            b'\n' => count += 1,
            _ => {}
        }
        idx += 1;
    }
    count
}
