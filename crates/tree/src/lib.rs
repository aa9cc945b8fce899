//! # LM Risk Tree
//!
//! Workspace tree with per-file risk scores rolled up to directories.
//!
//! ## Pipeline
//!
//! ```text
//! Workspace root
//!     │
//!     ├──> TreeBuilder (exclusions, empty-directory pruning)
//!     │      └─> RiskTree + pending files
//!     │
//!     ├──> scoring queue (lmrisk-client) ──> apply_scores
//!     │
//!     └──> aggregate(Average | Median | Maximum)
//!            └─> risk_level on every node
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use lmrisk_protocol::AggregationPolicy;
//! use lmrisk_tree::{aggregate, ScanOptions, TreeBuilder};
//!
//! fn main() -> lmrisk_tree::Result<()> {
//!     let mut outcome = TreeBuilder::new("/path/to/project", ScanOptions::default()).build(1)?;
//!     let root = aggregate(&mut outcome.tree, AggregationPolicy::Maximum);
//!
//!     println!("{} files, root risk {:?}", outcome.stats.files, root);
//!     Ok(())
//! }
//! ```

mod aggregate;
mod error;
mod scanner;
mod stats;
mod tree;
mod watcher;

pub use aggregate::{aggregate, maximum, mean, median, reduce};
pub use error::{Result, TreeError};
pub use scanner::{count_lines, ScanOptions, ScanOutcome, TreeBuilder};
pub use stats::ScanStats;
pub use tree::{FileRisk, Node, NodeId, NodeKind, RiskTree, ROOT_KEY};
pub use watcher::{Debouncer, WorkspaceWatcher, DEFAULT_DEBOUNCE};
